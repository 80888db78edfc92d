/*!
The active-transmission table: a fixed-capacity Robin-Hood hash table
mapping custody IDs (CIDs) to in-flight bundle handles, with a separate
age list threading entries oldest-to-newest for expiry sweeps.

Ground truth for the probe-chain/age-list interplay is
`original_source/common/rh_hash.c`: the home bucket is `cid % capacity`;
collisions displace the home bucket's current occupant to the first open
slot found by linear probing from `home + 1` (a Robin-Hood insertion,
since the incoming CID always "deserves" its home bucket more than a
displaced occupant); removal copies the last node of the probe chain back
into the removed slot to keep the chain contiguous. We use `Option<usize>`
in place of the source's `NULL_INDEX` sentinel.
*/
use bpcat_bpv6::dtn_time::DtnTime;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("active table is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("custody id {0} already present in the active table")]
    Duplicate(u64),

    #[error("custody id {0} not found in the active table")]
    NotFound(u64),
}

/// One outstanding custody obligation: the CID it was transmitted under,
/// the storage handle for its serialized bytes, and the deadline by which
/// a custody acknowledgment is expected before retransmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEntry {
    pub cid: u64,
    pub storage_id: std::sync::Arc<str>,
    pub retransmit_deadline: DtnTime,
}

#[derive(Debug, Clone)]
struct Slot {
    entry: Option<ActiveEntry>,
    // Probe chain: the sequence of slots scanned to find/insert a CID
    // whose home bucket was already occupied.
    next: Option<usize>,
    prev: Option<usize>,
    // Age list: oldest-to-newest insertion order, independent of the
    // probe chain above.
    after: Option<usize>,
    before: Option<usize>,
}

impl Slot {
    fn vacant() -> Self {
        Slot {
            entry: None,
            next: None,
            prev: None,
            after: None,
            before: None,
        }
    }
}

#[derive(Debug)]
pub struct ActiveTable {
    slots: Vec<Slot>,
    oldest: Option<usize>,
    newest: Option<usize>,
    count: usize,
}

impl ActiveTable {
    pub fn new(capacity: usize) -> Self {
        ActiveTable {
            slots: (0..capacity).map(|_| Slot::vacant()).collect(),
            oldest: None,
            newest: None,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_available(&self) -> bool {
        self.count < self.slots.len()
    }

    fn home_bucket(&self, cid: u64) -> usize {
        (cid % self.slots.len() as u64) as usize
    }

    fn write_node(&mut self, index: usize, entry: ActiveEntry) {
        self.slots[index].entry = Some(entry);
        self.slots[index].next = None;
        self.slots[index].prev = None;
        self.slots[index].after = None;
        self.slots[index].before = self.newest;

        match self.oldest {
            None => {
                self.oldest = Some(index);
                self.newest = Some(index);
            }
            Some(_) => {
                if let Some(newest) = self.newest {
                    self.slots[newest].after = Some(index);
                }
                self.newest = Some(index);
            }
        }
    }

    fn overwrite_node(&mut self, index: usize, entry: ActiveEntry, overwrite: bool) -> Result<(), Error> {
        if !overwrite {
            return Err(Error::Duplicate(entry.cid));
        }

        let before = self.slots[index].before;
        let after = self.slots[index].after;
        if let Some(b) = before {
            self.slots[b].after = after;
        }
        if self.oldest == Some(index) {
            self.oldest = after;
            if let Some(o) = self.oldest {
                self.slots[o].before = None;
            }
        }

        self.slots[index].entry = Some(entry);
        self.slots[index].after = None;
        self.slots[index].before = self.newest;
        if let Some(newest) = self.newest {
            self.slots[newest].after = Some(index);
        }
        self.newest = Some(index);
        Ok(())
    }

    /// Inserts `entry` keyed by its `cid`. If a slot for that CID already
    /// exists, `overwrite` decides whether the existing entry is replaced
    /// (`Ok`) or the insert is rejected (`Err(Duplicate)`).
    pub fn insert(&mut self, entry: ActiveEntry, overwrite: bool) -> Result<(), Error> {
        let capacity = self.slots.len();
        let home = self.home_bucket(entry.cid);

        if self.slots[home].entry.is_none() {
            self.write_node(home, entry);
            self.count += 1;
            return Ok(());
        }

        if self.slots[home].entry.as_ref().unwrap().cid == entry.cid {
            return self.overwrite_node(home, entry, overwrite);
        }

        let mut end = home;
        let mut scan = self.slots[home].next;
        while let Some(idx) = scan {
            if self.slots[idx].entry.as_ref().unwrap().cid == entry.cid {
                return self.overwrite_node(idx, entry, overwrite);
            }
            end = idx;
            scan = self.slots[idx].next;
        }

        let mut open = (home + 1) % capacity;
        while self.slots[open].entry.is_some() && open != home {
            open = (open + 1) % capacity;
        }
        if open == home {
            return Err(Error::Full { capacity });
        }

        if self.slots[home].prev.is_none() {
            // Chain length 1: home bucket itself starts the chain, so the
            // new entry simply joins at the open slot.
            self.write_node(open, entry);
            self.slots[end].next = Some(open);
            self.slots[open].prev = Some(end);
        } else {
            // Robin Hood: the home bucket's current occupant is not the
            // head of its own chain (it was itself displaced here), so it
            // yields the home slot to the CID that actually hashes there.
            let next_idx = self.slots[home].next;
            let prev_idx = self.slots[home].prev;
            if let Some(n) = next_idx {
                self.slots[n].prev = prev_idx;
            }
            if let Some(p) = prev_idx {
                self.slots[p].next = next_idx;
            }
            self.slots[end].next = Some(open);

            let moved_entry = self.slots[home].entry.take();
            let after = self.slots[home].after;
            let before = self.slots[home].before;
            self.slots[open] = Slot {
                entry: moved_entry,
                next: None,
                prev: Some(end),
                after,
                before,
            };
            if let Some(a) = after {
                self.slots[a].before = Some(open);
            }
            if let Some(b) = before {
                self.slots[b].after = Some(open);
            }
            if self.oldest == Some(home) {
                self.oldest = Some(open);
                self.slots[open].before = None;
            }

            self.write_node(home, entry);
        }

        self.count += 1;
        Ok(())
    }

    /// Removes and returns the entry for `cid`, if present.
    pub fn remove(&mut self, cid: u64) -> Option<ActiveEntry> {
        let home = self.home_bucket(cid);
        let mut curr = (self.slots[home].entry.is_some()).then_some(home);
        while let Some(idx) = curr {
            if self.slots[idx].entry.as_ref().unwrap().cid == cid {
                break;
            }
            curr = self.slots[idx].next;
        }
        let curr_index = curr?;

        let entry = self.slots[curr_index].entry.take();

        let after = self.slots[curr_index].after;
        let before = self.slots[curr_index].before;
        if let Some(a) = after {
            self.slots[a].before = before;
        }
        if let Some(b) = before {
            self.slots[b].after = after;
        }
        if self.newest == Some(curr_index) {
            self.newest = before;
        }
        if self.oldest == Some(curr_index) {
            self.oldest = after;
        }

        let mut end_index = curr_index;
        if let Some(mut scan) = self.slots[curr_index].next {
            while let Some(n) = self.slots[scan].next {
                scan = n;
            }
            end_index = scan;

            self.slots[curr_index].entry = self.slots[end_index].entry.take();
            self.slots[curr_index].before = self.slots[end_index].before;
            self.slots[curr_index].after = self.slots[end_index].after;

            let after2 = self.slots[end_index].after;
            let before2 = self.slots[end_index].before;
            if let Some(a) = after2 {
                self.slots[a].before = Some(curr_index);
            }
            if let Some(b) = before2 {
                self.slots[b].after = Some(curr_index);
            }
            if self.newest == Some(end_index) {
                self.newest = Some(curr_index);
            }
            if self.oldest == Some(end_index) {
                self.oldest = Some(curr_index);
            }
        }

        self.slots[end_index].entry = None;
        if let Some(p) = self.slots[end_index].prev {
            self.slots[p].next = None;
        }

        self.count -= 1;
        entry
    }

    /// The oldest (first-inserted, or most recently re-inserted) entry,
    /// the next candidate an expiry sweep should inspect.
    pub fn oldest(&self) -> Option<&ActiveEntry> {
        self.oldest.map(|i| self.slots[i].entry.as_ref().unwrap())
    }

    /// Iterates every live entry, oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveEntry> {
        std::iter::successors(self.oldest, move |&i| self.slots[i].after)
            .map(move |i| self.slots[i].entry.as_ref().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(cid: u64) -> ActiveEntry {
        ActiveEntry {
            cid,
            storage_id: Arc::from(format!("bundle-{cid}")),
            retransmit_deadline: DtnTime::new(cid),
        }
    }

    #[test]
    fn insert_and_lookup_oldest() {
        let mut table = ActiveTable::new(8);
        table.insert(entry(1), false).unwrap();
        table.insert(entry(2), false).unwrap();
        assert_eq!(table.count(), 2);
        assert_eq!(table.oldest().unwrap().cid, 1);
    }

    #[test]
    fn remove_returns_entry_and_updates_count() {
        let mut table = ActiveTable::new(8);
        table.insert(entry(1), false).unwrap();
        let removed = table.remove(1).unwrap();
        assert_eq!(removed.cid, 1);
        assert_eq!(table.count(), 0);
        assert!(table.remove(1).is_none());
    }

    #[test]
    fn duplicate_insert_without_overwrite_fails() {
        let mut table = ActiveTable::new(8);
        table.insert(entry(1), false).unwrap();
        assert!(matches!(
            table.insert(entry(1), false),
            Err(Error::Duplicate(1))
        ));
    }

    #[test]
    fn duplicate_insert_with_overwrite_replaces_without_growing_count() {
        let mut table = ActiveTable::new(8);
        table.insert(entry(1), false).unwrap();
        table.insert(entry(1), true).unwrap();
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn full_table_rejects_insert() {
        let mut table = ActiveTable::new(2);
        table.insert(entry(0), false).unwrap();
        table.insert(entry(2), false).unwrap();
        assert!(matches!(
            table.insert(entry(4), false),
            Err(Error::Full { capacity: 2 })
        ));
    }

    #[test]
    fn colliding_cids_probe_to_next_open_slot() {
        // Capacity 4: cids 1 and 5 both hash to bucket 1.
        let mut table = ActiveTable::new(4);
        table.insert(entry(1), false).unwrap();
        table.insert(entry(5), false).unwrap();
        assert_eq!(table.count(), 2);
        assert_eq!(table.remove(5).unwrap().cid, 5);
        assert_eq!(table.remove(1).unwrap().cid, 1);
    }

    #[test]
    fn robin_hood_swap_evicts_a_foreign_occupant_from_its_true_home() {
        // Capacity 16: cids 0, 16, 32, 48 all hash to bucket 0 and chain
        // forward through buckets 1, 2, 3. Bucket 1 is cid 1's true home
        // but currently holds cid 16 (displaced there while chaining from
        // bucket 0); inserting cid 1 must evict cid 16 from bucket 1.
        let mut table = ActiveTable::new(16);
        for cid in [0, 16, 32, 48] {
            table.insert(entry(cid), false).unwrap();
        }
        table.insert(entry(1), false).unwrap();
        assert_eq!(table.count(), 5);
        for cid in [0, 1, 16, 32, 48] {
            assert_eq!(table.remove(cid).map(|e| e.cid), Some(cid));
        }
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn removing_middle_of_chain_keeps_remaining_entries_reachable() {
        let mut table = ActiveTable::new(4);
        table.insert(entry(1), false).unwrap();
        table.insert(entry(5), false).unwrap();
        table.insert(entry(9), false).unwrap();
        assert!(table.remove(5).is_some());
        let mut remaining: Vec<u64> = table.iter().map(|e| e.cid).collect();
        remaining.sort();
        assert_eq!(remaining, vec![1, 9]);
        assert_eq!(table.count(), 2);
    }
}
