use super::Error;

/// Number of 7-bit groups needed to hold `value`, minimum one (so that zero
/// still encodes as a single `0x00` byte).
pub fn natural_width(value: u64) -> usize {
    let mut width = 1;
    let mut remaining = value >> 7;
    while remaining != 0 {
        width += 1;
        remaining >>= 7;
    }
    width
}

/// Encodes `value` in its natural (shortest) width.
pub fn encode(value: u64) -> Vec<u8> {
    encode_padded(value, natural_width(value)).expect("natural_width always fits")
}

/// Encodes `value` padded out to exactly `width` bytes by emitting leading
/// `0x80` continuation bytes ahead of the natural encoding. Fails if `value`
/// needs more than `width` bytes.
pub fn encode_padded(value: u64, width: usize) -> Result<Vec<u8>, Error> {
    let needed = natural_width(value);
    if needed > width {
        return Err(Error::WidthTooSmall { value, width });
    }

    let mut out = vec![0x80u8; width - needed];
    let mut groups = [0u8; 10]; // ceil(64/7) = 10
    let mut n = 0;
    let mut remaining = value;
    loop {
        groups[n] = (remaining & 0x7f) as u8;
        n += 1;
        remaining >>= 7;
        if remaining == 0 {
            break;
        }
    }
    // groups were filled least-significant-first; emit most-significant-first,
    // with the continuation bit set on every byte but the last.
    for (i, g) in groups[..n].iter().rev().enumerate() {
        let is_last = i == n - 1;
        out.push(if is_last { *g } else { *g | 0x80 });
    }
    Ok(out)
}
