/*!
The checksum used by the bundle-integrity block ([`crate::bib`]). This
engine implements only CRC-based cipher suites — no asymmetric signatures —
per spec's "no security beyond the BIB integrity block" non-goal.
*/
use thiserror::Error;

const X25: ::crc::Crc<u16> = ::crc::Crc::<u16>::new(&::crc::CRC_16_IBM_SDLC);
const CASTAGNOLI: ::crc::Crc<u32> = ::crc::Crc::<u32>::new(&::crc::CRC_32_ISCSI);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("unsupported cipher suite id {0}")]
    InvalidType(u64),

    #[error("integrity check value has unexpected length {0}")]
    InvalidLength(usize),

    #[error("bundle integrity check failed")]
    IncorrectCrc,
}

/// The cipher suite named by a BIB's `cipher_suite_id` field.
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    /// CRC-16/X-25, the engine's default (spec's Open Question resolution).
    #[default]
    CRC16_X25,
    /// CRC-32/Castagnoli, for deployments wanting a stronger checksum.
    CRC32_CASTAGNOLI,
    Unrecognised(u64),
}

impl From<u64> for CipherSuite {
    fn from(value: u64) -> Self {
        match value {
            0 => Self::CRC16_X25,
            1 => Self::CRC32_CASTAGNOLI,
            v => Self::Unrecognised(v),
        }
    }
}

impl From<CipherSuite> for u64 {
    fn from(value: CipherSuite) -> Self {
        match value {
            CipherSuite::CRC16_X25 => 0,
            CipherSuite::CRC32_CASTAGNOLI => 1,
            CipherSuite::Unrecognised(v) => v,
        }
    }
}

impl CipherSuite {
    /// The on-wire width of this suite's integrity check value, in bytes.
    pub fn value_width(&self) -> Result<usize, Error> {
        match self {
            CipherSuite::CRC16_X25 => Ok(2),
            CipherSuite::CRC32_CASTAGNOLI => Ok(4),
            CipherSuite::Unrecognised(v) => Err(Error::InvalidType(*v)),
        }
    }

    /// Computes this suite's check value over `data`, big-endian encoded.
    pub fn digest(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            CipherSuite::CRC16_X25 => Ok(X25.checksum(data).to_be_bytes().to_vec()),
            CipherSuite::CRC32_CASTAGNOLI => Ok(CASTAGNOLI.checksum(data).to_be_bytes().to_vec()),
            CipherSuite::Unrecognised(v) => Err(Error::InvalidType(*v)),
        }
    }

    /// Verifies `value` (the wire bytes of the check value) against `data`.
    pub fn verify(&self, data: &[u8], value: &[u8]) -> Result<(), Error> {
        let expected = self.digest(data)?;
        if value.len() != expected.len() {
            return Err(Error::InvalidLength(value.len()));
        }
        if value != expected.as_slice() {
            return Err(Error::IncorrectCrc);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc16_x25_round_trips() {
        let suite = CipherSuite::CRC16_X25;
        let data = b"hello, dtn";
        let digest = suite.digest(data).unwrap();
        assert_eq!(digest.len(), 2);
        assert!(suite.verify(data, &digest).is_ok());
    }

    #[test]
    fn crc32_castagnoli_round_trips() {
        let suite = CipherSuite::CRC32_CASTAGNOLI;
        let data = b"hello, dtn";
        let digest = suite.digest(data).unwrap();
        assert_eq!(digest.len(), 4);
        assert!(suite.verify(data, &digest).is_ok());
    }

    #[test]
    fn tampered_data_fails_verification() {
        let suite = CipherSuite::CRC16_X25;
        let digest = suite.digest(b"hello").unwrap();
        assert_eq!(suite.verify(b"hellp", &digest), Err(Error::IncorrectCrc));
    }

    #[test]
    fn unrecognised_suite_rejected() {
        let suite = CipherSuite::from(99);
        assert_eq!(suite.digest(b"x"), Err(Error::InvalidType(99)));
    }

    #[test]
    fn wire_value_round_trips() {
        assert_eq!(u64::from(CipherSuite::CRC16_X25), 0);
        assert_eq!(CipherSuite::from(0), CipherSuite::CRC16_X25);
    }
}
