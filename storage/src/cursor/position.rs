use crate::error::{raise_invalid_param, Error};
use crate::page::{PageId, NIL_PAGE};
use crate::Result;

/// Size of an encoded [`Position`] checkpoint.
pub const POSITION_SIZE: usize = 28;

const CHECKSUM_OFFSET: usize = 24;

/// Resumable location in a page chain.
///
/// This is the only persistent part of a cursor. A consumer stores it (e.g.
/// in queue metadata) and later binds it to a fresh transaction to continue
/// where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub(crate) page: PageId,
    pub(crate) offset: usize,
    pub(crate) page_size: usize,
}

impl Position {
    pub fn new(page: PageId, offset: usize, page_size: usize) -> Self {
        Self {
            page,
            offset,
            page_size,
        }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// True if the position does not point to any page.
    pub fn is_nil(&self) -> bool {
        self.page == NIL_PAGE
    }

    /// Bytes left in the current page.
    pub fn page_bytes(&self) -> usize {
        self.page_size.saturating_sub(self.offset)
    }

    /// Detaches the position from the chain. The page size is kept.
    pub fn reset(&mut self) {
        self.page = NIL_PAGE;
        self.offset = 0;
    }

    pub fn encode(&self) -> [u8; POSITION_SIZE] {
        let mut bytes = [0u8; POSITION_SIZE];

        bytes[0..8].copy_from_slice(&self.page.to_le_bytes());
        bytes[8..16].copy_from_slice(&(self.offset as u64).to_le_bytes());
        bytes[16..24].copy_from_slice(&(self.page_size as u64).to_le_bytes());

        let checksum = crc32fast::hash(&bytes[..CHECKSUM_OFFSET]);
        bytes[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_le_bytes());

        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        const OP: &str = "pq/decode-position";

        let bytes: &[u8; POSITION_SIZE] = bytes.try_into().map_err(|_| {
            Error::new(OP).caused_by(raise_invalid_param(format!(
                "checkpoint has {} bytes, expected {}",
                bytes.len(),
                POSITION_SIZE
            )))
        })?;

        let stored = u32::from_le_bytes(read_array(bytes, CHECKSUM_OFFSET));
        if crc32fast::hash(&bytes[..CHECKSUM_OFFSET]) != stored {
            return Err(
                Error::new(OP).caused_by(raise_invalid_param("checkpoint checksum mismatch"))
            );
        }

        let page = u64::from_le_bytes(read_array(bytes, 0));
        let offset = u64::from_le_bytes(read_array(bytes, 8));
        let page_size = u64::from_le_bytes(read_array(bytes, 16));

        let (Ok(offset), Ok(page_size)) = (usize::try_from(offset), usize::try_from(page_size))
        else {
            return Err(Error::new(OP).caused_by(raise_invalid_param("checkpoint out of range")));
        };
        if page != NIL_PAGE && offset > page_size {
            return Err(Error::new(OP).caused_by(raise_invalid_param(format!(
                "offset {} beyond page size {}",
                offset, page_size
            ))));
        }

        Ok(Self::new(page, offset, page_size))
    }
}

fn read_array<const N: usize>(bytes: &[u8; POSITION_SIZE], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{is, ErrorKind};

    #[test]
    fn test_page_bytes() {
        let pos = Position::new(10, 16, 4096);
        assert_eq!(pos.page_bytes(), 4080);
        assert!(!pos.is_nil());

        let pos = Position::new(10, 4096, 4096);
        assert_eq!(pos.page_bytes(), 0);
    }

    #[test]
    fn test_reset() {
        let mut pos = Position::new(10, 100, 4096);
        pos.reset();
        assert!(pos.is_nil());
        assert_eq!(pos.offset(), 0);
        assert_eq!(pos.page_size(), 4096);
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let pos = Position::new(12, 4000, 4096);
        let bytes = pos.encode();
        assert_eq!(Position::decode(&bytes).unwrap(), pos);
    }

    #[test]
    fn test_checkpoint_corruption_detected() {
        let mut bytes = Position::new(12, 4000, 4096).encode();
        bytes[3] ^= 0x40;

        let err = Position::decode(&bytes).unwrap_err();
        assert!(is(&err, ErrorKind::InvalidParam));
        assert_eq!(
            err.to_string(),
            "pq/decode-position: invalid parameter: checkpoint checksum mismatch"
        );
    }

    #[test]
    fn test_checkpoint_bad_length() {
        let bytes = Position::new(1, 16, 64).encode();
        let err = Position::decode(&bytes[..20]).unwrap_err();
        assert!(is(&err, ErrorKind::InvalidParam));
    }

    #[test]
    fn test_checkpoint_offset_beyond_page() {
        let bytes = Position::new(1, 65, 64).encode();
        let err = Position::decode(&bytes).unwrap_err();
        assert!(is(&err, ErrorKind::InvalidParam));
    }
}
