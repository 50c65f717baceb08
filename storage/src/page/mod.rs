use bytemuck::{Pod, Zeroable};

/// Identifier of a page in the store. `0` is never a valid page.
pub type PageId = u64;

/// Sentinel page id: "no page" / end of chain.
pub const NIL_PAGE: PageId = 0;

pub const PAGE_HEADER_SIZE: usize = std::mem::size_of::<PageHeader>();
pub const RECORD_HEADER_SIZE: usize = std::mem::size_of::<RecordHeader>();

/// Header at offset 0 of every page in an event chain.
///
/// Fields are stored little-endian as byte arrays so the struct has an
/// alignment of 1 and can be viewed in place at any offset.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PageHeader {
    next: [u8; 8],  // 8 bytes - next page in chain (0 = last page)
    first: [u8; 4], // 4 bytes - offset of the first record starting in this page
    count: [u8; 4], // 4 bytes - number of records starting in this page
}

/// Header in front of every record payload. Never straddles a page boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct RecordHeader {
    size: [u8; 4], // 4 bytes - payload length
}

impl PageHeader {
    pub fn new(next: PageId, first: u32, count: u32) -> Self {
        Self {
            next: next.to_le_bytes(),
            first: first.to_le_bytes(),
            count: count.to_le_bytes(),
        }
    }

    pub fn next(&self) -> PageId {
        u64::from_le_bytes(self.next)
    }

    pub fn first(&self) -> u32 {
        u32::from_le_bytes(self.first)
    }

    pub fn count(&self) -> u32 {
        u32::from_le_bytes(self.count)
    }

    pub fn is_last(&self) -> bool {
        self.next() == NIL_PAGE
    }

    pub fn set_next(&mut self, next: PageId) {
        self.next = next.to_le_bytes();
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Views the start of `page` as a header. `None` if `page` is too short.
    pub fn cast(page: &[u8]) -> Option<&PageHeader> {
        page.get(..PAGE_HEADER_SIZE).map(bytemuck::from_bytes)
    }
}

impl RecordHeader {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.to_le_bytes(),
        }
    }

    pub fn size(&self) -> u32 {
        u32::from_le_bytes(self.size)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Views the start of `buf` as a record header. `None` if `buf` is too short.
    pub fn cast(buf: &[u8]) -> Option<&RecordHeader> {
        buf.get(..RECORD_HEADER_SIZE).map(bytemuck::from_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(PAGE_HEADER_SIZE, 16);
        assert_eq!(RECORD_HEADER_SIZE, 4);
    }

    #[test]
    fn test_header_alignment() {
        // Headers are viewed in place at arbitrary offsets
        assert_eq!(std::mem::align_of::<PageHeader>(), 1);
        assert_eq!(std::mem::align_of::<RecordHeader>(), 1);
    }

    #[test]
    fn test_page_header_layout() {
        let hdr = PageHeader::new(0x0102, 16, 3);
        let bytes = hdr.as_bytes();

        assert_eq!(&bytes[0..8], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &16u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &3u32.to_le_bytes());
    }

    #[test]
    fn test_page_header_cast() {
        let mut page = vec![0u8; 64];
        page[..PAGE_HEADER_SIZE].copy_from_slice(PageHeader::new(11, 16, 1).as_bytes());

        let hdr = PageHeader::cast(&page).unwrap();
        assert_eq!(hdr.next(), 11);
        assert_eq!(hdr.first(), 16);
        assert_eq!(hdr.count(), 1);
        assert!(!hdr.is_last());

        assert!(PageHeader::cast(&page[..8]).is_none());
    }

    #[test]
    fn test_last_page() {
        let mut hdr = PageHeader::new(7, 0, 0);
        assert!(!hdr.is_last());
        hdr.set_next(NIL_PAGE);
        assert!(hdr.is_last());
    }

    #[test]
    fn test_record_header_cast_unaligned() {
        let mut buf = vec![0u8; 9];
        buf[5..9].copy_from_slice(RecordHeader::new(300).as_bytes());

        let hdr = RecordHeader::cast(&buf[5..]).unwrap();
        assert_eq!(hdr.size(), 300);
        assert!(RecordHeader::cast(&buf[6..]).is_none());
    }
}
