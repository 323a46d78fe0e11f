use std::cmp;
use std::ops::{Deref, DerefMut};

/// Capacity of every `FrameBuf`, large enough for the biggest frame any
/// layer produces plus the reassembly slack the TCP buffers need.
pub const BUF_MAX_LEN: usize = 16 * 1024;

/// Offset the data window is placed at by `init`. Leaves room to prepend
/// every header of the deepest egress chain (Ethernet + IPv4 + TCP).
pub const BUF_HEADROOM: usize = 128;

/// Fixed-capacity byte buffer with a movable data window. Headers are
/// prepended by growing the window to the left and stripped by shrinking
/// it from the left, so a frame can travel up and down the protocol layers
/// without being copied.
pub struct FrameBuf {
    buf: Box<[u8]>,
    begin: usize,
    len: usize,
}

impl FrameBuf {
    pub fn new() -> FrameBuf {
        FrameBuf::with_capacity(BUF_MAX_LEN)
    }

    pub fn with_capacity(capacity: usize) -> FrameBuf {
        FrameBuf {
            buf: vec![0; capacity].into_boxed_slice(),
            begin: cmp::min(BUF_HEADROOM, capacity),
            len: 0,
        }
    }

    /// Resets the data window to `len` bytes starting at the reserve
    /// offset. The previous content of the window is left as is, callers
    /// overwrite it.
    pub fn init(&mut self, len: usize) {
        assert!(BUF_HEADROOM + len <= self.buf.len());
        self.begin = BUF_HEADROOM;
        self.len = len;
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Room left for `add_header`.
    pub fn headroom(&self) -> usize {
        self.begin
    }

    /// Room left for `add_padding`.
    pub fn tailroom(&self) -> usize {
        self.buf.len() - self.begin - self.len
    }

    /// Grows the window `n` bytes to the left.
    pub fn add_header(&mut self, n: usize) -> Result<(), ()> {
        if n > self.begin {
            return Err(());
        }
        self.begin -= n;
        self.len += n;
        Ok(())
    }

    /// Shrinks the window `n` bytes from the left.
    pub fn remove_header(&mut self, n: usize) -> Result<(), ()> {
        if n > self.len {
            return Err(());
        }
        self.begin += n;
        self.len -= n;
        Ok(())
    }

    /// Extends the window `n` zeroed bytes to the right.
    pub fn add_padding(&mut self, n: usize) -> Result<(), ()> {
        if n > self.tailroom() {
            return Err(());
        }
        let end = self.begin + self.len;
        for byte in &mut self.buf[end..end + n] {
            *byte = 0;
        }
        self.len += n;
        Ok(())
    }

    /// Shrinks the window `n` bytes from the right.
    pub fn remove_padding(&mut self, n: usize) -> Result<(), ()> {
        if n > self.len {
            return Err(());
        }
        self.len -= n;
        Ok(())
    }

    /// Moves the window back to the buffer origin, turning all headroom
    /// into tailroom. Callers invoke this when `add_padding` reports an
    /// exhausted tail.
    pub fn compact(&mut self) {
        if self.begin != 0 {
            let end = self.begin + self.len;
            self.buf.copy_within(self.begin..end, 0);
            self.begin = 0;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.begin..self.begin + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf[self.begin..self.begin + self.len]
    }

    /// Truncates or extends the window towards the tail without zeroing,
    /// used after a driver wrote directly into the window.
    pub(crate) fn set_len(&mut self, len: usize) {
        assert!(self.begin + len <= self.buf.len());
        self.len = len;
    }
}

impl Clone for FrameBuf {
    fn clone(&self) -> FrameBuf {
        FrameBuf {
            buf: self.buf.clone(),
            begin: self.begin,
            len: self.len,
        }
    }
}

impl Deref for FrameBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for FrameBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_places_window_at_reserve() {
        let mut testee = FrameBuf::new();
        testee.init(100);
        assert_eq!(testee.len(), 100);
        assert_eq!(testee.headroom(), BUF_HEADROOM);
        assert_eq!(testee.tailroom(), BUF_MAX_LEN - BUF_HEADROOM - 100);
    }

    #[test]
    fn header_ops() {
        let mut testee = FrameBuf::new();
        testee.init(10);
        testee.as_mut_slice().copy_from_slice(&[9; 10]);

        testee.add_header(4).unwrap();
        assert_eq!(testee.len(), 14);
        testee.as_mut_slice()[..4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(&testee.as_slice()[..5], &[1, 2, 3, 4, 9]);

        testee.remove_header(4).unwrap();
        assert_eq!(testee.len(), 10);
        assert_eq!(testee.as_slice(), &[9; 10][..]);

        assert!(testee.add_header(BUF_HEADROOM + 1).is_err());
        assert!(testee.remove_header(11).is_err());
    }

    #[test]
    fn padding_is_zeroed() {
        let mut testee = FrameBuf::new();
        testee.init(2);
        testee.as_mut_slice().copy_from_slice(&[0xff, 0xff]);
        testee.add_padding(3).unwrap();
        assert_eq!(testee.as_slice(), &[0xff, 0xff, 0, 0, 0]);
        testee.remove_padding(3).unwrap();
        assert_eq!(testee.len(), 2);
        assert!(testee.remove_padding(3).is_err());
    }

    #[test]
    fn padding_bounded_by_capacity() {
        let mut testee = FrameBuf::with_capacity(256);
        testee.init(0);
        let room = testee.tailroom();
        assert!(testee.add_padding(room + 1).is_err());
        assert!(testee.add_padding(room).is_ok());
    }

    #[test]
    fn compact_reclaims_headroom() {
        let mut testee = FrameBuf::with_capacity(256);
        testee.init(0);
        testee.add_padding(256 - BUF_HEADROOM).unwrap();
        assert_eq!(testee.tailroom(), 0);

        testee.compact();
        assert_eq!(testee.headroom(), 0);
        assert_eq!(testee.tailroom(), BUF_HEADROOM);
        assert!(testee.add_padding(BUF_HEADROOM).is_ok());
    }

    #[test]
    fn compact_preserves_content() {
        let mut testee = FrameBuf::new();
        testee.init(4);
        testee.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        testee.compact();
        assert_eq!(testee.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn clone_is_deep() {
        let mut testee = FrameBuf::new();
        testee.init(3);
        testee.as_mut_slice().copy_from_slice(&[7, 8, 9]);
        let copy = testee.clone();
        testee.as_mut_slice()[0] = 0;
        assert_eq!(copy.as_slice(), &[7, 8, 9]);
    }
}
