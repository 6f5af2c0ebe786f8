/// A `BytesReader` reads bytes and big-endian integers sequentially from a
/// slice. Used by the host interface parsers, which walk a packet field by
/// field after the header has been validated.
pub(crate) struct BytesReader<'a> {
    buf: &'a [u8],
    idx: usize,
}

impl<'a> BytesReader<'a> {
    /// Construct a new `BytesReader`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, idx: 0 }
    }

    /// Get a slice of the remaining part of the buffer
    pub fn remaining(&self) -> &'a [u8] {
        debug_assert!(self.idx <= self.buf.len());
        self.buf.get(self.idx..).unwrap_or(&[])
    }

    /// Number of bytes consumed so far
    pub fn consumed(&self) -> usize {
        self.idx
    }

    /// Get the next byte from the buffer, if any
    pub fn next(&mut self) -> Option<u8> {
        if let Some(val) = self.buf.get(self.idx) {
            self.idx += 1;
            Some(*val)
        } else {
            None
        }
    }

    /// Get the next `N` bytes as an array. Nothing is consumed if fewer
    /// than `N` bytes remain.
    pub fn next_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let data: [u8; N] = self.buf.get(self.idx..self.idx + N)?.try_into().ok()?;
        self.idx += N;
        Some(data)
    }

    pub fn next_be_i16(&mut self) -> Option<i16> {
        self.next_array().map(i16::from_be_bytes)
    }

    pub fn next_be_u32(&mut self) -> Option<u32> {
        self.next_array().map(u32::from_be_bytes)
    }

    pub fn next_be_i32(&mut self) -> Option<i32> {
        self.next_array().map(i32::from_be_bytes)
    }

    pub fn next_be_u64(&mut self) -> Option<u64> {
        self.next_array().map(u64::from_be_bytes)
    }
}
