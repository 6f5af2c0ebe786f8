/// Helper function to get a fixed-size array at the start of an immutable slice
pub fn ref_array_start<const N: usize>(buf: &[u8]) -> Option<&[u8; N]> {
    buf.get(..N.min(buf.len()))?.try_into().ok()
}

/// Helper function to get a fixed-size array at the start of a mutable slice
pub fn mut_array_start<const N: usize>(buf: &mut [u8]) -> Option<&mut [u8; N]> {
    buf.get_mut(..N.min(buf.len()))?.try_into().ok()
}

/// Write big-endian fields into a packet buffer from a running offset.
pub(crate) struct BytesWriter<'a> {
    buf: &'a mut [u8],
    idx: usize,
}

impl<'a> BytesWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, idx: 0 }
    }

    /// Start writing after a header that has already been placed.
    pub fn at(buf: &'a mut [u8], idx: usize) -> Self {
        Self { buf, idx }
    }

    pub fn written(&self) -> usize {
        self.idx
    }

    /// Copy `bytes` at the cursor. Bytes past the end of the buffer are lost,
    /// callers size their buffer from the packet length first.
    pub fn put(&mut self, bytes: &[u8]) -> &mut Self {
        let end = (self.idx + bytes.len()).min(self.buf.len());
        if let (Some(dst), Some(src)) = (
            self.buf.get_mut(self.idx..end),
            bytes.get(..end.saturating_sub(self.idx)),
        ) {
            dst.copy_from_slice(src);
        }
        debug_assert!(end == self.idx + bytes.len(), "Packet buffer overrun");
        self.idx = end;
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.put(&[value])
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.put(&value.to_be_bytes())
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.put(&value.to_be_bytes())
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.put(&value.to_be_bytes())
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.put(&value.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_array_start() {
        let buf = [1u8, 2, 3];
        assert_eq!(ref_array_start::<2>(&buf), Some(&[1, 2]));
        assert_eq!(ref_array_start::<4>(&buf), None);
    }

    #[test]
    fn test_bytes_writer() {
        let mut buf = [0u8; 11];
        let written = BytesWriter::at(&mut buf, 1)
            .i16(-2)
            .u32(0x0A0B0C0D)
            .i32(-1)
            .written();
        assert_eq!(written, 11);
        assert_eq!(buf, hex!("00 FF FE 0A 0B 0C 0D FF FF FF FF"));
    }
}
