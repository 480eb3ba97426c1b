//! Packed bit buffers.
//!
//! Bits are stored in transmission order: bit `n` of a stream lives in
//! byte `n / 8` at bit position `n % 8`. Multi-bit values are written and
//! read most significant bit first.

/// A packed, fixed-length sequence of bits.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bitstream {
    data: Vec<u8>,
    len: usize,
}

impl Bitstream {
    /// Creates an empty bitstream.
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream of `len` zero bits.
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Packs one bit per input byte (non-zero = 1).
    pub fn from_bits(bits: &[u8]) -> Self {
        let mut writer = BitWriter::with_capacity(bits.len());
        for &bit in bits {
            writer.write_bit(bit);
        }
        writer.finish()
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the stream holds no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Packed bytes; bits past `len` in the last byte are zero.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns bit `index`.
    #[inline]
    pub fn bit(&self, index: usize) -> Option<u8> {
        (index < self.len).then(|| (self.data[index >> 3] >> (index & 7)) & 1)
    }

    /// Unpacks into one byte per bit.
    pub fn to_bits(&self) -> Vec<u8> {
        (0..self.len)
            .map(|i| (self.data[i >> 3] >> (i & 7)) & 1)
            .collect()
    }

    /// Returns a reader positioned at bit 0.
    pub fn reader(&self) -> BitReader<'_> {
        BitReader::new(&self.data, self.len)
    }

    /// Counts the set bits.
    pub fn popcount(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }
}

impl std::fmt::Debug for Bitstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitstream")
            .field("bits", &self.len)
            .field("bytes", &self.data.len())
            .field("ones", &self.popcount())
            .finish()
    }
}

/// Appends bits to a growing [`Bitstream`].
#[derive(Debug, Default)]
pub struct BitWriter {
    stream: Bitstream,
}

impl BitWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with room for `bits` bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            stream: Bitstream {
                data: Vec::with_capacity(bits.div_ceil(8)),
                len: 0,
            },
        }
    }

    /// Bits written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.stream.len
    }

    /// Returns true if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stream.len == 0
    }

    /// Appends one bit (non-zero = 1).
    #[inline]
    pub fn write_bit(&mut self, bit: u8) {
        let offset = self.stream.len & 7;
        if offset == 0 {
            self.stream.data.push(0);
        }
        if bit != 0 {
            if let Some(byte) = self.stream.data.last_mut() {
                *byte |= 1 << offset;
            }
        }
        self.stream.len += 1;
    }

    /// Appends the low `count` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, count: usize) {
        debug_assert!(count <= 64);
        for i in (0..count).rev() {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    /// Appends the low `count` bits of `value`, least significant first.
    pub fn write_bits_lsb(&mut self, value: u64, count: usize) {
        debug_assert!(count <= 64);
        for i in 0..count {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    /// Appends `count` zero bits.
    pub fn write_zeros(&mut self, count: usize) {
        for _ in 0..count {
            self.write_bit(0);
        }
    }

    /// Appends every bit of another stream.
    pub fn append(&mut self, other: &Bitstream) {
        if self.stream.len & 7 == 0 {
            self.stream.data.extend_from_slice(&other.data);
            self.stream.len += other.len;
            return;
        }
        let mut reader = other.reader();
        while let Some(bit) = reader.read_bit() {
            self.write_bit(bit);
        }
    }

    /// Returns the finished stream.
    pub fn finish(self) -> Bitstream {
        self.stream
    }
}

/// Sequential reader over packed bits.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    len: usize,
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Reads the first `len` bits of `data`.
    pub fn new(data: &'a [u8], len: usize) -> Self {
        Self {
            data,
            len: len.min(data.len() * 8),
            pos: 0,
        }
    }

    /// Current bit position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bits left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len - self.pos
    }

    /// Reads one bit.
    #[inline]
    pub fn read_bit(&mut self) -> Option<u8> {
        if self.pos >= self.len {
            return None;
        }
        let bit = (self.data[self.pos >> 3] >> (self.pos & 7)) & 1;
        self.pos += 1;
        Some(bit)
    }

    /// Reads `count` bits; the first bit read becomes the most significant.
    pub fn read_bits(&mut self, count: usize) -> Option<u64> {
        if count > 64 || count > self.remaining() {
            return None;
        }
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Some(value)
    }

    /// Copies the next `count` bits into a new stream.
    pub fn read_stream(&mut self, count: usize) -> Option<Bitstream> {
        if count > self.remaining() {
            return None;
        }
        let mut writer = BitWriter::with_capacity(count);
        for _ in 0..count {
            writer.write_bit(self.read_bit()?);
        }
        Some(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_fill_from_bit_zero() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        let stream = writer.finish();

        assert_eq!(stream.len(), 3);
        assert_eq!(stream.bytes(), &[0b0000_0101]);
        assert_eq!(stream.to_bits(), [1, 0, 1]);
    }

    #[test]
    fn test_write_bits_msb_first() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1000_0000_01, 10);
        let stream = writer.finish();

        assert_eq!(stream.to_bits(), [1, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(stream.bytes(), &[0x01, 0x02]);
    }

    #[test]
    fn test_write_bits_lsb_keeps_value_in_place() {
        let mut writer = BitWriter::new();
        writer.write_bits_lsb(0x2E0, 10);
        let stream = writer.finish();

        assert_eq!(stream.bytes(), &[0xE0, 0x02]);
    }

    #[test]
    fn test_read_bits_inverts_write_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0x2A5, 10);
        writer.write_bits(0x3, 2);
        writer.write_bit(1);
        let stream = writer.finish();

        let mut reader = stream.reader();
        assert_eq!(reader.read_bits(10), Some(0x2A5));
        assert_eq!(reader.read_bits(2), Some(0x3));
        assert_eq!(reader.read_bit(), Some(1));
        assert_eq!(reader.read_bit(), None);
        assert_eq!(reader.read_bits(1), None);
    }

    #[test]
    fn test_append_unaligned() {
        let first = Bitstream::from_bits(&[1, 1, 0]);
        let second = Bitstream::from_bits(&[0, 1, 1, 1, 1, 1, 1, 1, 0, 1]);

        let mut writer = BitWriter::new();
        writer.append(&first);
        writer.append(&second);
        let stream = writer.finish();

        assert_eq!(stream.len(), 13);
        assert_eq!(
            stream.to_bits(),
            [1, 1, 0, 0, 1, 1, 1, 1, 1, 1, 1, 0, 1]
        );
    }

    #[test]
    fn test_append_aligned_keeps_length() {
        let part = Bitstream::from_bits(&[1; 99]);

        let mut writer = BitWriter::new();
        writer.write_zeros(8);
        writer.append(&part);
        writer.append(&part);
        let stream = writer.finish();

        assert_eq!(stream.len(), 8 + 198);
        assert_eq!(stream.popcount(), 198);
        assert_eq!(stream.bit(7), Some(0));
        assert_eq!(stream.bit(8), Some(1));
        assert_eq!(stream.bit(206), None);
    }

    #[test]
    fn test_read_stream_slices() {
        let stream = Bitstream::from_bits(&[0, 1, 1, 0, 1]);
        let mut reader = stream.reader();
        reader.read_bit();

        let slice = reader.read_stream(3).unwrap();
        assert_eq!(slice.to_bits(), [1, 1, 0]);
        assert_eq!(reader.remaining(), 1);
        assert!(reader.read_stream(2).is_none());
    }
}
