/*!
 * Packet Writer
 * Growable, bounded packet body builder
 */

use super::WireScalar;
use crate::core::errors::CodecError;
use crate::core::limits::{MAX_PACKET_SIZE, WRITER_INITIAL_RESERVATION};

/// Accumulates a packet body. Capacity doubles on growth up to the
/// configured maximum; an append that would cross the maximum fails without
/// writing anything.
pub struct PacketWriter {
    buffer: Vec<u8>,
    max_size: usize,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::with_max(MAX_PACKET_SIZE)
    }

    pub fn with_max(max_size: usize) -> Self {
        let mut buffer = Vec::new();
        buffer.reserve(WRITER_INITIAL_RESERVATION.min(max_size));
        Self { buffer, max_size }
    }

    /// Append a fixed-width scalar in little-endian byte order.
    pub fn write<T: WireScalar>(&mut self, value: T) -> Result<(), CodecError> {
        self.ensure_capacity(T::WIDTH)?;
        value.put_le(&mut self.buffer);
        Ok(())
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), CodecError> {
        if data.is_empty() {
            return Ok(());
        }
        self.ensure_capacity(data.len())?;
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Append a 32-bit signed length followed by the string bytes.
    pub fn write_size_prefixed_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.ensure_capacity(std::mem::size_of::<i32>() + value.len())?;
        (value.len() as i32).put_le(&mut self.buffer);
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Append string bytes with no length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_bytes(value.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    fn ensure_capacity(&mut self, additional: usize) -> Result<(), CodecError> {
        let required = self.buffer.len() + additional;
        if required > self.max_size {
            return Err(CodecError::Overflow {
                requested: additional,
                max: self.max_size,
            });
        }

        if self.buffer.capacity() < required {
            let doubled = (self.buffer.capacity() * 2).max(required).min(self.max_size);
            self.buffer.reserve_exact(doubled - self.buffer.len());
        }
        Ok(())
    }
}

impl Default for PacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_and_string_layout() {
        let mut writer = PacketWriter::new();
        writer.write(7u32).unwrap();
        writer.write(true).unwrap();
        writer.write_size_prefixed_string("ab").unwrap();
        writer.write_string("c").unwrap();

        let expected: Vec<u8> = [
            7u32.to_le_bytes().as_slice(),
            &[1],
            2i32.to_le_bytes().as_slice(),
            b"ab",
            b"c",
        ]
        .concat();
        assert_eq!(writer.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_overflow_leaves_buffer_untouched() {
        let mut writer = PacketWriter::with_max(4);
        writer.write(1u16).unwrap();

        let err = writer.write_bytes(&[0u8; 3]).unwrap_err();
        assert!(matches!(err, CodecError::Overflow { requested: 3, .. }));
        assert_eq!(writer.len(), 2);

        // exactly filling the remaining space still works
        writer.write_bytes(&[9, 9]).unwrap();
        assert_eq!(writer.len(), 4);
    }

    #[test]
    fn test_empty_append_always_succeeds() {
        let mut writer = PacketWriter::with_max(0);
        writer.write_bytes(&[]).unwrap();
        assert!(writer.is_empty());
    }
}
