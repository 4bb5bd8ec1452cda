/*!
 * Packet Reader
 * Bounds-checked cursor over a received packet body
 */

use super::WireScalar;

/// A cursor over `(data, position)`. Every read that would run past the end
/// of the buffer fails and leaves the cursor where it was.
pub struct PacketReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read a fixed-width little-endian scalar.
    pub fn read<T: WireScalar>(&mut self) -> Option<T> {
        if !self.has_available(T::WIDTH) {
            return None;
        }

        let value = T::from_le_slice(&self.data[self.position..]);
        self.position += T::WIDTH;
        Some(value)
    }

    /// Borrow the next `len` bytes without copying.
    pub fn read_slice(&mut self, len: usize) -> Option<&'a [u8]> {
        if !self.has_available(len) {
            return None;
        }

        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Some(slice)
    }

    /// Copy the next `len` bytes into `destination`.
    pub fn read_bytes(&mut self, destination: &mut [u8]) -> bool {
        match self.read_slice(destination.len()) {
            Some(slice) => {
                destination.copy_from_slice(slice);
                true
            }
            None => false,
        }
    }

    /// Read `len` raw bytes as a string (invalid UTF-8 is replaced).
    pub fn read_string(&mut self, len: usize) -> Option<String> {
        self.read_slice(len)
            .map(|slice| String::from_utf8_lossy(slice).into_owned())
    }

    /// Read a 32-bit signed length followed by that many string bytes.
    /// Negative or oversized lengths fail without advancing past the prefix's
    /// original position.
    pub fn read_size_prefixed_string(&mut self) -> Option<String> {
        let start = self.position;
        let len = match self.read::<i32>() {
            Some(len) if len >= 0 => len as usize,
            _ => {
                self.position = start;
                return None;
            }
        };

        match self.read_string(len) {
            Some(value) => Some(value),
            None => {
                self.position = start;
                None
            }
        }
    }

    /// Hand the next `len` bytes to `writer` without an intermediate copy.
    /// The cursor advances only when the callback accepts the bytes.
    pub fn copy_to<F>(&mut self, len: usize, mut writer: F) -> bool
    where
        F: FnMut(&[u8]) -> bool,
    {
        if !self.has_available(len) {
            return false;
        }

        if !writer(&self.data[self.position..self.position + len]) {
            return false;
        }

        self.position += len;
        true
    }

    pub fn skip(&mut self, len: usize) -> bool {
        if !self.has_available(len) {
            return false;
        }
        self.position += len;
        true
    }

    pub fn has_available(&self, len: usize) -> bool {
        self.position + len <= self.data.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}
