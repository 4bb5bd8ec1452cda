/*!
 * Packet Header
 * The fixed 10-byte little-endian frame preamble
 */

use crate::core::errors::ProtocolError;

/// Packet kind tag carried in every header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    Request = 0,
    Response = 1,
    Notification = 2,
}

impl TryFrom<u8> for PacketKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketKind::Request),
            1 => Ok(PacketKind::Response),
            2 => Ok(PacketKind::Notification),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

/// The wire header:
///
/// ```text
/// offset  field
///      0  size       (u32) — bytes that follow the size field = body_len + 6
///      4  request_id (u32) — correlation id, 0 for notifications
///      8  kind       (u8)  — 0 request, 1 response, 2 notification
///      9  opcode     (u8)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub size: u32,
    pub request_id: u32,
    pub kind: PacketKind,
    pub opcode: u8,
}

impl PacketHeader {
    pub const SIZE: usize = 10;

    /// Build an outbound header; `size` is derived from the body length.
    pub fn new(kind: PacketKind, opcode: u8, request_id: u32, body_len: usize) -> Self {
        Self {
            size: (body_len + Self::SIZE - std::mem::size_of::<u32>()) as u32,
            request_id,
            kind,
            opcode,
        }
    }

    /// Body length implied by the size field, or an error when the field is
    /// smaller than the header remainder it must at least cover.
    pub fn body_len(&self) -> Result<usize, ProtocolError> {
        (self.size as usize + std::mem::size_of::<u32>())
            .checked_sub(Self::SIZE)
            .ok_or(ProtocolError::BadSizeField(self.size))
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.size.to_le_bytes());
        out[4..8].copy_from_slice(&self.request_id.to_le_bytes());
        out[8] = self.kind as u8;
        out[9] = self.opcode;
        out
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < Self::SIZE {
            return Err(ProtocolError::ShortHeader(buf.len()));
        }

        let size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let request_id = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let kind = PacketKind::try_from(buf[8])?;

        Ok(Self {
            size,
            request_id,
            kind,
            opcode: buf[9],
        })
    }
}
