/*!
 * Packet Codec
 * Fixed header layout and typed field readers/writers over byte buffers
 */

pub mod header;
pub mod reader;
pub mod writer;

pub use header::{PacketHeader, PacketKind};
pub use reader::PacketReader;
pub use writer::PacketWriter;

/// Fixed-width values that cross the wire in little-endian byte order.
///
/// Sealed over the primitive integers, floats, and `bool`; everything a
/// packet body is built from.
pub trait WireScalar: Copy + Sized {
    const WIDTH: usize;

    fn from_le_slice(bytes: &[u8]) -> Self;
    fn put_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_wire_scalar {
    ($($ty:ty),*) => {
        $(
            impl WireScalar for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn put_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_wire_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl WireScalar for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn put_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}
