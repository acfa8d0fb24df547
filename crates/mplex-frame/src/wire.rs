//! Fixed-size values that can be written into and read from a frame payload.
//!
//! Multi-byte values always travel big-endian, whatever the host order.

use bytes::{Buf, BufMut};

/// A plain value with a fixed big-endian wire image.
pub trait WireValue: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn put<B: BufMut>(&self, dst: &mut B);

    fn get<B: Buf>(src: &mut B) -> Self;
}

macro_rules! impl_wire_value {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl WireValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn put<B: BufMut>(&self, dst: &mut B) {
                    dst.$put(*self);
                }

                #[inline]
                fn get<B: Buf>(src: &mut B) -> Self {
                    src.$get()
                }
            }
        )*
    };
}

impl_wire_value! {
    u8 => put_u8, get_u8;
    i8 => put_i8, get_i8;
    u16 => put_u16, get_u16;
    i16 => put_i16, get_i16;
    u32 => put_u32, get_u32;
    i32 => put_i32, get_i32;
    u64 => put_u64, get_u64;
    i64 => put_i64, get_i64;
    f32 => put_f32, get_f32;
    f64 => put_f64, get_f64;
}

impl WireValue for bool {
    const SIZE: usize = 1;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u8(u8::from(*self));
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        src.get_u8() != 0
    }
}

impl<const N: usize> WireValue for [u8; N] {
    const SIZE: usize = N;

    fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_slice(self);
    }

    fn get<B: Buf>(src: &mut B) -> Self {
        let mut out = [0u8; N];
        src.copy_to_slice(&mut out);
        out
    }
}
