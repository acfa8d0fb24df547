//! Unsigned integers restricted to a fixed number of bits.
//!
//! Every sub-byte header field is a [`SmallUint`]: the value lives in the
//! smallest native integer that holds it, and can never exceed `2^N - 1`.

use std::fmt;

use crate::error::{FrameError, Result};

/// Native unsigned integers that can back a [`SmallUint`].
pub trait Repr: Copy + Default + Eq + Ord + fmt::Debug + fmt::Display {
    const BITS: u32;

    fn to_u64(self) -> u64;

    /// Truncating conversion; callers mask first.
    fn from_u64(value: u64) -> Self;
}

macro_rules! impl_repr {
    ($($ty:ty),*) => {
        $(
            impl Repr for $ty {
                const BITS: u32 = <$ty>::BITS;

                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_u64(value: u64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_repr!(u8, u16, u32, u64);

/// An unsigned value of `N` bits stored in `T`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SmallUint<T: Repr, const N: u32>(T);

impl<T: Repr, const N: u32> SmallUint<T, N> {
    /// Number of bits.
    pub const BITS: u32 = N;

    /// Largest representable value, `2^N - 1`.
    pub const MAX: u64 = if N >= 64 { u64::MAX } else { (1u64 << N) - 1 };

    const WIDTH_FITS: () = assert!(N >= 1 && N <= T::BITS, "bit width exceeds representation");

    /// Checked constructor: values above [`Self::MAX`] are rejected.
    pub fn new(value: u64) -> Result<Self> {
        let () = Self::WIDTH_FITS;
        if value > Self::MAX {
            return Err(FrameError::FieldOverflow { value, bits: N });
        }
        Ok(Self(T::from_u64(value)))
    }

    /// Keeps only the low `N` bits of `value`.
    pub fn masked(value: u64) -> Self {
        let () = Self::WIDTH_FITS;
        Self(T::from_u64(value & Self::MAX))
    }

    /// Assign with masking.
    pub fn set(&mut self, value: u64) {
        *self = Self::masked(value);
    }

    pub fn get(self) -> T {
        self.0
    }

    pub fn to_u64(self) -> u64 {
        self.0.to_u64()
    }

    /// Addition modulo `2^N`.
    pub fn wrapping_add(self, rhs: u64) -> Self {
        Self::masked(self.to_u64().wrapping_add(rhs))
    }

    pub fn is_max(self) -> bool {
        self.to_u64() == Self::MAX
    }
}

impl<T: Repr, const N: u32> fmt::Debug for SmallUint<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{N}({})", self.0)
    }
}

impl<T: Repr, const N: u32> fmt::Display for SmallUint<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<T: Repr, const N: u32> From<SmallUint<T, N>> for u64 {
    fn from(value: SmallUint<T, N>) -> Self {
        value.to_u64()
    }
}

impl<T: Repr, const N: u32> PartialEq<u64> for SmallUint<T, N> {
    fn eq(&self, other: &u64) -> bool {
        self.to_u64() == *other
    }
}

/// 7-bit message ID.
pub type MsgId = SmallUint<u8, 7>;
/// 11-bit frame payload length.
pub type DataLen = SmallUint<u16, 11>;
/// 14-bit frame checksum.
pub type FrameCrc = SmallUint<u16, 14>;
/// 11-bit count of frames in a group.
pub type NumFrames = SmallUint<u16, 11>;
/// 5-bit group header length.
pub type HeaderLen = SmallUint<u8, 5>;
/// 8-bit group header checksum.
pub type HeaderCrc = SmallUint<u8, 8>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_values() {
        assert_eq!(MsgId::MAX, 127);
        assert_eq!(DataLen::MAX, 2047);
        assert_eq!(FrameCrc::MAX, 0x3FFF);
        assert_eq!(HeaderLen::MAX, 31);
        assert_eq!(HeaderCrc::MAX, 255);
        assert_eq!(SmallUint::<u64, 64>::MAX, u64::MAX);
    }

    #[test]
    fn checked_constructor_rejects_overflow() {
        assert_eq!(MsgId::new(126).unwrap().get(), 126);
        let err = MsgId::new(128).unwrap_err();
        assert!(matches!(
            err,
            FrameError::FieldOverflow {
                value: 128,
                bits: 7
            }
        ));
    }

    #[test]
    fn assignment_masks() {
        let mut len = DataLen::default();
        len.set(2048 + 5);
        assert_eq!(len.get(), 5);
        assert_eq!(DataLen::masked(0xFFFF).get(), 2047);
    }

    #[test]
    fn wrapping_add_stays_in_range() {
        let count = NumFrames::masked(2047);
        assert!(count.is_max());
        assert_eq!(count.wrapping_add(1).get(), 0);
        assert_eq!(NumFrames::masked(10).wrapping_add(5), 15u64);
    }

    #[test]
    fn ordering_and_formatting() {
        assert!(MsgId::masked(3) < MsgId::masked(4));
        assert_eq!(MsgId::masked(10).to_string(), "10");
        assert_eq!(format!("{:?}", FrameCrc::masked(7)), "u14(7)");
        assert_eq!(u64::from(HeaderLen::masked(13)), 13);
    }
}
