use core::ops::{Bound, Range, RangeBounds};

/// A generic trait which provides methods for extracting and setting ranges of bits
/// inside the integers that are used to compute register masks.
pub trait BitField: Copy {
    /// The number of bits this bit field has.
    const BIT_LENGTH: u32;

    /// Returns a value with the lowest `width` bits set.
    ///
    /// A `width` that covers the whole integer yields all ones.
    fn ones(width: u32) -> Self;

    /// Set the range of bits to the given value.
    fn set_bits<T: RangeBounds<u32>>(&mut self, range: T, value: Self);

    /// Checks if this value can be represented using only the lowest `bits` bits.
    fn fits_in(&self, bits: u32) -> bool;
}

macro_rules! num_impl {
    ($($t:ty)*) => ($(
        impl BitField for $t {
            const BIT_LENGTH: u32 = <$t>::BITS;

            #[inline]
            fn ones(width: u32) -> Self {
                if width >= Self::BIT_LENGTH {
                    !0
                } else {
                    (1 << width) - 1
                }
            }

            #[inline]
            fn set_bits<T: RangeBounds<u32>>(&mut self, range: T, value: Self) {
                let range = normalize_range(&range, Self::BIT_LENGTH);

                assert!(range.start < range.end);
                assert!(range.end <= Self::BIT_LENGTH);

                let width = range.end - range.start;
                assert!(value.fits_in(width), "value does not fit into bit range");

                let bitmask = Self::ones(width) << range.start;
                *self = (*self & !bitmask) | (value << range.start);
            }

            #[inline]
            fn fits_in(&self, bits: u32) -> bool {
                *self & Self::ones(bits) == *self
            }
        }
    )*)
}

num_impl! { u128 }

fn normalize_range<T: RangeBounds<u32>>(generic_range: &T, bit_length: u32) -> Range<u32> {
    let start = match generic_range.start_bound() {
        Bound::Excluded(&value) => value + 1,
        Bound::Included(&value) => value,
        Bound::Unbounded => 0,
    };
    let end = match generic_range.end_bound() {
        Bound::Excluded(&value) => value,
        Bound::Included(&value) => value + 1,
        Bound::Unbounded => bit_length,
    };

    start..end
}

#[cfg(test)]
mod tests {
    use super::BitField;

    #[test]
    fn ones_saturates_at_full_width() {
        assert_eq!(u128::ones(0), 0);
        assert_eq!(u128::ones(5), 0x1f);
        assert_eq!(u128::ones(64), u64::MAX as u128);
        assert_eq!(u128::ones(128), u128::MAX);
        assert_eq!(u128::ones(200), u128::MAX);
    }

    #[test]
    fn set_range() {
        let mut mask = 0u128;
        mask.set_bits(7..9, 0b11);
        assert_eq!(mask, 0x180);
        mask.set_bits(8..=8, 0);
        assert_eq!(mask, 0x80);
        mask.set_bits(64.., 1);
        assert_eq!(mask, (1u128 << 64) | 0x80);
    }

    #[test]
    fn set_bits_replaces_existing_bits() {
        let mut value = u128::MAX;
        value.set_bits(0..4, 0b0101);
        assert_eq!(value, u128::MAX & !0b1010);
    }

    #[test]
    #[should_panic(expected = "value does not fit")]
    fn set_bits_rejects_oversized_value() {
        let mut value = 0u128;
        value.set_bits(0..2, 0b100);
    }

    #[test]
    fn fits_in() {
        assert!(31u128.fits_in(5));
        assert!(!32u128.fits_in(5));
        assert!(0u128.fits_in(0));
    }
}
