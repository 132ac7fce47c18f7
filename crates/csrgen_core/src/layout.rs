//! Bit layout of fields and the literal text derived from it.

use crate::bitfield::BitField;
use crate::width::IntWidth;
use core::fmt;

/// Position of a field inside its register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldLayout {
    pub offset: u32,
    pub width: u32,
}

impl FieldLayout {
    pub fn new(offset: u32, width: u32) -> Self {
        Self { offset, width }
    }

    /// One past the most significant bit of the field.
    pub fn end(&self) -> u32 {
        self.offset + self.width
    }

    /// The field bits in register space.
    pub fn mask(&self) -> u128 {
        let mut mask = 0u128;
        if self.width > 0 {
            mask.set_bits(self.offset..self.end(), self.all_set_mask());
        }
        mask
    }

    /// The field bits shifted down to bit `0`.
    pub fn all_set_mask(&self) -> u128 {
        u128::ones(self.width)
    }

    pub fn overlaps(&self, other: &FieldLayout) -> bool {
        self.mask() & other.mask() != 0
    }

    /// Render every constant of this field.
    ///
    /// `register` sizes the shifted mask and `element` the unshifted one.
    pub fn literals(&self, register: IntWidth, element: IntWidth) -> Literals {
        Literals {
            bit_offset: self.offset.to_string(),
            bit_width: self.width.to_string(),
            bit_mask: HexLiteral::new(self.mask(), register).to_string(),
            all_set_mask: HexLiteral::new(self.all_set_mask(), element).to_string(),
        }
    }
}

/// The rendered constants of a field, shared verbatim by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literals {
    pub bit_offset: String,
    pub bit_width: String,
    pub bit_mask: String,
    pub all_set_mask: String,
}

/// A zero padded, lower case hex literal sized to an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexLiteral {
    value: u128,
    width: IntWidth,
}

impl HexLiteral {
    pub fn new(value: u128, width: IntWidth) -> Self {
        Self { value, width }
    }
}

impl fmt::Display for HexLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:0width$x}", self.value, width = self.width.hex_digits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_field() {
        let msi = FieldLayout::new(3, 1);
        assert_eq!(msi.mask(), 0x8);
        assert_eq!(msi.all_set_mask(), 0x1);

        let lits = msi.literals(IntWidth::U64, IntWidth::U64);
        assert_eq!(lits.bit_offset, "3");
        assert_eq!(lits.bit_width, "1");
        assert_eq!(lits.bit_mask, "0x0000000000000008");
        assert_eq!(lits.all_set_mask, "0x0000000000000001");
    }

    #[test]
    fn mask_is_shifted_all_set_mask() {
        for &(offset, width) in [(0, 1), (2, 62), (7, 2), (11, 2), (31, 1), (0, 64)].iter() {
            let layout = FieldLayout::new(offset, width);
            let shifted = (layout.all_set_mask() << offset) & u64::MAX as u128;
            assert_eq!(layout.mask(), shifted, "offset {} width {}", offset, width);
        }
    }

    #[test]
    fn full_width_field_is_all_ones() {
        let layout = FieldLayout::new(0, 32);
        let lits = layout.literals(IntWidth::U32, IntWidth::U32);
        assert_eq!(lits.bit_mask, "0xffffffff");
        assert_eq!(lits.all_set_mask, "0xffffffff");

        let layout = FieldLayout::new(0, 64);
        let lits = layout.literals(IntWidth::U64, IntWidth::U64);
        assert_eq!(lits.bit_mask, "0xffffffffffffffff");
        assert_eq!(lits.all_set_mask, "0xffffffffffffffff");
    }

    #[test]
    fn masks_are_sized_independently() {
        let mpp = FieldLayout::new(11, 2);
        let lits = mpp.literals(IntWidth::U32, IntWidth::U8);
        assert_eq!(lits.bit_mask, "0x00001800");
        assert_eq!(lits.all_set_mask, "0x03");
    }

    #[test]
    fn overlap() {
        let a = FieldLayout::new(0, 4);
        assert!(a.overlaps(&FieldLayout::new(3, 2)));
        assert!(!a.overlaps(&FieldLayout::new(4, 2)));
    }

    #[test]
    fn literals_are_idempotent() {
        let layout = FieldLayout::new(2, 62);
        assert_eq!(
            layout.literals(IntWidth::U64, IntWidth::U64),
            layout.literals(IntWidth::U64, IntWidth::U64)
        );
    }
}
