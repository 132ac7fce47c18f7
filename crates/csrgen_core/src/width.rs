//! Machine word size and native integer width selection.

use crate::error::Error;
use core::fmt;
use std::convert::TryFrom;

/// The target machine word size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Xlen {
    Rv32,
    Rv64,
}

impl Xlen {
    /// The number of bits inside a general purpose register.
    pub fn bits(self) -> u32 {
        match self {
            Xlen::Rv32 => 32,
            Xlen::Rv64 => 64,
        }
    }

    /// The native integer used to move values between general purpose
    /// registers and CSRs.
    pub fn int(self) -> IntWidth {
        match self {
            Xlen::Rv32 => IntWidth::U32,
            Xlen::Rv64 => IntWidth::U64,
        }
    }
}

impl TryFrom<u32> for Xlen {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(Xlen::Rv32),
            64 => Ok(Xlen::Rv64),
            bits => Err(Error::UnsupportedWidth { bits }),
        }
    }
}

impl fmt::Display for Xlen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RV{}", self.bits())
    }
}

/// A native unsigned integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntWidth {
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    /// Returns the integer type that has exactly `bits` bits.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(IntWidth::U8),
            16 => Some(IntWidth::U16),
            32 => Some(IntWidth::U32),
            64 => Some(IntWidth::U64),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            IntWidth::U8 => 8,
            IntWidth::U16 => 16,
            IntWidth::U32 => 32,
            IntWidth::U64 => 64,
        }
    }

    /// Number of hex digits needed to print every value of this type.
    pub fn hex_digits(self) -> usize {
        (self.bits() / 4) as usize
    }
}

/// The width a register or field element declares in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidthSpec {
    /// Follows the machine word size.
    Xlen,
    /// Architecturally fixed to the given number of bits.
    Fixed(IntWidth),
}

impl WidthSpec {
    /// Select the native integer for this declaration on the given machine.
    ///
    /// A fixed width never exceeds the machine word: a 64-bit counter is
    /// accessed as its low 32 bits on RV32.
    pub fn resolve(self, xlen: Xlen) -> IntWidth {
        match self {
            WidthSpec::Xlen => xlen.int(),
            WidthSpec::Fixed(width) => width.min(xlen.int()),
        }
    }
}

impl Default for WidthSpec {
    fn default() -> Self {
        WidthSpec::Xlen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_32_and_64_are_supported() {
        assert_eq!(Xlen::try_from(32).unwrap(), Xlen::Rv32);
        assert_eq!(Xlen::try_from(64).unwrap(), Xlen::Rv64);

        for bits in [0, 16, 33, 128].iter().copied() {
            match Xlen::try_from(bits) {
                Err(Error::UnsupportedWidth { bits: got }) => assert_eq!(got, bits),
                other => panic!("expected unsupported width, got {:?}", other),
            }
        }
    }

    #[test]
    fn transfer_type_follows_word_size() {
        assert_eq!(WidthSpec::Xlen.resolve(Xlen::Rv32), IntWidth::U32);
        assert_eq!(WidthSpec::Xlen.resolve(Xlen::Rv64), IntWidth::U64);
    }

    #[test]
    fn fixed_width_is_sized_independently() {
        let fixed32 = WidthSpec::Fixed(IntWidth::U32);
        assert_eq!(fixed32.resolve(Xlen::Rv64), IntWidth::U32);
        assert_eq!(fixed32.resolve(Xlen::Rv32), IntWidth::U32);

        let fixed64 = WidthSpec::Fixed(IntWidth::U64);
        assert_eq!(fixed64.resolve(Xlen::Rv64), IntWidth::U64);
        assert_eq!(fixed64.resolve(Xlen::Rv32), IntWidth::U32);

        assert_eq!(WidthSpec::Fixed(IntWidth::U8).resolve(Xlen::Rv32), IntWidth::U8);
    }
}
