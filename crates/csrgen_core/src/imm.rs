//! Selection between the register and immediate operand forms of CSR instructions.

/// The immediate CSR instructions encode their operand in a 5-bit field.
pub const IMM_BITS: u32 = 5;

/// Mask of the bits an immediate operand can carry.
pub const IMM_MASK: u128 = 0x1F;

/// Checks if `value` can be encoded as the operand of an immediate CSR instruction.
#[inline]
pub fn is_immediate_eligible(value: u128) -> bool {
    value & IMM_MASK == value
}

/// The operand form of a CSR instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    /// The operand is encoded in the instruction (`csrrwi`, ...).
    Immediate,
    /// The operand is read from a general purpose register (`csrrw`, ...).
    Register,
}

impl Form {
    /// Select the form for an operand that is known at generation time.
    pub fn for_const(value: u128) -> Self {
        if is_immediate_eligible(value) {
            Form::Immediate
        } else {
            Form::Register
        }
    }

    /// Operands that are only known at run time always live in a register.
    pub fn for_runtime() -> Self {
        Form::Register
    }

    pub fn is_immediate(self) -> bool {
        self == Form::Immediate
    }
}
