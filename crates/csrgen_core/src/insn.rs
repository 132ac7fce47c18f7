//! The CSR instructions behind every accessor.

use crate::imm::Form;

/// The primitive accessors every backend renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Read,
    Write,
    ReadWrite,
    SetBits,
    ClrBits,
    ReadSetBits,
    ReadClrBits,
}

impl Verb {
    pub fn name(self) -> &'static str {
        match self {
            Verb::Read => "read",
            Verb::Write => "write",
            Verb::ReadWrite => "read_write",
            Verb::SetBits => "set_bits",
            Verb::ClrBits => "clr_bits",
            Verb::ReadSetBits => "read_set_bits",
            Verb::ReadClrBits => "read_clr_bits",
        }
    }

    /// One line description used in generated comments.
    pub fn summary(self) -> &'static str {
        match self {
            Verb::Read => "read the register",
            Verb::Write => "write the register",
            Verb::ReadWrite => "write the register and return its previous value",
            Verb::SetBits => "set the bits of the mask",
            Verb::ClrBits => "clear the bits of the mask",
            Verb::ReadSetBits => "set the bits of the mask and return the previous value",
            Verb::ReadClrBits => "clear the bits of the mask and return the previous value",
        }
    }

    /// Checks if the accessor hands back the previous register value.
    pub fn returns_value(self) -> bool {
        matches!(
            self,
            Verb::Read | Verb::ReadWrite | Verb::ReadSetBits | Verb::ReadClrBits
        )
    }

    /// Name of the operand the accessor takes, if any.
    pub fn operand(self) -> Option<&'static str> {
        match self {
            Verb::Read => None,
            Verb::Write | Verb::ReadWrite => Some("value"),
            _ => Some("mask"),
        }
    }

    /// The instruction implementing this accessor in the given operand form.
    pub fn insn(self, form: Form) -> CsrInsn {
        let result = self.returns_value();
        let func = match self {
            Verb::Read => return CsrInsn::Read,
            Verb::Write | Verb::ReadWrite => CsrFunc::Swap,
            Verb::SetBits | Verb::ReadSetBits => CsrFunc::Set,
            Verb::ClrBits | Verb::ReadClrBits => CsrFunc::Clear,
        };
        CsrInsn::Rmw { func, form, result }
    }
}

/// The atomic read-modify-write operation of a CSR instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrFunc {
    /// `csrrw`
    Swap,
    /// `csrrs`
    Set,
    /// `csrrc`
    Clear,
}

/// A CSR instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrInsn {
    /// The `csrr` pseudo instruction.
    Read,
    Rmw {
        func: CsrFunc,
        form: Form,
        /// Whether the old register value is written to a destination register.
        result: bool,
    },
}

impl CsrInsn {
    pub fn mnemonic(&self) -> &'static str {
        match *self {
            CsrInsn::Read => "csrr",
            CsrInsn::Rmw { func, form, .. } => match (func, form) {
                (CsrFunc::Swap, Form::Register) => "csrrw",
                (CsrFunc::Swap, Form::Immediate) => "csrrwi",
                (CsrFunc::Set, Form::Register) => "csrrs",
                (CsrFunc::Set, Form::Immediate) => "csrrsi",
                (CsrFunc::Clear, Form::Register) => "csrrc",
                (CsrFunc::Clear, Form::Immediate) => "csrrci",
            },
        }
    }

    /// Render the assembly text for the CSR `csr`.
    ///
    /// `dst` and `src` are the operand placeholders of the target assembler
    /// syntax. An unused result is discarded into `zero`.
    pub fn asm(&self, csr: &str, dst: &str, src: &str) -> String {
        match *self {
            CsrInsn::Read => format!("{}    {}, {}", self.mnemonic(), dst, csr),
            CsrInsn::Rmw { result, .. } => {
                let dst = if result { dst } else { "zero" };
                format!("{}    {}, {}, {}", self.mnemonic(), dst, csr, src)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics() {
        assert_eq!(Verb::Read.insn(Form::Register).mnemonic(), "csrr");
        assert_eq!(Verb::Write.insn(Form::Register).mnemonic(), "csrrw");
        assert_eq!(Verb::Write.insn(Form::Immediate).mnemonic(), "csrrwi");
        assert_eq!(Verb::SetBits.insn(Form::Immediate).mnemonic(), "csrrsi");
        assert_eq!(Verb::ReadClrBits.insn(Form::Register).mnemonic(), "csrrc");
        assert_eq!(Verb::ClrBits.insn(Form::Immediate).mnemonic(), "csrrci");
    }

    #[test]
    fn unused_result_goes_to_zero() {
        let insn = Verb::Write.insn(Form::Register);
        assert_eq!(insn.asm("mie", "%0", "%1"), "csrrw    zero, mie, %1");

        let insn = Verb::ReadSetBits.insn(Form::Immediate);
        assert_eq!(insn.asm("mie", "%0", "%1"), "csrrsi    %0, mie, %1");

        assert_eq!(Verb::Read.insn(Form::Register).asm("mcause", "%0", ""), "csrr    %0, mcause");
    }

    #[test]
    fn operands() {
        assert_eq!(Verb::Read.operand(), None);
        assert_eq!(Verb::ReadWrite.operand(), Some("value"));
        assert_eq!(Verb::ClrBits.operand(), Some("mask"));
        assert!(Verb::ReadClrBits.returns_value());
        assert!(!Verb::SetBits.returns_value());
    }
}
