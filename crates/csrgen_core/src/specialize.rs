//! Selects the instruction form of a single constant operation while generating.

use crate::annotate::Annotated;
use crate::bitfield::BitField;
use crate::capability::RegOp;
use crate::emit::Backend;
use crate::error::{Error, Result, SchemaError};
use crate::imm::Form;
use core::{fmt, str::FromStr};

/// An operation whose operand is a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstOp {
    Write,
    Set,
    Clr,
    ReadWrite,
    ReadSetBits,
    ReadClrBits,
}

impl ConstOp {
    pub const ALL: [ConstOp; 6] = [
        ConstOp::Write,
        ConstOp::Set,
        ConstOp::Clr,
        ConstOp::ReadWrite,
        ConstOp::ReadSetBits,
        ConstOp::ReadClrBits,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConstOp::Write => "write",
            ConstOp::Set => "set",
            ConstOp::Clr => "clr",
            ConstOp::ReadWrite => "read_write",
            ConstOp::ReadSetBits => "read_set_bits",
            ConstOp::ReadClrBits => "read_clr_bits",
        }
    }

    /// The register operation that has to be granted.
    pub fn reg_op(self) -> RegOp {
        match self {
            ConstOp::Write => RegOp::WriteConst,
            ConstOp::Set => RegOp::SetBitsConst,
            ConstOp::Clr => RegOp::ClrBitsConst,
            ConstOp::ReadWrite => RegOp::ReadWriteConst,
            ConstOp::ReadSetBits => RegOp::ReadSetBitsConst,
            ConstOp::ReadClrBits => RegOp::ReadClrBitsConst,
        }
    }
}

impl fmt::Display for ConstOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConstOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstOp::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("unknown operation `{}`", s))
    }
}

/// The call site for a constant operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specialization {
    pub form: Form,
    pub call: String,
}

/// Render the call that performs `op` with `value` on `register`.
pub fn specialize(
    model: &Annotated<'_>,
    backend: Backend,
    register: &str,
    op: ConstOp,
    value: u128,
) -> Result<Specialization> {
    let reg = model
        .register(register)
        .ok_or_else(|| SchemaError::UnknownRegister {
            name: register.to_string(),
        })?;

    let grant = reg.grant(op.reg_op())?;

    let bits = reg.native.bits();
    if !value.fits_in(bits) {
        return Err(Error::ConstantOutOfRange {
            register: register.to_string(),
            value,
            bits,
        });
    }

    let form = Form::for_const(value);
    let verb = grant.op().verb().name();
    let call = match (backend, form) {
        (Backend::Flat, Form::Immediate) => format!(
            "CSR_{}_IMM_{}({:#x})",
            verb.to_uppercase(),
            register.to_uppercase(),
            value
        ),
        (Backend::Flat, Form::Register) => format!("csr_{}_{}({:#x})", verb, register, value),
        (Backend::Typed, Form::Immediate) => {
            format!("riscv::csr::{}_ops::{}_imm<{:#x}>()", register, verb, value)
        }
        (Backend::Typed, Form::Register) => {
            format!("riscv::csr::{}_ops::{}({:#x})", register, verb, value)
        }
        (Backend::Rust, Form::Immediate) => format!("csr_{}_imm_{}!({:#x})", verb, register, value),
        (Backend::Rust, Form::Register) => format!("csr_{}_{}!({:#x})", verb, register, value),
    };

    log::debug!("specialized {} of `{}` to {:?} form", op, register, form);
    Ok(Specialization { form, call })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegisterFile;
    use crate::schema::Schema;
    use crate::width::Xlen;

    fn file() -> RegisterFile {
        let schema = Schema::from_json_str(
            r#"{ "regs": {
                "mtvec": { "priv": "MRW", "fields": { "mode": { "bits": [1, 0] }, "base": { "bits": ["xlen-1", 2] } } },
                "mhartid": { "priv": "MRO" },
                "mcause": { "priv": "MRW" }
            } }"#,
        )
        .unwrap();
        RegisterFile::build(&schema, Xlen::Rv32).unwrap()
    }

    #[test]
    fn wide_constant_uses_register_form() {
        let file = file();
        let model = Annotated::new(&file);

        let flat = specialize(&model, Backend::Flat, "mtvec", ConstOp::Write, 0x100000).unwrap();
        assert_eq!(flat.form, Form::Register);
        assert_eq!(flat.call, "csr_write_mtvec(0x100000)");

        let typed = specialize(&model, Backend::Typed, "mtvec", ConstOp::Write, 0x100000).unwrap();
        assert_eq!(typed.form, Form::Register);
        assert_eq!(typed.call, "riscv::csr::mtvec_ops::write(0x100000)");
    }

    #[test]
    fn small_constant_uses_immediate_form() {
        let file = file();
        let model = Annotated::new(&file);

        let flat = specialize(&model, Backend::Flat, "mtvec", ConstOp::Set, 31).unwrap();
        assert_eq!(flat.form, Form::Immediate);
        assert_eq!(flat.call, "CSR_SET_BITS_IMM_MTVEC(0x1f)");

        let rust = specialize(&model, Backend::Rust, "mtvec", ConstOp::ReadClrBits, 0).unwrap();
        assert_eq!(rust.call, "csr_read_clr_bits_imm_mtvec!(0x0)");

        let typed = specialize(&model, Backend::Typed, "mcause", ConstOp::ReadWrite, 32).unwrap();
        assert_eq!(typed.form, Form::Register);
        assert_eq!(typed.call, "riscv::csr::mcause_ops::read_write(0x20)");
    }

    #[test]
    fn forbidden_operations() {
        let file = file();
        let model = Annotated::new(&file);

        match specialize(&model, Backend::Flat, "mhartid", ConstOp::Write, 1) {
            Err(Error::CapabilityViolation(err)) => {
                assert_eq!(err.target, "mhartid");
                assert_eq!(err.operation, "write_const");
            }
            other => panic!("expected a capability violation, got {:?}", other),
        }

        assert!(matches!(
            specialize(&model, Backend::Flat, "mcause", ConstOp::Set, 1),
            Err(Error::CapabilityViolation(_))
        ));
    }

    #[test]
    fn unknown_register_and_oversized_value() {
        let file = file();
        let model = Annotated::new(&file);

        assert!(matches!(
            specialize(&model, Backend::Rust, "mfoo", ConstOp::Write, 1),
            Err(Error::Schema(SchemaError::UnknownRegister { .. }))
        ));
        assert!(matches!(
            specialize(&model, Backend::Rust, "mcause", ConstOp::Write, 1 << 32),
            Err(Error::ConstantOutOfRange { bits: 32, .. })
        ));
    }

    #[test]
    fn op_names() {
        for op in ConstOp::ALL.iter() {
            assert_eq!(op.name().parse::<ConstOp>(), Ok(*op));
        }
        assert!("read".parse::<ConstOp>().is_err());
    }
}
