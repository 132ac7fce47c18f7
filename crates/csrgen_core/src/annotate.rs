//! Derives every literal, type and permission once, so every backend
//! renders from exactly the same data.

use crate::capability::{Capability, CapabilityViolation, FieldOp, Grant, RegOp};
use crate::imm::Form;
use crate::layout::{FieldLayout, Literals};
use crate::model::{Field, Register, RegisterFile};
use crate::width::{IntWidth, Xlen};

/// A register file with everything the emitters need precomputed.
#[derive(Debug)]
pub struct Annotated<'a> {
    pub file: &'a RegisterFile,
    pub registers: Vec<AnnotatedRegister<'a>>,
}

impl<'a> Annotated<'a> {
    pub fn new(file: &'a RegisterFile) -> Self {
        let xlen = file.xlen();
        let registers = file
            .registers()
            .iter()
            .map(|register| AnnotatedRegister::new(register, xlen))
            .collect();

        Self { file, registers }
    }

    pub fn xlen(&self) -> Xlen {
        self.file.xlen()
    }

    pub fn register(&self, name: &str) -> Option<&AnnotatedRegister<'a>> {
        self.registers.iter().find(|reg| reg.register.name == name)
    }
}

#[derive(Debug)]
pub struct AnnotatedRegister<'a> {
    pub register: &'a Register,
    /// The integer type used to access the register.
    pub native: IntWidth,
    pub grants: Vec<Grant<RegOp>>,
    pub fields: Vec<AnnotatedField<'a>>,
}

impl<'a> AnnotatedRegister<'a> {
    fn new(register: &'a Register, xlen: Xlen) -> Self {
        let native = register.width.resolve(xlen);
        let grants = register
            .capability()
            .register_grants(register.declares_fields());

        log::trace!(
            "annotating `{}` as {} with {} operations",
            register.name,
            register.capability(),
            grants.len()
        );

        let fields = register
            .fields
            .iter()
            .map(|field| AnnotatedField::new(register, field, native, xlen))
            .collect();

        Self {
            register,
            native,
            grants,
            fields,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.register.name
    }

    pub fn capability(&self) -> Capability {
        self.register.capability()
    }

    pub fn permits(&self, op: RegOp) -> bool {
        self.grants.iter().any(|grant| grant.op() == op)
    }

    /// Request permission to emit `op`.
    pub fn grant(&self, op: RegOp) -> Result<Grant<RegOp>, CapabilityViolation> {
        self.capability()
            .grant_register(self.name(), self.register.declares_fields(), op)
    }

    /// Granted operations whose operand is only known at run time.
    pub fn runtime_grants(&self) -> impl Iterator<Item = Grant<RegOp>> + '_ {
        self.grants.iter().copied().filter(|grant| !grant.op().is_const())
    }

    /// Granted operations that take an immediate operand.
    pub fn const_grants(&self) -> impl Iterator<Item = Grant<RegOp>> + '_ {
        self.grants.iter().copied().filter(|grant| grant.op().is_const())
    }
}

#[derive(Debug)]
pub struct AnnotatedField<'a> {
    pub field: &'a Field,
    /// The integer type the field value is handed out as.
    pub native: IntWidth,
    pub literals: Literals,
    /// Instruction form of the generated set and clear accessors.
    pub mask_form: Form,
    pub grants: Vec<Grant<FieldOp>>,
}

impl<'a> AnnotatedField<'a> {
    fn new(register: &Register, field: &'a Field, register_width: IntWidth, xlen: Xlen) -> Self {
        let native = field.element.resolve(xlen);
        let literals = field.layout.literals(register_width, native);
        let mask_form = Form::for_const(field.layout.mask());

        log::trace!(
            "field `{}.{}`: mask {} ({:?} form)",
            register.name,
            field.name,
            literals.bit_mask,
            mask_form
        );

        Self {
            field,
            native,
            literals,
            mask_form,
            grants: field.capability.field_grants(),
        }
    }

    pub fn name(&self) -> &'a str {
        &self.field.name
    }

    pub fn layout(&self) -> FieldLayout {
        self.field.layout
    }

    pub fn permits(&self, op: FieldOp) -> bool {
        self.grants.iter().any(|grant| grant.op() == op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn file(xlen: Xlen) -> RegisterFile {
        let schema = Schema::from_json_str(
            r#"{ "regs": {
                "mie": { "priv": "MRW", "fields": {
                    "msi": { "bits": [3] },
                    "mei": { "bits": [11] }
                } },
                "mcause": { "priv": "MRW" },
                "mhartid": { "priv": "MRO" },
                "mcycle": { "priv": "MRW", "width": 64 }
            } }"#,
        )
        .unwrap();
        RegisterFile::build(&schema, xlen).unwrap()
    }

    #[test]
    fn field_literals_and_form() {
        let file = file(Xlen::Rv64);
        let model = Annotated::new(&file);
        let mie = model.register("mie").unwrap();

        let msi = &mie.fields[0];
        assert_eq!(msi.literals.bit_mask, "0x0000000000000008");
        assert_eq!(msi.literals.all_set_mask, "0x0000000000000001");
        assert_eq!(msi.mask_form, Form::Immediate);

        let mei = &mie.fields[1];
        assert_eq!(mei.literals.bit_mask, "0x0000000000000800");
        assert_eq!(mei.mask_form, Form::Register);
        assert!(mei.permits(FieldOp::Write));
    }

    #[test]
    fn register_without_fields() {
        let file = file(Xlen::Rv64);
        let model = Annotated::new(&file);
        let mcause = model.register("mcause").unwrap();

        let ops: Vec<_> = mcause.grants.iter().map(Grant::op).collect();
        assert_eq!(
            ops,
            [RegOp::Read, RegOp::Write, RegOp::WriteConst, RegOp::ReadWrite, RegOp::ReadWriteConst]
        );
        assert!(mcause.grant(RegOp::SetBits).is_err());
        assert!(mcause.fields.is_empty());
    }

    #[test]
    fn read_only_register() {
        let file = file(Xlen::Rv64);
        let model = Annotated::new(&file);
        let mhartid = model.register("mhartid").unwrap();

        assert!(mhartid.permits(RegOp::Read));
        assert_eq!(mhartid.grants.len(), 1);
        assert_eq!(mhartid.const_grants().count(), 0);
    }

    #[test]
    fn fixed_width_follows_word_size() {
        let rv32 = file(Xlen::Rv32);
        assert_eq!(Annotated::new(&rv32).register("mcycle").unwrap().native, IntWidth::U32);

        let rv64 = file(Xlen::Rv64);
        assert_eq!(Annotated::new(&rv64).register("mcycle").unwrap().native, IntWidth::U64);
    }
}
