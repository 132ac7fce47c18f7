use super::Emitter;
use crate::annotate::{Annotated, AnnotatedField, AnnotatedRegister};
use crate::capability::{FieldOp, RegOp};
use crate::imm::Form;
use crate::insn::Verb;
use crate::width::{IntWidth, WidthSpec};
use core::fmt;

/// Emits the body of a `no_std` crate with one exported macro per register
/// operation.
pub struct RustEmitter;

impl Emitter for RustEmitter {
    fn emit(&self, model: &Annotated<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
        preamble(model, out)?;

        for reg in &model.registers {
            log::debug!("emitting rust accessors for `{}`", reg.name());
            register(reg, out)?;
        }

        Ok(())
    }
}

fn register_type(width: WidthSpec) -> &'static str {
    match width {
        WidthSpec::Xlen => "UintXlen",
        WidthSpec::Fixed(IntWidth::U64) => "UintCsr64",
        WidthSpec::Fixed(_) => "UintCsr32",
    }
}

fn element_type(width: WidthSpec) -> &'static str {
    match width {
        WidthSpec::Xlen => "UintXlen",
        WidthSpec::Fixed(IntWidth::U8) => "u8",
        WidthSpec::Fixed(IntWidth::U16) => "u16",
        WidthSpec::Fixed(IntWidth::U32) => "u32",
        WidthSpec::Fixed(IntWidth::U64) => "u64",
    }
}

/// Path of a type or constant of the generated crate as seen from inside a macro.
fn krate(item: &str) -> String {
    if matches!(item, "u8" | "u16" | "u32" | "u64") {
        item.to_string()
    } else {
        format!("$crate::{}", item)
    }
}

fn preamble(model: &Annotated<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    let xlen = model.xlen().bits();

    writeln!(out, "//! RISC-V CSR access macros for {}.", model.xlen())?;
    writeln!(out, "//! Generated by csrgen, do not edit.")?;
    writeln!(out)?;
    writeln!(out, "#![no_std]")?;
    writeln!(out)?;
    writeln!(out, "#[cfg(not(target_pointer_width = \"{}\"))]", xlen)?;
    writeln!(
        out,
        "compile_error!(\"these accessors were generated for {}-bit targets\");",
        xlen
    )?;
    writeln!(out)?;
    writeln!(out, "pub type UintXlen = u{};", xlen)?;
    writeln!(out, "pub type UintCsr32 = u32;")?;
    writeln!(out, "pub type UintCsr64 = u{};", xlen)?;

    let excluded = model.file.excluded();
    if !excluded.is_empty() {
        writeln!(out)?;
        writeln!(out, "// Excluded pending target support:")?;
        for item in excluded {
            writeln!(out, "//   {}: {}", item.name, item.reason)?;
        }
    }

    Ok(())
}

fn register(reg: &AnnotatedRegister<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    let r = reg.register;
    let ty = krate(register_type(r.width));

    writeln!(out)?;
    writeln!(out, "// {} - {} - {}", r.name, r.privilege, r.desc)?;

    for grant in &reg.grants {
        let op = grant.op();
        if op.is_const() {
            imm_macro(reg, op, &ty, out)?;
        } else {
            function_macro(reg.name(), op.verb(), &ty, out)?;
        }
    }

    for item in &r.excluded_fields {
        writeln!(out)?;
        writeln!(
            out,
            "// {}.{} is excluded pending target support: {}",
            r.name, item.name, item.reason
        )?;
    }

    for field in &reg.fields {
        constants(reg, field, out)?;
        field_macros(reg, field, out)?;
    }

    Ok(())
}

fn function_macro(name: &str, verb: Verb, ty: &str, out: &mut dyn fmt::Write) -> fmt::Result {
    let insn = verb.insn(Form::for_runtime());

    writeln!(out)?;
    writeln!(out, "/// `{}`: {}", name, verb.summary())?;
    writeln!(out, "#[macro_export]")?;
    writeln!(out, "macro_rules! csr_{}_{} {{", verb.name(), name)?;

    match verb.operand() {
        None => {
            writeln!(out, "    () => {{{{")?;
            writeln!(out, "        let value: {};", ty)?;
            writeln!(out, "        unsafe {{")?;
            writeln!(
                out,
                "            ::core::arch::asm!(\"{}\", out(reg) value, options(nostack));",
                insn.asm(name, "{0}", "")
            )?;
            writeln!(out, "        }}")?;
            writeln!(out, "        value")?;
        }
        Some(arg) => {
            writeln!(out, "    (${}:expr) => {{{{", arg)?;
            writeln!(out, "        let {}: {} = ${};", arg, ty, arg)?;
            if verb.returns_value() {
                writeln!(out, "        let prev: {};", ty)?;
                writeln!(out, "        unsafe {{")?;
                writeln!(
                    out,
                    "            ::core::arch::asm!(\"{}\", out(reg) prev, in(reg) {}, options(nostack));",
                    insn.asm(name, "{0}", "{1}"),
                    arg
                )?;
                writeln!(out, "        }}")?;
                writeln!(out, "        prev")?;
            } else {
                writeln!(out, "        unsafe {{")?;
                writeln!(
                    out,
                    "            ::core::arch::asm!(\"{}\", in(reg) {}, options(nostack));",
                    insn.asm(name, "", "{0}"),
                    arg
                )?;
                writeln!(out, "        }}")?;
            }
        }
    }

    writeln!(out, "    }}}};")?;
    writeln!(out, "}}")
}

fn imm_macro(reg: &AnnotatedRegister<'_>, op: RegOp, ty: &str, out: &mut dyn fmt::Write) -> fmt::Result {
    let name = reg.name();
    let verb = op.verb();
    let insn = verb.insn(Form::Immediate);
    let macro_name = format!("csr_{}_imm_{}", verb.name(), name);

    writeln!(out)?;
    writeln!(
        out,
        "/// `{}`: {} using an immediate value (only up to 5 bits)",
        name,
        verb.summary()
    )?;
    writeln!(out, "#[macro_export]")?;
    writeln!(out, "macro_rules! {} {{", macro_name)?;

    if matches!(op, RegOp::SetBitsConst | RegOp::ClrBitsConst) {
        for field in reg.fields.iter().filter(|field| field.mask_form.is_immediate()) {
            writeln!(out, "    ({}) => {{", constant_name(reg, field, "BIT_MASK"))?;
            writeln!(out, "        $crate::{}!({})", macro_name, field.literals.bit_mask)?;
            writeln!(out, "    }};")?;
        }
    }

    writeln!(out, "    ($value:literal) => {{{{")?;
    if verb.returns_value() {
        let asm = insn.asm(name, "{0}", "");
        writeln!(out, "        let prev: {};", ty)?;
        writeln!(out, "        unsafe {{")?;
        writeln!(
            out,
            "            ::core::arch::asm!(concat!(\"{}\", stringify!($value)), out(reg) prev, options(nostack));",
            asm
        )?;
        writeln!(out, "        }}")?;
        writeln!(out, "        prev")?;
    } else {
        let asm = insn.asm(name, "", "");
        writeln!(out, "        unsafe {{")?;
        writeln!(
            out,
            "            ::core::arch::asm!(concat!(\"{}\", stringify!($value)), options(nostack));",
            asm
        )?;
        writeln!(out, "        }}")?;
    }
    writeln!(out, "    }}}};")?;
    writeln!(out, "}}")
}

fn constant_name(reg: &AnnotatedRegister<'_>, field: &AnnotatedField<'_>, suffix: &str) -> String {
    format!("{}_{}_{}", reg.name(), field.name(), suffix).to_uppercase()
}

fn constants(
    reg: &AnnotatedRegister<'_>,
    field: &AnnotatedField<'_>,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    let lits = &field.literals;
    let reg_ty = register_type(reg.register.width);
    let ty = element_type(field.field.element);

    writeln!(out)?;
    if field.field.desc.is_empty() {
        writeln!(out, "/// `{}.{}`", reg.name(), field.name())?;
    } else {
        writeln!(out, "/// `{}.{}`: {}", reg.name(), field.name(), field.field.desc)?;
    }

    let rows = [
        ("BIT_OFFSET", "u32", &lits.bit_offset),
        ("BIT_WIDTH", "u32", &lits.bit_width),
        ("BIT_MASK", reg_ty, &lits.bit_mask),
        ("ALL_SET_MASK", ty, &lits.all_set_mask),
    ];
    for (suffix, ty, value) in rows.iter() {
        writeln!(
            out,
            "pub const {}: {} = {};",
            constant_name(reg, field, suffix),
            ty,
            value
        )?;
    }

    Ok(())
}

fn field_macros(
    reg: &AnnotatedRegister<'_>,
    field: &AnnotatedField<'_>,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    let reg_name = reg.name();
    let name = field.name();
    let reg_ty = krate(register_type(reg.register.width));
    let ty = krate(element_type(field.field.element));
    let mask = krate(&constant_name(reg, field, "BIT_MASK"));
    let offset = krate(&constant_name(reg, field, "BIT_OFFSET"));

    for grant in &field.grants {
        let op = grant.op();

        writeln!(out)?;
        match op {
            FieldOp::Read => {
                writeln!(out, "/// `{}.{}`: read the field", reg_name, name)?;
                writeln!(out, "#[macro_export]")?;
                writeln!(out, "macro_rules! csr_read_{}_{} {{", reg_name, name)?;
                writeln!(out, "    () => {{")?;
                writeln!(
                    out,
                    "        (($crate::csr_read_{}!() & {}) >> {}) as {}",
                    reg_name, mask, offset, ty
                )?;
                writeln!(out, "    }};")?;
            }
            FieldOp::Set | FieldOp::Clr => {
                let verb = op.name();
                writeln!(
                    out,
                    "/// `{}.{}`: {} every bit of the field",
                    reg_name,
                    name,
                    if op == FieldOp::Set { "set" } else { "clear" }
                )?;
                writeln!(out, "#[macro_export]")?;
                writeln!(out, "macro_rules! csr_{}_{}_{} {{", verb, reg_name, name)?;
                writeln!(out, "    () => {{")?;
                match field.mask_form {
                    Form::Immediate => writeln!(
                        out,
                        "        $crate::csr_{}_bits_imm_{}!({})",
                        verb,
                        reg_name,
                        constant_name(reg, field, "BIT_MASK")
                    )?,
                    Form::Register => writeln!(
                        out,
                        "        $crate::csr_{}_bits_{}!({})",
                        verb, reg_name, mask
                    )?,
                }
                writeln!(out, "    }};")?;
            }
            FieldOp::Write | FieldOp::ReadWrite => {
                let returns = op == FieldOp::ReadWrite;
                writeln!(
                    out,
                    "/// `{}.{}`: replace the field{}, read-modify-write, NOT atomic",
                    reg_name,
                    name,
                    if returns { " and return its previous value" } else { "" }
                )?;
                writeln!(out, "#[macro_export]")?;
                writeln!(out, "macro_rules! csr_{}_{}_{} {{", op.name(), reg_name, name)?;
                writeln!(out, "    ($value:expr) => {{{{")?;
                writeln!(out, "        let value: {} = $value;", ty)?;
                writeln!(out, "        let prev: {} = $crate::csr_read_{}!();", reg_ty, reg_name)?;
                writeln!(
                    out,
                    "        $crate::csr_write_{}!((prev & !{}) | (((value as {}) << {}) & {}));",
                    reg_name, mask, reg_ty, offset, mask
                )?;
                if returns {
                    writeln!(out, "        ((prev & {}) >> {}) as {}", mask, offset, ty)?;
                }
                writeln!(out, "    }}}};")?;
            }
        }
        writeln!(out, "}}")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegisterFile;
    use crate::schema::Schema;
    use crate::width::Xlen;

    fn render(json: &str, xlen: Xlen) -> String {
        let schema = Schema::from_json_str(json).unwrap();
        let file = RegisterFile::build(&schema, xlen).unwrap();
        let mut out = String::new();
        RustEmitter.emit(&Annotated::new(&file), &mut out).unwrap();
        out
    }

    #[test]
    fn preamble_guards_word_size() {
        let out = render(r#"{ "regs": {} }"#, Xlen::Rv32);
        assert!(out.contains("#![no_std]"));
        assert!(out.contains("#[cfg(not(target_pointer_width = \"32\"))]"));
        assert!(out.contains("pub type UintXlen = u32;"));
        assert!(out.contains("pub type UintCsr64 = u32;"));
    }

    #[test]
    fn register_macros() {
        let out = render(r#"{ "regs": { "mscratch": { "priv": "MRW" } } }"#, Xlen::Rv64);

        assert!(out.contains("macro_rules! csr_read_mscratch {"));
        assert!(out.contains("::core::arch::asm!(\"csrr    {0}, mscratch\", out(reg) value, options(nostack));"));
        assert!(out.contains("::core::arch::asm!(\"csrrw    zero, mscratch, {0}\", in(reg) value, options(nostack));"));
        assert!(out.contains("macro_rules! csr_write_imm_mscratch {"));
        assert!(out.contains("::core::arch::asm!(concat!(\"csrrwi    zero, mscratch, \", stringify!($value)), options(nostack));"));
        assert!(out.contains("macro_rules! csr_read_write_imm_mscratch {"));
        assert!(!out.contains("set_bits"));
    }

    #[test]
    fn eligible_fields_get_macro_arms() {
        let out = render(
            r#"{ "regs": { "mie": { "priv": "MRW", "fields": {
                "msi": { "offset": 3, "width": 1 },
                "mei": { "offset": 11, "width": 1 }
            } } } }"#,
            Xlen::Rv64,
        );

        assert!(out.contains(
            "macro_rules! csr_set_bits_imm_mie {\n    (MIE_MSI_BIT_MASK) => {\n        $crate::csr_set_bits_imm_mie!(0x0000000000000008)\n    };\n    ($value:literal) => {{"
        ));
        assert!(!out.contains("(MIE_MEI_BIT_MASK) =>"));

        assert!(out.contains("pub const MIE_MSI_BIT_OFFSET: u32 = 3;"));
        assert!(out.contains("pub const MIE_MSI_BIT_MASK: UintXlen = 0x0000000000000008;"));
        assert!(out.contains("pub const MIE_MSI_ALL_SET_MASK: UintXlen = 0x0000000000000001;"));

        assert!(out.contains("        $crate::csr_set_bits_imm_mie!(MIE_MSI_BIT_MASK)\n"));
        assert!(out.contains("        $crate::csr_clr_bits_mie!($crate::MIE_MEI_BIT_MASK)\n"));
        assert!(out.contains("macro_rules! csr_write_mie_msi {"));
    }

    #[test]
    fn element_type_for_constants() {
        let out = render(
            r#"{ "regs": { "mstatus": { "priv": "MRW", "fields": {
                "mpp": { "bits": [12, 11], "element_width": 8 }
            } } } }"#,
            Xlen::Rv32,
        );

        assert!(out.contains("pub const MSTATUS_MPP_BIT_MASK: UintXlen = 0x00001800;"));
        assert!(out.contains("pub const MSTATUS_MPP_ALL_SET_MASK: u8 = 0x03;"));
        assert!(out.contains("let value: u8 = $value;"));
    }
}
