use super::{c_element_type, c_macro, c_register_type, zicsr_guard, Emitter};
use crate::annotate::{Annotated, AnnotatedField, AnnotatedRegister};
use crate::capability::FieldOp;
use crate::imm::Form;
use crate::insn::Verb;
use core::fmt;

/// Emits a C header with one inline function per register operation and
/// one macro per immediate operation.
pub struct FlatEmitter;

impl Emitter for FlatEmitter {
    fn emit(&self, model: &Annotated<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
        preamble(model, out)?;

        for reg in &model.registers {
            log::debug!("emitting flat accessors for `{}`", reg.name());
            register(reg, out)?;
        }

        writeln!(out)?;
        writeln!(out, "#endif /* RISCV_CSR_H */")
    }
}

fn preamble(model: &Annotated<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    let xlen = model.xlen().bits();

    writeln!(out, "/*")?;
    writeln!(out, " * RISC-V CSR access functions for {}.", model.xlen())?;
    writeln!(out, " * Generated by csrgen, do not edit.")?;
    writeln!(out, " */")?;
    writeln!(out)?;
    writeln!(out, "#ifndef RISCV_CSR_H")?;
    writeln!(out, "#define RISCV_CSR_H")?;
    writeln!(out)?;
    writeln!(out, "#include <stdint.h>")?;
    writeln!(out)?;
    writeln!(out, "#if __riscv_xlen != {}", xlen)?;
    writeln!(out, "#error \"this header was generated for __riscv_xlen == {}\"", xlen)?;
    writeln!(out, "#endif")?;
    writeln!(out)?;
    zicsr_guard(out)?;
    writeln!(out)?;
    writeln!(out, "typedef uint{}_t uint_xlen_t;", xlen)?;
    writeln!(out, "typedef uint32_t uint_csr32_t;")?;
    writeln!(out, "typedef uint{}_t uint_csr64_t;", xlen)?;

    let excluded = model.file.excluded();
    if !excluded.is_empty() {
        writeln!(out)?;
        writeln!(out, "/* Excluded pending target support:")?;
        for item in excluded {
            writeln!(out, " *   {}: {}", item.name, item.reason)?;
        }
        writeln!(out, " */")?;
    }

    Ok(())
}

fn register(reg: &AnnotatedRegister<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    let r = reg.register;
    let ty = c_register_type(r.width);

    writeln!(out)?;
    writeln!(out, "/*******************************************")?;
    writeln!(out, " * {} - {} - {}", r.name, r.privilege, r.desc)?;
    writeln!(out, " */")?;

    for grant in reg.runtime_grants() {
        function(reg.name(), grant.op().verb(), ty, out)?;
    }

    for grant in reg.const_grants() {
        imm_macro(reg.name(), grant.op().verb(), ty, out)?;
    }

    for item in &r.excluded_fields {
        writeln!(out)?;
        writeln!(
            out,
            "/* {}.{} is excluded pending target support: {} */",
            r.name, item.name, item.reason
        )?;
    }

    for field in &reg.fields {
        constants(reg, field, out)?;
        field_accessors(reg, field, out)?;
    }

    Ok(())
}

fn function(name: &str, verb: Verb, ty: &str, out: &mut dyn fmt::Write) -> fmt::Result {
    let insn = verb.insn(Form::for_runtime());

    writeln!(out)?;
    writeln!(out, "/** {}: {} */", name, verb.summary())?;

    match verb.operand() {
        None => {
            writeln!(out, "static inline {} csr_{}_{}(void) {{", ty, verb.name(), name)?;
            writeln!(out, "    {} value;", ty)?;
            writeln!(out, "    __asm__ volatile (\"{}\"", insn.asm(name, "%0", ""))?;
            writeln!(out, "                      : \"=r\" (value)  /* output : register */")?;
            writeln!(out, "                      : /* input : none */")?;
            writeln!(out, "                      : /* clobbers: none */);")?;
            writeln!(out, "    return value;")?;
        }
        Some(arg) if verb.returns_value() => {
            writeln!(
                out,
                "static inline {} csr_{}_{}({} {}) {{",
                ty,
                verb.name(),
                name,
                ty,
                arg
            )?;
            writeln!(out, "    {} prev;", ty)?;
            writeln!(out, "    __asm__ volatile (\"{}\"", insn.asm(name, "%0", "%1"))?;
            writeln!(out, "                      : \"=r\" (prev)  /* output: register %0 */")?;
            writeln!(out, "                      : \"r\" ({})  /* input : register %1 */", arg)?;
            writeln!(out, "                      : /* clobbers: none */);")?;
            writeln!(out, "    return prev;")?;
        }
        Some(arg) => {
            writeln!(
                out,
                "static inline void csr_{}_{}({} {}) {{",
                verb.name(),
                name,
                ty,
                arg
            )?;
            writeln!(out, "    __asm__ volatile (\"{}\"", insn.asm(name, "", "%0"))?;
            writeln!(out, "                      : /* output: none */")?;
            writeln!(out, "                      : \"r\" ({})  /* input : register */", arg)?;
            writeln!(out, "                      : /* clobbers: none */);")?;
        }
    }

    writeln!(out, "}}")
}

fn imm_macro(name: &str, verb: Verb, ty: &str, out: &mut dyn fmt::Write) -> fmt::Result {
    let insn = verb.insn(Form::Immediate);
    let head = format!(
        "#define CSR_{}_IMM_{}(VALUE)",
        verb.name().to_uppercase(),
        name.to_uppercase()
    );

    writeln!(out)?;
    writeln!(
        out,
        "/** {}: {} using an immediate value (only up to 5 bits) */",
        name,
        verb.summary()
    )?;

    let lines = if verb.returns_value() {
        vec![
            format!("{} __extension__({{", head),
            format!("    {} prev_;", ty),
            format!("    __asm__ volatile (\"{}\"", insn.asm(name, "%0", "%1")),
            "                      : \"=r\" (prev_)  /* output: register %0 */".to_string(),
            "                      : \"i\" (VALUE)  /* input : immediate %1 */".to_string(),
            "                      : /* clobbers: none */);".to_string(),
            "    prev_;".to_string(),
            "})".to_string(),
        ]
    } else {
        vec![
            head,
            format!("    __asm__ volatile (\"{}\"", insn.asm(name, "", "%0")),
            "                      : /* output: none */".to_string(),
            "                      : \"i\" (VALUE)  /* input : immediate */".to_string(),
            "                      : /* clobbers: none */)".to_string(),
        ]
    };

    c_macro(out, &lines)
}

fn constant_prefix(reg: &AnnotatedRegister<'_>, field: &AnnotatedField<'_>) -> String {
    format!("{}_{}", reg.name(), field.name()).to_uppercase()
}

fn constants(
    reg: &AnnotatedRegister<'_>,
    field: &AnnotatedField<'_>,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    let prefix = constant_prefix(reg, field);
    let lits = &field.literals;

    writeln!(out)?;
    if field.field.desc.is_empty() {
        writeln!(out, "/* {}.{} */", reg.name(), field.name())?;
    } else {
        writeln!(out, "/* {}.{} - {} */", reg.name(), field.name(), field.field.desc)?;
    }

    let rows = [
        ("BIT_OFFSET", &lits.bit_offset),
        ("BIT_WIDTH", &lits.bit_width),
        ("BIT_MASK", &lits.bit_mask),
        ("ALL_SET_MASK", &lits.all_set_mask),
    ];
    for (suffix, value) in rows.iter() {
        writeln!(out, "#define {}_{:<12} {}", prefix, suffix, value)?;
    }

    Ok(())
}

fn field_accessors(
    reg: &AnnotatedRegister<'_>,
    field: &AnnotatedField<'_>,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    let reg_name = reg.name();
    let name = field.name();
    let prefix = constant_prefix(reg, field);
    let reg_ty = c_register_type(reg.register.width);
    let ty = c_element_type(field.field.element);

    for grant in &field.grants {
        writeln!(out)?;

        match grant.op() {
            FieldOp::Read => {
                writeln!(out, "/** {}.{}: read the field */", reg_name, name)?;
                writeln!(out, "static inline {} csr_read_{}_{}(void) {{", ty, reg_name, name)?;
                writeln!(
                    out,
                    "    return ({})((csr_read_{}() & {}_BIT_MASK) >> {}_BIT_OFFSET);",
                    ty, reg_name, prefix, prefix
                )?;
            }
            op @ FieldOp::Set | op @ FieldOp::Clr => {
                let (verb, action) = if op == FieldOp::Set {
                    ("set", "set")
                } else {
                    ("clr", "clear")
                };
                writeln!(
                    out,
                    "/** {}.{}: {} every bit of the field ({} form) */",
                    reg_name,
                    name,
                    action,
                    if field.mask_form.is_immediate() { "immediate" } else { "register" }
                )?;
                writeln!(out, "static inline void csr_{}_{}_{}(void) {{", verb, reg_name, name)?;
                match field.mask_form {
                    Form::Immediate => writeln!(
                        out,
                        "    CSR_{}_BITS_IMM_{}({}_BIT_MASK);",
                        verb.to_uppercase(),
                        reg_name.to_uppercase(),
                        prefix
                    )?,
                    Form::Register => writeln!(
                        out,
                        "    csr_{}_bits_{}({}_BIT_MASK);",
                        verb, reg_name, prefix
                    )?,
                }
            }
            FieldOp::Write => {
                writeln!(out, "/** {}.{}: replace the field, read-modify-write, NOT atomic */", reg_name, name)?;
                writeln!(out, "static inline void csr_write_{}_{}({} value) {{", reg_name, name, ty)?;
                writeln!(out, "    {} reg_value = csr_read_{}();", reg_ty, reg_name)?;
                rmw(out, reg_ty, &prefix)?;
                writeln!(out, "    csr_write_{}(reg_value);", reg_name)?;
            }
            FieldOp::ReadWrite => {
                writeln!(
                    out,
                    "/** {}.{}: replace the field and return its previous value, read-modify-write, NOT atomic */",
                    reg_name, name
                )?;
                writeln!(out, "static inline {} csr_read_write_{}_{}({} value) {{", ty, reg_name, name, ty)?;
                writeln!(out, "    {} reg_value = csr_read_{}();", reg_ty, reg_name)?;
                writeln!(out, "    {} prev = reg_value;", reg_ty)?;
                rmw(out, reg_ty, &prefix)?;
                writeln!(out, "    csr_write_{}(reg_value);", reg_name)?;
                writeln!(
                    out,
                    "    return ({})((prev & {}_BIT_MASK) >> {}_BIT_OFFSET);",
                    ty, prefix, prefix
                )?;
            }
        }

        writeln!(out, "}}")?;
    }

    Ok(())
}

fn rmw(out: &mut dyn fmt::Write, reg_ty: &str, prefix: &str) -> fmt::Result {
    writeln!(out, "    reg_value = (reg_value & ~({}){}_BIT_MASK)", reg_ty, prefix)?;
    writeln!(
        out,
        "              | ((({}) value << {}_BIT_OFFSET) & {}_BIT_MASK);",
        reg_ty, prefix, prefix
    )
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
        FlatEmitter.emit(&Annotated::new(&file), &mut out).unwrap();
        out
    }

    #[test]
    fn preamble_guards_target() {
        let out = render(r#"{ "regs": {} }"#, Xlen::Rv32);
        let xlen = out.find("#error \"this header was generated for __riscv_xlen == 32\"").unwrap();
        let zicsr = out.find(concat!(
            "#if defined(__riscv_arch_test)\n",
            "#if !defined(__riscv_zicsr)\n",
            "#error \"-march must include zicsr to access CSRs\"\n",
            "#endif\n",
            "#endif\n",
        )).unwrap();
        assert!(xlen < zicsr);
        assert!(zicsr < out.find("typedef uint32_t uint_xlen_t;").unwrap());
    }

    #[test]
    fn register_without_fields() {
        let out = render(r#"{ "regs": { "mcause": { "priv": "MRW" } } }"#, Xlen::Rv64);

        assert!(out.contains("static inline uint_xlen_t csr_read_mcause(void) {"));
        assert!(out.contains("static inline void csr_write_mcause(uint_xlen_t value) {"));
        assert!(out.contains("static inline uint_xlen_t csr_read_write_mcause(uint_xlen_t value) {"));
        assert!(out.contains("#define CSR_WRITE_IMM_MCAUSE(VALUE)"));
        assert!(out.contains("#define CSR_READ_WRITE_IMM_MCAUSE(VALUE) __extension__({"));
        assert!(!out.contains("set_bits"));
        assert!(!out.contains("SET_BITS"));
    }

    #[test]
    fn write_function_discards_result() {
        let out = render(r#"{ "regs": { "mscratch": { "priv": "MRW" } } }"#, Xlen::Rv32);
        assert!(out.contains("\"csrrw    zero, mscratch, %0\""));
        assert!(out.contains("\"csrr    %0, mscratch\""));
        assert!(out.contains("\"csrrwi    zero, mscratch, %0\""));
        assert!(out.contains("#if __riscv_xlen != 32"));
        assert!(out.contains("typedef uint32_t uint_xlen_t;"));
    }

    #[test]
    fn field_constants_and_frozen_entry_points() {
        let out = render(
            r#"{ "regs": { "mie": { "priv": "MRW", "fields": {
                "msi": { "offset": 3, "width": 1 },
                "mei": { "offset": 11, "width": 1 }
            } } } }"#,
            Xlen::Rv64,
        );

        assert!(out.contains("#define MIE_MSI_BIT_OFFSET   3\n"));
        assert!(out.contains("#define MIE_MSI_BIT_WIDTH    1\n"));
        assert!(out.contains("#define MIE_MSI_BIT_MASK     0x0000000000000008\n"));
        assert!(out.contains("#define MIE_MSI_ALL_SET_MASK 0x0000000000000001\n"));

        assert!(out.contains("static inline void csr_set_mie_msi(void) {\n    CSR_SET_BITS_IMM_MIE(MIE_MSI_BIT_MASK);"));
        assert!(out.contains("static inline void csr_clr_mie_msi(void) {\n    CSR_CLR_BITS_IMM_MIE(MIE_MSI_BIT_MASK);"));
        assert!(out.contains("static inline void csr_set_mie_mei(void) {\n    csr_set_bits_mie(MIE_MEI_BIT_MASK);"));
        assert!(out.contains("static inline void csr_write_mie_msi(uint_xlen_t value) {"));
        assert!(out.contains("NOT atomic"));
    }

    #[test]
    fn read_only_register_has_no_writers() {
        let out = render(
            r#"{ "regs": { "mhartid": { "priv": "MRO", "fields": { "id": { "bits": [7, 0] } } } } }"#,
            Xlen::Rv64,
        );

        assert!(out.contains("csr_read_mhartid(void)"));
        assert!(out.contains("csr_read_mhartid_id(void)"));
        assert!(!out.contains("csr_write"));
        assert!(!out.contains("csr_set"));
        assert!(!out.contains("csr_clr"));
        assert!(!out.contains("_IMM_"));
    }

    #[test]
    fn excluded_items_are_only_mentioned() {
        let out = render(
            r#"{ "regs": {
                "mcountinhibit": { "priv": "MRW", "excluded": "needs assembler support" },
                "mie": { "priv": "MRW", "fields": { "lcofi": { "excluded": "pending" } } }
            } }"#,
            Xlen::Rv64,
        );

        assert!(out.contains(" *   mcountinhibit: needs assembler support"));
        assert!(out.contains("/* mie.lcofi is excluded pending target support: pending */"));
        assert!(!out.contains("csr_read_mcountinhibit"));
        assert!(!out.contains("MIE_LCOFI"));
    }
}
