use super::{c_element_type, c_register_type, zicsr_guard, Emitter};
use crate::annotate::{Annotated, AnnotatedField, AnnotatedRegister};
use crate::capability::RegOp;
use crate::imm::Form;
use core::fmt;

/// Emits a C++ header where every register is a class that only exposes the
/// operations its capability permits.
pub struct TypedEmitter;

impl Emitter for TypedEmitter {
    fn emit(&self, model: &Annotated<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
        preamble(model, out)?;
        out.write_str(ABSTRACTIONS)?;

        for reg in &model.registers {
            log::debug!("emitting typed accessors for `{}`", reg.name());
            register(model, reg, out)?;
        }

        aggregate(model, out)?;

        writeln!(out)?;
        writeln!(out, "}} // namespace csr")?;
        writeln!(out, "}} // namespace riscv")?;
        writeln!(out)?;
        writeln!(out, "#endif /* RISCV_CSR_HPP */")
    }
}

fn preamble(model: &Annotated<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    let xlen = model.xlen().bits();

    writeln!(out, "/*")?;
    writeln!(out, " * RISC-V CSR access classes for {}.", model.xlen())?;
    writeln!(out, " * Generated by csrgen, do not edit.")?;
    writeln!(out, " */")?;
    writeln!(out)?;
    writeln!(out, "#ifndef RISCV_CSR_HPP")?;
    writeln!(out, "#define RISCV_CSR_HPP")?;
    writeln!(out)?;
    writeln!(out, "#include <cstdint>")?;
    writeln!(out)?;
    writeln!(out, "#if __riscv_xlen != {}", xlen)?;
    writeln!(out, "#error \"this header was generated for __riscv_xlen == {}\"", xlen)?;
    writeln!(out, "#endif")?;
    writeln!(out)?;
    zicsr_guard(out)?;
    writeln!(out)?;
    writeln!(out, "namespace riscv {{")?;
    writeln!(out, "namespace csr {{")?;
    writeln!(out)?;
    writeln!(out, "using uint_xlen_t = std::uint{}_t;", xlen)?;
    writeln!(out, "using uint_csr32_t = std::uint32_t;")?;
    writeln!(out, "using uint_csr64_t = std::uint{}_t;", xlen)?;
    writeln!(out, "using uint8_t = std::uint8_t;")?;
    writeln!(out, "using uint16_t = std::uint16_t;")?;
    writeln!(out, "using uint32_t = std::uint32_t;")?;
    writeln!(out, "using uint64_t = std::uint64_t;")?;
    writeln!(out)?;
    writeln!(out, "/** Mask of the bits an immediate CSR instruction can carry */")?;
    writeln!(out, "static constexpr uint_xlen_t CSR_IMM_OP_MASK = 0x1F;")?;

    let privileges = model.file.privileges();
    if !privileges.is_empty() {
        writeln!(out)?;
        writeln!(out, "/** Privilege and access of a register */")?;
        writeln!(out, "enum class priv_t {{")?;
        for key in privileges {
            writeln!(out, "    {},", key)?;
        }
        writeln!(out, "}};")?;
    }

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

const ABSTRACTIONS: &str = r#"
/** Read access to the register implemented by the ops struct C */
template <class C>
class read_only_reg {
public:
    using datatype = typename C::datatype;

    read_only_reg(void) {}
    read_only_reg(const read_only_reg &) = delete;
    read_only_reg &operator=(const read_only_reg &) = delete;

    /** Read the register */
    static inline datatype read(void) { return C::read(); }

    /** Alias of read() */
    inline datatype operator()(void) { return C::read(); }
};

/** Write access to the register implemented by the ops struct C */
template <class C>
class write_only_reg {
public:
    using datatype = typename C::datatype;

    write_only_reg(void) {}
    write_only_reg(const write_only_reg &) = delete;
    write_only_reg &operator=(const write_only_reg &) = delete;

    /** Write the register */
    static inline void write(datatype value) { C::write(value); }

    /** Write a constant, as an immediate if it fits in 5 bits */
    template <datatype VALUE>
    static inline void write_const(void) {
        if constexpr ((VALUE & CSR_IMM_OP_MASK) == VALUE) {
            C::template write_imm<VALUE>();
        } else {
            C::write(VALUE);
        }
    }

    /** Set the bits of the mask */
    static inline void set(datatype mask) {
        static_assert(C::bit_ops, "register has no fields, bit operations are not available");
        C::set_bits(mask);
    }

    /** Set the bits of a constant mask, as an immediate if it fits in 5 bits */
    template <datatype MASK>
    static inline void set_const(void) {
        static_assert(C::bit_ops, "register has no fields, bit operations are not available");
        if constexpr ((MASK & CSR_IMM_OP_MASK) == MASK) {
            C::template set_bits_imm<MASK>();
        } else {
            C::set_bits(MASK);
        }
    }

    /** Clear the bits of the mask */
    static inline void clr(datatype mask) {
        static_assert(C::bit_ops, "register has no fields, bit operations are not available");
        C::clr_bits(mask);
    }

    /** Clear the bits of a constant mask, as an immediate if it fits in 5 bits */
    template <datatype MASK>
    static inline void clr_const(void) {
        static_assert(C::bit_ops, "register has no fields, bit operations are not available");
        if constexpr ((MASK & CSR_IMM_OP_MASK) == MASK) {
            C::template clr_bits_imm<MASK>();
        } else {
            C::clr_bits(MASK);
        }
    }

    /** Alias of set() */
    inline void operator|=(datatype mask) { set(mask); }
};

/** Read and write access to the register implemented by the ops struct C */
template <class C>
class read_write_reg : public read_only_reg<C>, public write_only_reg<C> {
public:
    using datatype = typename C::datatype;

    /** Write the register and return its previous value */
    static inline datatype read_write(datatype value) { return C::read_write(value); }

    /** Write a constant and return the previous value, as an immediate if it fits in 5 bits */
    template <datatype VALUE>
    static inline datatype read_write_const(void) {
        if constexpr ((VALUE & CSR_IMM_OP_MASK) == VALUE) {
            return C::template read_write_imm<VALUE>();
        } else {
            return C::read_write(VALUE);
        }
    }

    /** Set the bits of the mask and return the previous value */
    static inline datatype read_set_bits(datatype mask) {
        static_assert(C::bit_ops, "register has no fields, bit operations are not available");
        return C::read_set_bits(mask);
    }

    /** Set the bits of a constant mask and return the previous value */
    template <datatype MASK>
    static inline datatype read_set_bits_const(void) {
        static_assert(C::bit_ops, "register has no fields, bit operations are not available");
        if constexpr ((MASK & CSR_IMM_OP_MASK) == MASK) {
            return C::template read_set_bits_imm<MASK>();
        } else {
            return C::read_set_bits(MASK);
        }
    }

    /** Clear the bits of the mask and return the previous value */
    static inline datatype read_clr_bits(datatype mask) {
        static_assert(C::bit_ops, "register has no fields, bit operations are not available");
        return C::read_clr_bits(mask);
    }

    /** Clear the bits of a constant mask and return the previous value */
    template <datatype MASK>
    static inline datatype read_clr_bits_const(void) {
        static_assert(C::bit_ops, "register has no fields, bit operations are not available");
        if constexpr ((MASK & CSR_IMM_OP_MASK) == MASK) {
            return C::template read_clr_bits_imm<MASK>();
        } else {
            return C::read_clr_bits(MASK);
        }
    }
};

/** Read access to the field F of the register implemented by C */
template <class C, class F>
class read_only_field {
public:
    using datatype = typename F::datatype;

    read_only_field(void) {}
    read_only_field(const read_only_field &) = delete;
    read_only_field &operator=(const read_only_field &) = delete;

    /** Read the field */
    static inline datatype read(void) {
        return (datatype)((C::read() & F::BIT_MASK) >> F::BIT_OFFSET);
    }

    /** Alias of read() */
    inline datatype operator()(void) { return read(); }
};

/** Write access to the field F of the register implemented by C */
template <class C, class F>
class write_only_field {
public:
    using datatype = typename F::datatype;

    write_only_field(void) {}
    write_only_field(const write_only_field &) = delete;
    write_only_field &operator=(const write_only_field &) = delete;

    /** Set every bit of the field */
    static inline void set(void) {
        if constexpr (F::BIT_MASK_IMM) {
            C::template set_bits_imm<F::BIT_MASK>();
        } else {
            C::set_bits(F::BIT_MASK);
        }
    }

    /** Clear every bit of the field */
    static inline void clr(void) {
        if constexpr (F::BIT_MASK_IMM) {
            C::template clr_bits_imm<F::BIT_MASK>();
        } else {
            C::clr_bits(F::BIT_MASK);
        }
    }
};

/** Read and write access to the field F of the register implemented by C */
template <class C, class F>
class read_write_field : public read_only_field<C, F>, public write_only_field<C, F> {
public:
    using datatype = typename F::datatype;
    using reg_datatype = typename C::datatype;

    /** Replace the field, read-modify-write, NOT atomic */
    static inline void write(datatype value) {
        reg_datatype reg_value = C::read();
        reg_value = (reg_value & ~F::BIT_MASK) | (((reg_datatype)value << F::BIT_OFFSET) & F::BIT_MASK);
        C::write(reg_value);
    }

    /** Replace the field and return its previous value, read-modify-write, NOT atomic */
    static inline datatype read_write(datatype value) {
        reg_datatype reg_value = C::read();
        reg_datatype prev = reg_value;
        reg_value = (reg_value & ~F::BIT_MASK) | (((reg_datatype)value << F::BIT_OFFSET) & F::BIT_MASK);
        C::write(reg_value);
        return (datatype)((prev & F::BIT_MASK) >> F::BIT_OFFSET);
    }
};
"#;

fn register(model: &Annotated<'_>, reg: &AnnotatedRegister<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    let r = reg.register;
    let name = reg.name();

    writeln!(out)?;
    writeln!(out, "/*******************************************")?;
    writeln!(out, " * {} - {} - {}", name, r.privilege, r.desc)?;
    writeln!(out, " */")?;

    ops(model, reg, out)?;

    if !reg.fields.is_empty() {
        writeln!(out)?;
        writeln!(out, "namespace {}_data {{", name)?;
        for field in &reg.fields {
            data(reg, field, out)?;
        }
        writeln!(out, "}} // namespace {}_data", name)?;
    }

    writeln!(out)?;
    if !r.desc.is_empty() {
        writeln!(out, "/** {} */", r.desc)?;
    }
    writeln!(out, "template <class OPS>")?;
    writeln!(out, "class {}_reg : public {}_reg<OPS> {{", name, r.capability().name())?;
    writeln!(out, "public:")?;
    for field in &reg.fields {
        if !field.field.desc.is_empty() {
            writeln!(out, "    /** {} */", field.field.desc)?;
        }
        writeln!(
            out,
            "    {}_field<OPS, {}_data::{}> {};",
            field.field.capability.name(),
            name,
            field.name(),
            field.name()
        )?;
    }
    for item in &r.excluded_fields {
        writeln!(out, "    /* {} is excluded pending target support: {} */", item.name, item.reason)?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    writeln!(out, "using {} = {}_reg<{}_ops>;", name, name, name)
}

fn ops(model: &Annotated<'_>, reg: &AnnotatedRegister<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    let r = reg.register;
    let name = reg.name();

    writeln!(out)?;
    writeln!(out, "/** Instructions that access {} */", name)?;
    writeln!(out, "struct {}_ops {{", name)?;
    writeln!(out, "    using datatype = {};", c_register_type(r.width))?;

    let privilege = r.privilege.to_string();
    if model.file.privileges().contains(&privilege) {
        writeln!(out, "    static constexpr priv_t priv = priv_t::{};", privilege)?;
    }
    writeln!(out, "    static constexpr bool bit_ops = {};", reg.permits(RegOp::SetBits) || reg.permits(RegOp::ClrBits))?;

    for grant in &reg.grants {
        ops_member(name, grant.op(), out)?;
    }

    writeln!(out, "}};")
}

fn ops_member(name: &str, op: RegOp, out: &mut dyn fmt::Write) -> fmt::Result {
    let verb = op.verb();
    let returns = verb.returns_value();
    let ret = if returns { "datatype" } else { "void" };

    writeln!(out)?;
    writeln!(out, "    /** {} */", verb.summary())?;

    let (insn, input) = if op.is_const() {
        writeln!(out, "    template <std::uint8_t IMM>")?;
        writeln!(out, "    static inline {} {}_imm(void) {{", ret, verb.name())?;
        (verb.insn(Form::Immediate), Some("\"i\"(IMM)".to_string()))
    } else {
        match verb.operand() {
            Some(arg) => {
                writeln!(out, "    static inline {} {}(datatype {}) {{", ret, verb.name(), arg)?;
                (verb.insn(Form::for_runtime()), Some(format!("\"r\"({})", arg)))
            }
            None => {
                writeln!(out, "    static inline {} {}(void) {{", ret, verb.name())?;
                (verb.insn(Form::for_runtime()), None)
            }
        }
    };

    let result = if verb.operand().is_some() { "prev" } else { "value" };
    if returns {
        writeln!(out, "        datatype {};", result)?;
    }
    let asm = if returns {
        insn.asm(name, "%0", "%1")
    } else {
        insn.asm(name, "", "%0")
    };
    writeln!(out, "        __asm__ volatile(\"{}\"", asm)?;
    if returns {
        writeln!(out, "                         : \"=r\"({}) /* output: register */", result)?;
    } else {
        writeln!(out, "                         : /* output: none */")?;
    }
    match input {
        Some(input) => writeln!(out, "                         : {} /* input */", input)?,
        None => writeln!(out, "                         : /* input: none */")?,
    }
    writeln!(out, "                         : /* clobbers: none */);")?;
    if returns {
        writeln!(out, "        return {};", result)?;
    }
    writeln!(out, "    }}")
}

fn data(reg: &AnnotatedRegister<'_>, field: &AnnotatedField<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    let reg_ty = c_register_type(reg.register.width);
    let ty = c_element_type(field.field.element);
    let lits = &field.literals;

    writeln!(out, "/** Parameter data for {}.{} */", reg.name(), field.name())?;
    writeln!(out, "struct {} {{", field.name())?;
    writeln!(out, "    using datatype = {};", ty)?;
    writeln!(out, "    static constexpr {} BIT_OFFSET = {};", reg_ty, lits.bit_offset)?;
    writeln!(out, "    static constexpr {} BIT_WIDTH = {};", reg_ty, lits.bit_width)?;
    writeln!(out, "    static constexpr {} BIT_MASK = {};", reg_ty, lits.bit_mask)?;
    writeln!(out, "    static constexpr {} ALL_SET_MASK = {};", ty, lits.all_set_mask)?;
    writeln!(out, "    static constexpr bool BIT_MASK_IMM = {};", field.mask_form.is_immediate())?;
    writeln!(out, "}};")
}

fn aggregate(model: &Annotated<'_>, out: &mut dyn fmt::Write) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "/** Every CSR of this header. Holds no state, construct it where it is used. */")?;
    writeln!(out, "struct all {{")?;
    for reg in &model.registers {
        writeln!(out, "    riscv::csr::{} {};", reg.name(), reg.name())?;
    }
    writeln!(out, "}};")
}
