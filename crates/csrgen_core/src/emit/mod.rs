//! Backends that render an annotated register file as source text.

mod flat;
mod rust;
mod typed;

pub use flat::FlatEmitter;
pub use rust::RustEmitter;
pub use typed::TypedEmitter;

use crate::annotate::Annotated;
use crate::width::{IntWidth, WidthSpec};
use core::{fmt, str::FromStr};

/// Renders a complete accessor library.
pub trait Emitter {
    fn emit(&self, model: &Annotated<'_>, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// The accessor libraries that can be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// C header with inline functions and macros.
    Flat,
    /// C++ header with capability checked register classes.
    Typed,
    /// Rust crate body with `macro_rules!` accessors.
    Rust,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Flat, Backend::Typed, Backend::Rust];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Flat => "flat",
            Backend::Typed => "typed",
            Backend::Rust => "rust",
        }
    }

    pub fn emitter(self) -> &'static dyn Emitter {
        match self {
            Backend::Flat => &FlatEmitter,
            Backend::Typed => &TypedEmitter,
            Backend::Rust => &RustEmitter,
        }
    }

    /// Render the whole library into a string.
    pub fn render(self, model: &Annotated<'_>) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.emitter().emit(model, &mut out)?;
        Ok(out)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .iter()
            .copied()
            .find(|backend| backend.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown backend `{}`", s))
    }
}

/// C name of the type a register is accessed as.
fn c_register_type(width: WidthSpec) -> &'static str {
    match width {
        WidthSpec::Xlen => "uint_xlen_t",
        WidthSpec::Fixed(IntWidth::U64) => "uint_csr64_t",
        WidthSpec::Fixed(_) => "uint_csr32_t",
    }
}

/// C name of the type a field value is handed out as.
fn c_element_type(width: WidthSpec) -> &'static str {
    match width {
        WidthSpec::Xlen => "uint_xlen_t",
        WidthSpec::Fixed(IntWidth::U8) => "uint8_t",
        WidthSpec::Fixed(IntWidth::U16) => "uint16_t",
        WidthSpec::Fixed(IntWidth::U32) => "uint32_t",
        WidthSpec::Fixed(IntWidth::U64) => "uint64_t",
    }
}

/// Rejects compilation for targets that advertise their extensions but lack Zicsr.
fn zicsr_guard(out: &mut dyn fmt::Write) -> fmt::Result {
    writeln!(out, "#if defined(__riscv_arch_test)")?;
    writeln!(out, "#if !defined(__riscv_zicsr)")?;
    writeln!(out, "#error \"-march must include zicsr to access CSRs\"")?;
    writeln!(out, "#endif")?;
    writeln!(out, "#endif")
}

/// Writes a multi line C macro with aligned line continuations.
fn c_macro(out: &mut dyn fmt::Write, lines: &[String]) -> fmt::Result {
    let width = lines.iter().map(|line| line.len()).max().unwrap_or(0);
    for (idx, line) in lines.iter().enumerate() {
        if idx + 1 == lines.len() {
            writeln!(out, "{}", line)?;
        } else {
            writeln!(out, "{:<width$} \\", line, width = width)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        for backend in Backend::ALL.iter() {
            assert_eq!(backend.name().parse::<Backend>(), Ok(*backend));
        }
        assert_eq!("Typed".parse::<Backend>(), Ok(Backend::Typed));
        assert!("cpp".parse::<Backend>().is_err());
    }

    #[test]
    fn c_types() {
        assert_eq!(c_register_type(WidthSpec::Xlen), "uint_xlen_t");
        assert_eq!(c_register_type(WidthSpec::Fixed(IntWidth::U64)), "uint_csr64_t");
        assert_eq!(c_register_type(WidthSpec::Fixed(IntWidth::U32)), "uint_csr32_t");
        assert_eq!(c_element_type(WidthSpec::Fixed(IntWidth::U8)), "uint8_t");
    }

    #[test]
    fn macro_continuations_are_aligned() {
        let mut out = String::new();
        c_macro(&mut out, &["#define A(x)".to_string(), "    x".to_string()]).unwrap();
        assert_eq!(out, "#define A(x) \\\n    x\n");
    }
}
