//! Generator for RISC-V CSR access libraries.
//!
//! A [`Schema`] describes every register and its fields once. It is checked
//! into a [`RegisterFile`] for a specific machine word size, annotated with
//! every derived literal and permission, and finally rendered by one of the
//! [`Backend`]s.
#![deny(rust_2018_idioms)]

pub mod annotate;
pub mod bitfield;
pub mod capability;
pub mod emit;
pub mod error;
pub mod imm;
pub mod insn;
pub mod layout;
pub mod model;
pub mod schema;
pub mod specialize;
pub mod width;

pub use annotate::Annotated;
pub use capability::{Capability, CapabilityViolation};
pub use emit::Backend;
pub use error::{Error, Result, SchemaError};
pub use model::RegisterFile;
pub use schema::Schema;
pub use specialize::{specialize, ConstOp, Specialization};
pub use width::Xlen;

use std::convert::TryFrom;

/// Parameters of a single generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenParams {
    pub xlen: Xlen,
    pub backend: Backend,
}

impl GenParams {
    /// Fails with [`Error::UnsupportedWidth`] unless `xlen` is 32 or 64.
    pub fn new(xlen: u32, backend: Backend) -> Result<Self> {
        Ok(Self {
            xlen: Xlen::try_from(xlen)?,
            backend,
        })
    }
}

/// Render the complete accessor library for `schema`.
///
/// Nothing is returned unless the whole library was rendered.
pub fn generate(schema: &Schema, params: &GenParams) -> Result<String> {
    let file = RegisterFile::build(schema, params.xlen)?;
    let model = Annotated::new(&file);

    log::info!(
        "generating {} accessors for {} registers ({})",
        params.backend,
        model.registers.len(),
        params.xlen
    );

    Ok(params.backend.render(&model)?)
}
