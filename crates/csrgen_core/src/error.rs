//! Errors that abort a generation run.

use crate::capability::CapabilityViolation;
use core::fmt;
use displaydoc_lite::displaydoc;

/// Result type used by every fallible operation of this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

displaydoc! {
    /// Any error that aborts a generation run.
    #[derive(Debug)]
    pub enum Error {
        /// invalid schema: {_0}
        Schema(SchemaError),
        /// unsupported machine word size `{bits}`, expected 32 or 64
        UnsupportedWidth { bits: u32 },
        /// {_0}
        CapabilityViolation(CapabilityViolation),
        /// constant {value} does not fit the {bits}-bit register `{register}`
        ConstantOutOfRange { register: String, value: u128, bits: u32 },
        /// failed to parse schema: {_0}
        Parse(serde_json::Error),
        /// failed to render output: {_0}
        Format(fmt::Error),
    }
}

impl std::error::Error for Error {}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<CapabilityViolation> for Error {
    fn from(err: CapabilityViolation) -> Self {
        Self::CapabilityViolation(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<fmt::Error> for Error {
    fn from(err: fmt::Error) -> Self {
        Self::Format(err)
    }
}

displaydoc! {
    /// Malformed or inconsistent register and field declarations.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SchemaError {
        /// register `{name}` is declared more than once
        DuplicateRegister { name: String },
        /// field `{register}.{field}` is declared more than once
        DuplicateField { register: String, field: String },
        /// register `{register}` has unrecognized privilege `{token}`
        UnknownPrivilege { register: String, token: String },
        /// `{register}` declares unsupported width `{width}`
        InvalidWidth { register: String, width: String },
        /// field `{register}.{field}` has malformed bits: {reason}
        InvalidBits { register: String, field: String, reason: String },
        /// field `{register}.{field}` has zero width
        ZeroWidthField { register: String, field: String },
        /// field `{register}.{field}` at offset {offset} with width {width} exceeds the {register_width}-bit register
        FieldOutOfRange { register: String, field: String, offset: u32, width: u32, register_width: u32 },
        /// fields `{register}.{field}` and `{register}.{other}` overlap
        OverlappingFields { register: String, field: String, other: String },
        /// field `{register}.{field}` is more permissive than its register
        FieldExceedsRegister { register: String, field: String },
        /// field `{register}.{field}` with width {width} does not fit its {element_width}-bit element type
        ElementTooNarrow { register: String, field: String, width: u32, element_width: u32 },
        /// accessors of field `{register}.{field}` clash with those of register `{other}`
        AccessorNameClash { register: String, field: String, other: String },
        /// register `{name}` is not defined
        UnknownRegister { name: String },
    }
}

impl std::error::Error for SchemaError {}
