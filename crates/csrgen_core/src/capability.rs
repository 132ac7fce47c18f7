//! Privilege parsing and the operation sets every capability unlocks.
//!
//! Emitters never decide on their own which accessor to generate. They ask
//! for the [`Grant`]s of a register or field and only render what they get
//! back, so an accessor that the hardware cannot execute is never produced.

use crate::insn::Verb;
use bitflags::bitflags;
use core::fmt;

/// The access permitted on a register or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Capability {
    pub fn readable(self) -> bool {
        matches!(self, Capability::ReadOnly | Capability::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Capability::WriteOnly | Capability::ReadWrite)
    }

    /// Checks if every access of `other` is also permitted by `self`.
    pub fn covers(self, other: Capability) -> bool {
        (self.readable() || !other.readable()) && (self.writable() || !other.writable())
    }

    /// The snake case name that is also used for the generated capability types.
    pub fn name(self) -> &'static str {
        match self {
            Capability::ReadOnly => "read_only",
            Capability::WriteOnly => "write_only",
            Capability::ReadWrite => "read_write",
        }
    }

    /// The whole-register operations this capability unlocks.
    ///
    /// Bit set and clear operations are only meaningful if the register
    /// declares at least one field.
    pub fn register_ops(self, has_fields: bool) -> RegOps {
        let mut ops = RegOps::empty();

        if self.readable() {
            ops |= RegOps::READ;
        }

        if self.writable() {
            ops |= RegOps::WRITE | RegOps::WRITE_CONST;
            if has_fields {
                ops |= RegOps::SET_BITS
                    | RegOps::SET_BITS_CONST
                    | RegOps::CLR_BITS
                    | RegOps::CLR_BITS_CONST;
            }
        }

        if self == Capability::ReadWrite {
            ops |= RegOps::READ_WRITE | RegOps::READ_WRITE_CONST;
            if has_fields {
                ops |= RegOps::READ_SET_BITS
                    | RegOps::READ_SET_BITS_CONST
                    | RegOps::READ_CLR_BITS
                    | RegOps::READ_CLR_BITS_CONST;
            }
        }

        ops
    }

    /// The per-field operations this capability unlocks.
    pub fn field_ops(self) -> FieldOps {
        let mut ops = FieldOps::empty();

        if self.readable() {
            ops |= FieldOps::READ;
        }
        if self.writable() {
            ops |= FieldOps::SET | FieldOps::CLR;
        }
        if self == Capability::ReadWrite {
            ops |= FieldOps::WRITE | FieldOps::READ_WRITE;
        }

        ops
    }

    /// Request permission to emit `op` for the register named `target`.
    pub fn grant_register(
        self,
        target: &str,
        has_fields: bool,
        op: RegOp,
    ) -> Result<Grant<RegOp>, CapabilityViolation> {
        if self.register_ops(has_fields).contains(op.flag()) {
            Ok(Grant { op })
        } else {
            Err(CapabilityViolation {
                target: target.to_string(),
                capability: self,
                operation: op.name(),
            })
        }
    }

    /// Every register operation this capability permits, in emission order.
    pub fn register_grants(self, has_fields: bool) -> Vec<Grant<RegOp>> {
        let ops = self.register_ops(has_fields);
        RegOp::ALL
            .iter()
            .copied()
            .filter(|op| ops.contains(op.flag()))
            .map(|op| Grant { op })
            .collect()
    }

    /// Request permission to emit `op` for the field named `target`.
    pub fn grant_field(self, target: &str, op: FieldOp) -> Result<Grant<FieldOp>, CapabilityViolation> {
        if self.field_ops().contains(op.flag()) {
            Ok(Grant { op })
        } else {
            Err(CapabilityViolation {
                target: target.to_string(),
                capability: self,
                operation: op.name(),
            })
        }
    }

    /// Every field operation this capability permits, in emission order.
    pub fn field_grants(self) -> Vec<Grant<FieldOp>> {
        let ops = self.field_ops();
        FieldOp::ALL
            .iter()
            .copied()
            .filter(|op| ops.contains(op.flag()))
            .map(|op| Grant { op })
            .collect()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The privilege level a register belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    User,
    Supervisor,
    Hypervisor,
    Machine,
    /// Only accessible while the hart is in debug mode.
    Debug,
}

impl Mode {
    fn from_letter(c: char) -> Option<Self> {
        match c {
            'U' => Some(Mode::User),
            'S' => Some(Mode::Supervisor),
            'H' => Some(Mode::Hypervisor),
            'M' => Some(Mode::Machine),
            'D' => Some(Mode::Debug),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Mode::User => 'U',
            Mode::Supervisor => 'S',
            Mode::Hypervisor => 'H',
            Mode::Machine => 'M',
            Mode::Debug => 'D',
        }
    }
}

/// A parsed privilege token like `RW`, `MRW` or `URO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Privilege {
    pub mode: Option<Mode>,
    pub capability: Capability,
}

impl Privilege {
    /// Parse a privilege token, ignoring case.
    ///
    /// Accepts `R`/`RO`, `W`/`WO` and `RW`, optionally prefixed with one
    /// of the mode letters `U`, `S`, `H`, `M` or `D`.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_uppercase();

        let (mode, access) = match token.chars().next().and_then(Mode::from_letter) {
            Some(mode) => (Some(mode), &token[1..]),
            None => (None, token.as_str()),
        };

        let capability = match access {
            "R" | "RO" => Capability::ReadOnly,
            "W" | "WO" => Capability::WriteOnly,
            "RW" => Capability::ReadWrite,
            _ => return None,
        };

        Some(Self { mode, capability })
    }

    /// The access part of the canonical token.
    pub fn access_key(&self) -> &'static str {
        match self.capability {
            Capability::ReadOnly => "RO",
            Capability::WriteOnly => "WO",
            Capability::ReadWrite => "RW",
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(mode) = self.mode {
            write!(f, "{}", mode.letter())?;
        }
        f.write_str(self.access_key())
    }
}

bitflags! {
    /// Set of whole-register operations.
    pub struct RegOps: u16 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const WRITE_CONST = 1 << 2;
        const READ_WRITE = 1 << 3;
        const READ_WRITE_CONST = 1 << 4;
        const SET_BITS = 1 << 5;
        const SET_BITS_CONST = 1 << 6;
        const CLR_BITS = 1 << 7;
        const CLR_BITS_CONST = 1 << 8;
        const READ_SET_BITS = 1 << 9;
        const READ_SET_BITS_CONST = 1 << 10;
        const READ_CLR_BITS = 1 << 11;
        const READ_CLR_BITS_CONST = 1 << 12;

        /// Every operation that modifies the register.
        const WRITES = Self::WRITE.bits
            | Self::WRITE_CONST.bits
            | Self::READ_WRITE.bits
            | Self::READ_WRITE_CONST.bits
            | Self::SET_BITS.bits
            | Self::SET_BITS_CONST.bits
            | Self::CLR_BITS.bits
            | Self::CLR_BITS_CONST.bits
            | Self::READ_SET_BITS.bits
            | Self::READ_SET_BITS_CONST.bits
            | Self::READ_CLR_BITS.bits
            | Self::READ_CLR_BITS_CONST.bits;

        /// Every operation that returns the register value.
        const READS = Self::READ.bits
            | Self::READ_WRITE.bits
            | Self::READ_WRITE_CONST.bits
            | Self::READ_SET_BITS.bits
            | Self::READ_SET_BITS_CONST.bits
            | Self::READ_CLR_BITS.bits
            | Self::READ_CLR_BITS_CONST.bits;
    }
}

bitflags! {
    /// Set of per-field operations.
    pub struct FieldOps: u8 {
        const READ = 1 << 0;
        const SET = 1 << 1;
        const CLR = 1 << 2;
        const WRITE = 1 << 3;
        const READ_WRITE = 1 << 4;
    }
}

/// A single whole-register operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegOp {
    Read,
    Write,
    WriteConst,
    ReadWrite,
    ReadWriteConst,
    SetBits,
    SetBitsConst,
    ClrBits,
    ClrBitsConst,
    ReadSetBits,
    ReadSetBitsConst,
    ReadClrBits,
    ReadClrBitsConst,
}

impl RegOp {
    /// All operations in the order they are emitted.
    pub const ALL: [RegOp; 13] = [
        RegOp::Read,
        RegOp::Write,
        RegOp::WriteConst,
        RegOp::ReadWrite,
        RegOp::ReadWriteConst,
        RegOp::SetBits,
        RegOp::SetBitsConst,
        RegOp::ClrBits,
        RegOp::ClrBitsConst,
        RegOp::ReadSetBits,
        RegOp::ReadSetBitsConst,
        RegOp::ReadClrBits,
        RegOp::ReadClrBitsConst,
    ];

    pub fn flag(self) -> RegOps {
        match self {
            RegOp::Read => RegOps::READ,
            RegOp::Write => RegOps::WRITE,
            RegOp::WriteConst => RegOps::WRITE_CONST,
            RegOp::ReadWrite => RegOps::READ_WRITE,
            RegOp::ReadWriteConst => RegOps::READ_WRITE_CONST,
            RegOp::SetBits => RegOps::SET_BITS,
            RegOp::SetBitsConst => RegOps::SET_BITS_CONST,
            RegOp::ClrBits => RegOps::CLR_BITS,
            RegOp::ClrBitsConst => RegOps::CLR_BITS_CONST,
            RegOp::ReadSetBits => RegOps::READ_SET_BITS,
            RegOp::ReadSetBitsConst => RegOps::READ_SET_BITS_CONST,
            RegOp::ReadClrBits => RegOps::READ_CLR_BITS,
            RegOp::ReadClrBitsConst => RegOps::READ_CLR_BITS_CONST,
        }
    }

    /// The instruction this operation is built on.
    pub fn verb(self) -> Verb {
        match self {
            RegOp::Read => Verb::Read,
            RegOp::Write | RegOp::WriteConst => Verb::Write,
            RegOp::ReadWrite | RegOp::ReadWriteConst => Verb::ReadWrite,
            RegOp::SetBits | RegOp::SetBitsConst => Verb::SetBits,
            RegOp::ClrBits | RegOp::ClrBitsConst => Verb::ClrBits,
            RegOp::ReadSetBits | RegOp::ReadSetBitsConst => Verb::ReadSetBits,
            RegOp::ReadClrBits | RegOp::ReadClrBitsConst => Verb::ReadClrBits,
        }
    }

    /// Checks if the operand of this operation is known at compile time.
    pub fn is_const(self) -> bool {
        matches!(
            self,
            RegOp::WriteConst
                | RegOp::ReadWriteConst
                | RegOp::SetBitsConst
                | RegOp::ClrBitsConst
                | RegOp::ReadSetBitsConst
                | RegOp::ReadClrBitsConst
        )
    }

    /// The constant variant of a runtime-valued operation.
    pub fn to_const(self) -> Option<RegOp> {
        match self {
            RegOp::Write => Some(RegOp::WriteConst),
            RegOp::ReadWrite => Some(RegOp::ReadWriteConst),
            RegOp::SetBits => Some(RegOp::SetBitsConst),
            RegOp::ClrBits => Some(RegOp::ClrBitsConst),
            RegOp::ReadSetBits => Some(RegOp::ReadSetBitsConst),
            RegOp::ReadClrBits => Some(RegOp::ReadClrBitsConst),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RegOp::Read => "read",
            RegOp::Write => "write",
            RegOp::WriteConst => "write_const",
            RegOp::ReadWrite => "read_write",
            RegOp::ReadWriteConst => "read_write_const",
            RegOp::SetBits => "set_bits",
            RegOp::SetBitsConst => "set_bits_const",
            RegOp::ClrBits => "clr_bits",
            RegOp::ClrBitsConst => "clr_bits_const",
            RegOp::ReadSetBits => "read_set_bits",
            RegOp::ReadSetBitsConst => "read_set_bits_const",
            RegOp::ReadClrBits => "read_clr_bits",
            RegOp::ReadClrBitsConst => "read_clr_bits_const",
        }
    }
}

/// A single per-field operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    Read,
    Set,
    Clr,
    /// Non-atomic read-modify-write of the field.
    Write,
    /// Non-atomic read-modify-write that returns the previous field value.
    ReadWrite,
}

impl FieldOp {
    pub const ALL: [FieldOp; 5] = [
        FieldOp::Read,
        FieldOp::Set,
        FieldOp::Clr,
        FieldOp::Write,
        FieldOp::ReadWrite,
    ];

    pub fn flag(self) -> FieldOps {
        match self {
            FieldOp::Read => FieldOps::READ,
            FieldOp::Set => FieldOps::SET,
            FieldOp::Clr => FieldOps::CLR,
            FieldOp::Write => FieldOps::WRITE,
            FieldOp::ReadWrite => FieldOps::READ_WRITE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldOp::Read => "read",
            FieldOp::Set => "set",
            FieldOp::Clr => "clr",
            FieldOp::Write => "write",
            FieldOp::ReadWrite => "read_write",
        }
    }
}

/// Permission to emit an operation.
///
/// Can only be created by [`Capability`], so holding one proves that the
/// capability of the target permits the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant<Op> {
    op: Op,
}

impl<Op: Copy> Grant<Op> {
    pub fn op(&self) -> Op {
        self.op
    }
}

/// An operation was requested that the capability of its target forbids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityViolation {
    pub target: String,
    pub capability: Capability,
    pub operation: &'static str,
}

impl fmt::Display for CapabilityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` is {} and does not permit `{}`",
            self.target, self.capability, self.operation
        )
    }
}

impl std::error::Error for CapabilityViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_privilege_tokens() {
        let rw = Privilege::parse("rw").unwrap();
        assert_eq!(rw.mode, None);
        assert_eq!(rw.capability, Capability::ReadWrite);

        let mrw = Privilege::parse("MRW").unwrap();
        assert_eq!(mrw.mode, Some(Mode::Machine));
        assert_eq!(mrw.capability, Capability::ReadWrite);
        assert_eq!(mrw.to_string(), "MRW");

        let uro = Privilege::parse("URO").unwrap();
        assert_eq!(uro.mode, Some(Mode::User));
        assert_eq!(uro.capability, Capability::ReadOnly);

        assert_eq!(Privilege::parse("R").unwrap().capability, Capability::ReadOnly);
        assert_eq!(Privilege::parse("w").unwrap().capability, Capability::WriteOnly);
        assert_eq!(Privilege::parse("DRW").unwrap().mode, Some(Mode::Debug));
        assert_eq!(Privilege::parse("R").unwrap().to_string(), "RO");
    }

    #[test]
    fn reject_unknown_privilege_tokens() {
        for token in ["", "X", "RWX", "M", "MR W", "rr"].iter() {
            assert!(Privilege::parse(token).is_none(), "{} was accepted", token);
        }
    }

    #[test]
    fn read_only_only_reads() {
        for &has_fields in [false, true].iter() {
            let ops = Capability::ReadOnly.register_ops(has_fields);
            assert_eq!(ops, RegOps::READ);
            assert!(!ops.intersects(RegOps::WRITES));
        }
    }

    #[test]
    fn write_only_never_reads() {
        let ops = Capability::WriteOnly.register_ops(true);
        assert!(!ops.intersects(RegOps::READS));
        assert!(ops.contains(RegOps::SET_BITS | RegOps::CLR_BITS_CONST));

        let ops = Capability::WriteOnly.register_ops(false);
        assert_eq!(ops, RegOps::WRITE | RegOps::WRITE_CONST);
    }

    #[test]
    fn read_write_without_fields() {
        let ops = Capability::ReadWrite.register_ops(false);
        assert_eq!(
            ops,
            RegOps::READ | RegOps::WRITE | RegOps::WRITE_CONST | RegOps::READ_WRITE | RegOps::READ_WRITE_CONST
        );
    }

    #[test]
    fn read_write_with_fields_has_everything() {
        assert_eq!(Capability::ReadWrite.register_ops(true), RegOps::all());
    }

    #[test]
    fn field_ops_follow_capability() {
        assert_eq!(Capability::ReadOnly.field_ops(), FieldOps::READ);
        assert_eq!(Capability::WriteOnly.field_ops(), FieldOps::SET | FieldOps::CLR);
        assert_eq!(Capability::ReadWrite.field_ops(), FieldOps::all());
    }

    #[test]
    fn grant_rejects_forbidden_operation() {
        let err = Capability::ReadOnly
            .grant_register("mhartid", false, RegOp::Write)
            .unwrap_err();
        assert_eq!(err.target, "mhartid");
        assert_eq!(err.operation, "write");
        assert_eq!(err.to_string(), "`mhartid` is read_only and does not permit `write`");

        assert!(Capability::ReadWrite
            .grant_register("mcause", false, RegOp::SetBits)
            .is_err());
        assert!(Capability::WriteOnly.grant_field("x.y", FieldOp::Read).is_err());
    }

    #[test]
    fn grants_follow_emission_order() {
        let ops: Vec<_> = Capability::ReadWrite
            .register_grants(false)
            .iter()
            .map(Grant::op)
            .collect();
        assert_eq!(
            ops,
            [RegOp::Read, RegOp::Write, RegOp::WriteConst, RegOp::ReadWrite, RegOp::ReadWriteConst]
        );
    }

    #[test]
    fn covers() {
        assert!(Capability::ReadWrite.covers(Capability::ReadOnly));
        assert!(Capability::ReadWrite.covers(Capability::WriteOnly));
        assert!(!Capability::ReadOnly.covers(Capability::ReadWrite));
        assert!(!Capability::WriteOnly.covers(Capability::ReadOnly));
        assert!(Capability::WriteOnly.covers(Capability::WriteOnly));
    }
}
