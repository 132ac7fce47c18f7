//! The validated register and field model.

use crate::capability::{Capability, Privilege};
use crate::error::SchemaError;
use crate::layout::FieldLayout;
use crate::schema::{AddrSpec, BitPos, RawField, RawRegister, RawWidth, Schema};
use crate::width::{IntWidth, WidthSpec, Xlen};
use std::collections::HashSet;
use std::convert::TryFrom;

/// A register or field that is declared but excluded pending target support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excluded {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub layout: FieldLayout,
    /// The declared type used to hand the field value to the caller.
    pub element: WidthSpec,
    pub capability: Capability,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub name: String,
    pub privilege: Privilege,
    pub desc: String,
    /// Memory mapped registers can't be accessed using CSR instructions.
    pub mmio: bool,
    pub width: WidthSpec,
    pub fields: Vec<Field>,
    pub excluded_fields: Vec<Excluded>,
}

impl Register {
    pub fn capability(&self) -> Capability {
        self.privilege.capability
    }

    /// Checks if the schema declares any field for this register, even an excluded one.
    pub fn declares_fields(&self) -> bool {
        !self.fields.is_empty() || !self.excluded_fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Every register of a schema, checked against a specific machine word size.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    xlen: Xlen,
    registers: Vec<Register>,
    mmio: Vec<Register>,
    excluded: Vec<Excluded>,
    privileges: Vec<String>,
}

impl RegisterFile {
    /// Validate the schema and build the model for the given word size.
    pub fn build(schema: &Schema, xlen: Xlen) -> Result<Self, SchemaError> {
        let mut names = HashSet::new();
        let mut file = Self {
            xlen,
            registers: Vec::new(),
            mmio: Vec::new(),
            excluded: Vec::new(),
            privileges: schema.addr.as_ref().map(privilege_keys).unwrap_or_default(),
        };

        for (name, raw) in schema.regs.iter() {
            if !names.insert(name) {
                return Err(SchemaError::DuplicateRegister { name: name.to_string() });
            }

            if let Some(reason) = &raw.excluded {
                log::warn!("excluding register `{}`: {}", name, reason);
                file.excluded.push(Excluded {
                    name: name.to_string(),
                    reason: reason.clone(),
                });
                continue;
            }

            let register = build_register(name, raw, xlen)?;
            log::debug!(
                "register `{}` ({}) with {} fields",
                register.name,
                register.privilege,
                register.fields.len()
            );

            if register.mmio {
                log::warn!("register `{}` is memory mapped, skipping", register.name);
                file.mmio.push(register);
            } else {
                file.registers.push(register);
            }
        }

        check_accessor_names(&file.registers)?;
        Ok(file)
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    /// The registers accessed with CSR instructions, in declaration order.
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// Memory mapped registers, passed through for an MMIO aware consumer.
    pub fn mmio(&self) -> &[Register] {
        &self.mmio
    }

    pub fn excluded(&self) -> &[Excluded] {
        &self.excluded
    }

    /// The privilege enumerators declared by the schema.
    pub fn privileges(&self) -> &[String] {
        &self.privileges
    }

    pub fn get(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|reg| reg.name == name)
    }
}

/// Every `<mode><access>` pair plus a debug variant of every access key.
fn privilege_keys(addr: &AddrSpec) -> Vec<String> {
    let modes = addr
        .privilege
        .values
        .iter()
        .map(|mode| mode.key.as_str())
        .chain(Some("D"));

    let mut keys = Vec::new();
    for mode in modes {
        for access in &addr.rw.values {
            let key = format!("{}{}", mode, access.key);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

fn build_register(name: &str, raw: &RawRegister, xlen: Xlen) -> Result<Register, SchemaError> {
    let privilege = Privilege::parse(&raw.privilege).ok_or_else(|| SchemaError::UnknownPrivilege {
        register: name.to_string(),
        token: raw.privilege.clone(),
    })?;

    let width = match &raw.width {
        Some(width) => parse_width(name, width, &[32, 64])?,
        None => WidthSpec::Xlen,
    };
    let register_bits = width.resolve(xlen).bits();

    let mut register = Register {
        name: name.to_string(),
        privilege,
        desc: raw.desc.clone(),
        mmio: raw.mmio,
        width,
        fields: Vec::new(),
        excluded_fields: Vec::new(),
    };

    let mut names = HashSet::new();
    for (field_name, raw_field) in raw.fields.iter() {
        if !names.insert(field_name) {
            return Err(SchemaError::DuplicateField {
                register: name.to_string(),
                field: field_name.to_string(),
            });
        }

        if let Some(reason) = &raw_field.excluded {
            log::warn!("excluding field `{}.{}`: {}", name, field_name, reason);
            register.excluded_fields.push(Excluded {
                name: field_name.to_string(),
                reason: reason.clone(),
            });
            continue;
        }

        let field = build_field(&register, register_bits, field_name, raw_field, xlen)?;
        if let Some(other) = register
            .fields
            .iter()
            .find(|other| other.layout.overlaps(&field.layout))
        {
            return Err(SchemaError::OverlappingFields {
                register: name.to_string(),
                field: field.name,
                other: other.name.clone(),
            });
        }

        log::trace!(
            "field `{}.{}` at bits {}..{}",
            name,
            field.name,
            field.layout.offset,
            field.layout.end()
        );
        register.fields.push(field);
    }

    Ok(register)
}

/// Field accessors are named `<reg>_<field>`, constants in upper case, so no
/// register may be called like that.
fn check_accessor_names(registers: &[Register]) -> Result<(), SchemaError> {
    let names: HashSet<String> = registers
        .iter()
        .map(|reg| reg.name.to_ascii_lowercase())
        .collect();

    for reg in registers {
        for field in &reg.fields {
            let joined = format!("{}_{}", reg.name, field.name).to_ascii_lowercase();
            if names.contains(&joined) {
                let other = registers
                    .iter()
                    .find(|other| other.name.eq_ignore_ascii_case(&joined))
                    .map_or(joined, |other| other.name.clone());
                return Err(SchemaError::AccessorNameClash {
                    register: reg.name.clone(),
                    field: field.name.clone(),
                    other,
                });
            }
        }
    }

    Ok(())
}

fn build_field(
    register: &Register,
    register_bits: u32,
    name: &str,
    raw: &RawField,
    xlen: Xlen,
) -> Result<Field, SchemaError> {
    let invalid_bits = |reason: String| SchemaError::InvalidBits {
        register: register.name.clone(),
        field: name.to_string(),
        reason,
    };

    let (offset, width) = match (raw.offset, raw.width, &raw.bits) {
        (Some(offset), Some(width), None) => (offset, width),
        (None, None, Some(bits)) => match bits.as_slice() {
            [bit] => (resolve_pos(bit, xlen).map_err(invalid_bits)?, 1),
            [msb, lsb] => {
                let msb = resolve_pos(msb, xlen).map_err(invalid_bits)?;
                let lsb = resolve_pos(lsb, xlen).map_err(invalid_bits)?;
                if msb < lsb {
                    return Err(invalid_bits(format!("msb {} is below lsb {}", msb, lsb)));
                }
                let width = (msb - lsb).checked_add(1).ok_or_else(|| SchemaError::FieldOutOfRange {
                    register: register.name.clone(),
                    field: name.to_string(),
                    offset: lsb,
                    width: u32::MAX,
                    register_width: register_bits,
                })?;
                (lsb, width)
            }
            _ => return Err(invalid_bits("expected `[msb, lsb]` or `[bit]`".to_string())),
        },
        _ => {
            return Err(invalid_bits(
                "expected either `offset` and `width` or `bits`".to_string(),
            ))
        }
    };

    if width == 0 {
        return Err(SchemaError::ZeroWidthField {
            register: register.name.clone(),
            field: name.to_string(),
        });
    }

    if offset.checked_add(width).map_or(true, |end| end > register_bits) {
        return Err(SchemaError::FieldOutOfRange {
            register: register.name.clone(),
            field: name.to_string(),
            offset,
            width,
            register_width: register_bits,
        });
    }

    let qualified = format!("{}.{}", register.name, name);
    let element = match &raw.element_width {
        Some(element) => parse_width(&qualified, element, &[8, 16, 32, 64])?,
        None => register.width,
    };
    let element_bits = element.resolve(xlen).bits();
    if width > element_bits {
        return Err(SchemaError::ElementTooNarrow {
            register: register.name.clone(),
            field: name.to_string(),
            width,
            element_width: element_bits,
        });
    }

    let capability = match &raw.privilege {
        Some(token) => {
            let privilege = Privilege::parse(token).ok_or_else(|| SchemaError::UnknownPrivilege {
                register: qualified.clone(),
                token: token.clone(),
            })?;
            if !register.capability().covers(privilege.capability) {
                return Err(SchemaError::FieldExceedsRegister {
                    register: register.name.clone(),
                    field: name.to_string(),
                });
            }
            privilege.capability
        }
        None => register.capability(),
    };

    Ok(Field {
        name: name.to_string(),
        layout: FieldLayout::new(offset, width),
        element,
        capability,
        desc: raw.desc.clone(),
    })
}

fn parse_width(owner: &str, raw: &RawWidth, allowed: &[u32]) -> Result<WidthSpec, SchemaError> {
    let invalid = || SchemaError::InvalidWidth {
        register: owner.to_string(),
        width: raw.to_string(),
    };

    match raw {
        RawWidth::Bits(bits) if allowed.contains(bits) => {
            IntWidth::from_bits(*bits).map(WidthSpec::Fixed).ok_or_else(invalid)
        }
        RawWidth::Named(name) if is_xlen_name(name) => Ok(WidthSpec::Xlen),
        _ => Err(invalid()),
    }
}

fn is_xlen_name(name: &str) -> bool {
    matches!(
        name.trim().to_ascii_lowercase().as_str(),
        "xlen" | "mxlen" | "sxlen" | "uxlen"
    )
}

/// Resolve an absolute bit position or an expression like `xlen-1`.
fn resolve_pos(pos: &BitPos, xlen: Xlen) -> Result<u32, String> {
    let expr = match pos {
        BitPos::Index(bit) => return Ok(*bit),
        BitPos::Expr(expr) => expr,
    };

    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let split = compact.find(|c| c == '-' || c == '+').unwrap_or(compact.len());
    let (base, rest) = compact.split_at(split);

    if !is_xlen_name(base) {
        return Err(format!("unknown bit position `{}`", expr));
    }

    let bits = i64::from(xlen.bits());
    let value = match rest.chars().next() {
        None => bits,
        Some(sign) => {
            let amount = rest[1..]
                .parse::<i64>()
                .map_err(|_| format!("unknown bit position `{}`", expr))?;
            if sign == '-' {
                bits - amount
            } else {
                bits + amount
            }
        }
    };

    u32::try_from(value).map_err(|_| format!("bit position `{}` is negative", expr))
}
