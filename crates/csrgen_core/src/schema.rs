//! The raw register schema as handed over by a schema loader.
//!
//! Nothing here is validated yet, see [`RegisterFile`](crate::model::RegisterFile)
//! for the checked model.

use crate::error::Result;
use core::{fmt, marker::PhantomData};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::io;

/// A JSON object that keeps the declaration order of its keys.
///
/// Duplicate keys are kept as well, so the model can report them instead of
/// silently using the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct Entries<T>(pub Vec<(String, T)>);

impl<T> Entries<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, T>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// The top level of a register schema.
#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    pub regs: Entries<RawRegister>,
    #[serde(default)]
    pub addr: Option<AddrSpec>,
}

impl Schema {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRegister {
    #[serde(rename = "priv")]
    pub privilege: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub mmio: bool,
    #[serde(default)]
    pub width: Option<RawWidth>,
    #[serde(default)]
    pub fields: Entries<RawField>,
    /// Reason why this register is excluded pending target support.
    #[serde(default)]
    pub excluded: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawField {
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    /// `[msb, lsb]` or `[bit]`.
    #[serde(default)]
    pub bits: Option<Vec<BitPos>>,
    #[serde(default)]
    pub element_width: Option<RawWidth>,
    #[serde(default, rename = "priv")]
    pub privilege: Option<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub excluded: Option<String>,
}

/// A bit position, either absolute or relative to the machine word (`"xlen-1"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BitPos {
    Index(u32),
    Expr(String),
}

/// A declared width, either a number of bits or `"xlen"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawWidth {
    Bits(u32),
    Named(String),
}

impl fmt::Display for RawWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawWidth::Bits(bits) => write!(f, "{}", bits),
            RawWidth::Named(name) => f.write_str(name),
        }
    }
}

/// The privilege and access key tables of the schema.
#[derive(Debug, Clone, Deserialize)]
pub struct AddrSpec {
    #[serde(rename = "priv")]
    pub privilege: KeyTable,
    pub rw: KeyTable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyTable {
    pub values: Vec<KeyEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyEntry {
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_declaration_order() {
        let schema = Schema::from_json_str(
            r#"{ "regs": {
                "mstatus": { "priv": "MRW" },
                "misa": { "priv": "MRW" },
                "mcause": { "priv": "MRW" }
            } }"#,
        )
        .unwrap();

        let names: Vec<_> = schema.regs.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["mstatus", "misa", "mcause"]);
        assert!(schema.addr.is_none());
    }

    #[test]
    fn keeps_duplicate_keys() {
        let schema = Schema::from_json_str(
            r#"{ "regs": { "mie": { "priv": "MRW" }, "mie": { "priv": "MRO" } } }"#,
        )
        .unwrap();
        assert_eq!(schema.regs.len(), 2);
    }

    #[test]
    fn field_notations() {
        let schema = Schema::from_json_str(
            r#"{ "regs": { "mtvec": {
                "priv": "MRW", "width": "xlen", "desc": "Machine trap-handler base address",
                "fields": {
                    "mode": { "offset": 0, "width": 2 },
                    "base": { "bits": ["xlen-1", 2], "element_width": 64, "priv": "RW" }
                }
            } } }"#,
        )
        .unwrap();

        let (_, mtvec) = schema.regs.iter().next().unwrap();
        assert_eq!(mtvec.width, Some(RawWidth::Named("xlen".into())));
        assert!(!mtvec.mmio);

        let fields: Vec<_> = mtvec.fields.iter().collect();
        assert_eq!(fields[0].0, "mode");
        assert_eq!(fields[0].1.offset, Some(0));
        assert_eq!(fields[0].1.width, Some(2));
        assert_eq!(
            fields[1].1.bits,
            Some(vec![BitPos::Expr("xlen-1".into()), BitPos::Index(2)])
        );
        assert_eq!(fields[1].1.element_width, Some(RawWidth::Bits(64)));
        assert_eq!(fields[1].1.privilege.as_deref(), Some("RW"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(Schema::from_json_str(r#"{ "regs": [] }"#).is_err());
        assert!(Schema::from_json_str(r#"{ "regs": { "mie": {} } }"#).is_err());
    }
}
