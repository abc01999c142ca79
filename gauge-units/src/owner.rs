//! Owner scoping for custom units

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use serde_json::Value as JsonValue;
use gauge_core::ValidationError;

/// The kinds of record that may own custom units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Company,
    Department,
    Employee,
    Supplier,
    Warehouse,
    User,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Company => "company",
            OwnerKind::Department => "department",
            OwnerKind::Employee => "employee",
            OwnerKind::Supplier => "supplier",
            OwnerKind::Warehouse => "warehouse",
            OwnerKind::User => "user",
        }
    }
}

impl FromStr for OwnerKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "company" => Ok(OwnerKind::Company),
            "department" => Ok(OwnerKind::Department),
            "employee" => Ok(OwnerKind::Employee),
            "supplier" => Ok(OwnerKind::Supplier),
            "warehouse" => Ok(OwnerKind::Warehouse),
            "user" => Ok(OwnerKind::User),
            _ => Err(ValidationError::UnknownOwnerKind(s.to_string())),
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized owner of a custom unit. An id that was not numeric is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: Option<u64>,
}

impl Owner {
    pub fn new(kind: OwnerKind, id: u64) -> Self {
        Owner { kind, id: Some(id) }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}#{}", self.kind, id),
            None => write!(f, "{}#?", self.kind),
        }
    }
}

/// Owner as callers hand it over, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum OwnerRef {
    /// Explicit `(owner_type, owner_id)` pair
    Pair { kind: OwnerKind, id: JsonValue },
    /// An owning record carrying `id` or `owner_id`
    Record { kind: OwnerKind, record: JsonValue },
}

impl OwnerRef {
    pub fn pair(kind: OwnerKind, id: u64) -> Self {
        OwnerRef::Pair { kind, id: JsonValue::from(id) }
    }

    pub fn record(kind: OwnerKind, record: JsonValue) -> Self {
        OwnerRef::Record { kind, record }
    }

    /// Parse a pair whose kind arrives as free text
    pub fn parse_pair(kind: &str, id: JsonValue) -> Result<Self, ValidationError> {
        Ok(OwnerRef::Pair { kind: kind.parse()?, id })
    }

    pub fn normalize(&self) -> Owner {
        match self {
            OwnerRef::Pair { kind, id } => Owner { kind: *kind, id: numeric_id(id) },
            OwnerRef::Record { kind, record } => {
                let id = record.as_object().and_then(|fields| {
                    fields.get("id")
                        .and_then(numeric_id)
                        .or_else(|| fields.get("owner_id").and_then(numeric_id))
                });
                Owner { kind: *kind, id }
            }
        }
    }
}

impl From<Owner> for OwnerRef {
    fn from(owner: Owner) -> Self {
        OwnerRef::Pair {
            kind: owner.kind,
            id: owner.id.map(JsonValue::from).unwrap_or(JsonValue::Null),
        }
    }
}

/// Numbers and digit-only strings become ids; anything else is `None`
pub(crate) fn numeric_id(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}
