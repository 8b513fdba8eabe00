//! Policy request and outcome types
//!
//! Core types exchanged with a [`PolicyAuthority`](super::PolicyAuthority).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Separator between schema and field in a qualified resource name
pub const QUALIFIED_NAME_SEPARATOR: char = '#';

/// Access type requested for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    #[default]
    Read,
    Update,
}

impl AccessType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessType::Read => "read",
            AccessType::Update => "update",
        }
    }

    /// Try to parse an access type from a string (case-insensitive)
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Some(AccessType::Read),
            "update" => Some(AccessType::Update),
            _ => None,
        }
    }

    pub fn all() -> &'static [AccessType] {
        &[AccessType::Read, AccessType::Update]
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a schema-only resource is matched against field-level policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingScope {
    /// Only policies covering the resource itself
    #[default]
    SelfOnly,
    /// Policies covering the resource or anything beneath it
    SelfOrDescendants,
}

/// A schema, or one field within a schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource {
    pub schema: String,
    pub field: Option<String>,
}

impl Resource {
    pub fn schema(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            field: None,
        }
    }

    pub fn field(schema: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            field: Some(field.into()),
        }
    }

    /// Parse `schema#field` or a bare `schema`.
    ///
    /// Returns `None` for an empty schema. An empty field after `#` is treated
    /// as absent.
    pub fn from_qualified_name(name: &str) -> Option<Self> {
        let (schema, field) = match name.split_once(QUALIFIED_NAME_SEPARATOR) {
            Some((schema, field)) => (schema, Some(field).filter(|f| !f.is_empty())),
            None => (name, None),
        };
        if schema.is_empty() {
            return None;
        }
        Some(Self {
            schema: schema.to_string(),
            field: field.map(str::to_string),
        })
    }

    /// `schema#field`, or `schema` when no field is set
    pub fn qualified_name(&self) -> String {
        match &self.field {
            Some(field) => format!("{}{}{}", self.schema, QUALIFIED_NAME_SEPARATOR, field),
            None => self.schema.clone(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// One question put to the policy authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub resource: Resource,
    pub access_type: AccessType,
    pub user: String,
    pub groups: BTreeSet<String>,
}

/// Answer to an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessOutcome {
    /// Whether any policy took a position on the request
    pub determined: bool,
    pub allowed: bool,
    pub policy_id: Option<i64>,
}

impl AccessOutcome {
    pub fn allowed(policy_id: i64) -> Self {
        Self {
            determined: true,
            allowed: true,
            policy_id: Some(policy_id),
        }
    }

    pub fn denied(policy_id: i64) -> Self {
        Self {
            determined: true,
            allowed: false,
            policy_id: Some(policy_id),
        }
    }

    pub fn undetermined() -> Self {
        Self::default()
    }

    /// Access is granted only when a policy decided and allowed it
    pub fn is_granted(&self) -> bool {
        self.determined && self.allowed
    }
}

/// Answer to a mask policy evaluation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaskOutcome {
    pub mask_enabled: bool,
    pub mask_type: Option<String>,
    pub masked_value: Option<String>,
    pub policy_id: Option<i64>,
}

impl MaskOutcome {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Answer to a row filter evaluation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowFilterOutcome {
    pub filter_enabled: bool,
    pub filter_expr: Option<String>,
    pub policy_id: Option<i64>,
}

impl RowFilterOutcome {
    pub fn disabled() -> Self {
        Self::default()
    }
}
