//! Value masking
//!
//! Replaces a scalar leaf with its redacted form. The runtime kind of the
//! value decides which directives apply:
//!
//! | Directive             | string | number | boolean |
//! |-----------------------|--------|--------|---------|
//! | `MASK`                | yes    | yes    | yes     |
//! | `MASK_NULL`           | yes    | yes    | yes     |
//! | `MASK_NONE`           | yes    | yes    | yes     |
//! | `CUSTOM`              | yes    | yes    | yes     |
//! | `MASK_SHOW_LAST_4`    | yes    |        |         |
//! | `MASK_SHOW_FIRST_4`   | yes    |        |         |
//! | `MASK_HASH`           | yes    |        |         |
//! | `MASK_DATE_SHOW_YEAR` | yes    |        |         |

pub mod date;

use crate::error::{MaskResult, MaskingError};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Shortest run of mask characters produced by `MASK`
pub const MIN_MASK_LENGTH: usize = 5;

/// Longest run of mask characters produced by `MASK`
pub const MAX_MASK_LENGTH: usize = 30;

/// Character used by `MASK`
pub const MASK_CHAR: char = '*';

/// Character replacing hidden positions in `MASK_SHOW_FIRST_4` / `MASK_SHOW_LAST_4`
pub const FILLER_CHAR: char = 'x';

/// Replacement for numbers under `MASK`
pub const DEFAULT_NUMBER_MASK: i64 = -11111;

/// Replacement for booleans under `MASK` and unparseable `CUSTOM` values
pub const DEFAULT_BOOLEAN_MASK: bool = false;

/// Text hashed in place of a missing string under `MASK_HASH`
pub const NULL_HASH_PLACEHOLDER: &str = "null";

/// Number of characters left visible by the show-first/show-last directives
const SHOWN_CHARS: usize = 4;

/// Masking strategy named by a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskType {
    Mask,
    MaskNull,
    MaskNone,
    Custom,
    ShowLast4,
    ShowFirst4,
    Hash,
    DateShowYear,
}

impl MaskType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MaskType::Mask => "MASK",
            MaskType::MaskNull => "MASK_NULL",
            MaskType::MaskNone => "MASK_NONE",
            MaskType::Custom => "CUSTOM",
            MaskType::ShowLast4 => "MASK_SHOW_LAST_4",
            MaskType::ShowFirst4 => "MASK_SHOW_FIRST_4",
            MaskType::Hash => "MASK_HASH",
            MaskType::DateShowYear => "MASK_DATE_SHOW_YEAR",
        }
    }

    /// Try to parse a directive name (case-insensitive)
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MASK" => Some(MaskType::Mask),
            "MASK_NULL" => Some(MaskType::MaskNull),
            "MASK_NONE" => Some(MaskType::MaskNone),
            "CUSTOM" => Some(MaskType::Custom),
            "MASK_SHOW_LAST_4" => Some(MaskType::ShowLast4),
            "MASK_SHOW_FIRST_4" => Some(MaskType::ShowFirst4),
            "MASK_HASH" => Some(MaskType::Hash),
            "MASK_DATE_SHOW_YEAR" => Some(MaskType::DateShowYear),
            _ => None,
        }
    }

    pub fn all() -> &'static [MaskType] {
        &[
            MaskType::Mask,
            MaskType::MaskNull,
            MaskType::MaskNone,
            MaskType::Custom,
            MaskType::ShowLast4,
            MaskType::ShowFirst4,
            MaskType::Hash,
            MaskType::DateShowYear,
        ]
    }

    /// Directives that apply to every scalar kind, including `null`
    pub const fn is_type_agnostic(&self) -> bool {
        matches!(self, MaskType::MaskNull | MaskType::MaskNone)
    }
}

impl fmt::Display for MaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s).ok_or_else(|| s.to_string())
    }
}

/// Runtime kind of a masked leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Boolean(bool),
}

impl Scalar {
    /// Classify a JSON leaf; `null`, objects and arrays have no scalar kind
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Number(n) => Some(Scalar::Number(n.clone())),
            Value::Bool(b) => Some(Scalar::Boolean(*b)),
            _ => None,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Scalar::String(_) => "string",
            Scalar::Number(_) => "number",
            Scalar::Boolean(_) => "boolean",
        }
    }
}

/// Mask a JSON leaf.
///
/// `directive` is the mask type exactly as the policy authority named it.
/// `null` leaves pass through `MASK_NULL` and `MASK_NONE` unchanged; any other
/// directive on a `null` fails because no scalar kind can be inferred.
pub fn mask_value(
    value: &Value,
    directive: Option<&str>,
    custom: Option<&str>,
) -> MaskResult<Value> {
    let Some(scalar) = Scalar::from_value(value) else {
        return match directive.and_then(MaskType::try_parse) {
            Some(mask_type) if value.is_null() && mask_type.is_type_agnostic() => Ok(Value::Null),
            _ => Err(MaskingError::UndeterminedType {
                value: value.to_string(),
            }),
        };
    };

    let mask_type = resolve_directive(scalar.kind(), directive)?;
    match scalar {
        Scalar::String(s) => {
            Ok(mask_string(Some(&s), mask_type, custom)?.map_or(Value::Null, Value::String))
        }
        Scalar::Number(n) => {
            Ok(mask_number(&n, mask_type, custom)?.map_or(Value::Null, Value::Number))
        }
        Scalar::Boolean(b) => {
            Ok(mask_boolean(b, mask_type, custom)?.map_or(Value::Null, Value::Bool))
        }
    }
}

fn resolve_directive(kind: &'static str, directive: Option<&str>) -> MaskResult<MaskType> {
    let directive = directive.ok_or(MaskingError::MissingDirective { kind })?;
    MaskType::try_parse(directive).ok_or_else(|| MaskingError::UnsupportedDirective {
        kind,
        directive: directive.to_string(),
    })
}

fn unsupported(kind: &'static str, mask_type: MaskType) -> MaskingError {
    MaskingError::UnsupportedDirective {
        kind,
        directive: mask_type.to_string(),
    }
}

/// Mask a string. `None` stands for a missing value: `MASK`, `MASK_HASH` and
/// `CUSTOM` still produce output, `MASK_DATE_SHOW_YEAR` fails, the rest yield `None`.
pub fn mask_string(
    value: Option<&str>,
    mask_type: MaskType,
    custom: Option<&str>,
) -> MaskResult<Option<String>> {
    let masked = match mask_type {
        MaskType::Mask => Some(generate_mask(value.unwrap_or_default())),
        MaskType::MaskNull => None,
        MaskType::MaskNone => value.map(str::to_string),
        MaskType::Custom => custom.map(str::to_string),
        MaskType::ShowLast4 => value.map(show_last_four),
        MaskType::ShowFirst4 => value.map(show_first_four),
        MaskType::Hash => Some(sha256_hex(value.unwrap_or(NULL_HASH_PLACEHOLDER))),
        MaskType::DateShowYear => Some(mask_year(value.unwrap_or_default())?),
    };
    Ok(masked)
}

/// Mask a number
pub fn mask_number(
    value: &Number,
    mask_type: MaskType,
    custom: Option<&str>,
) -> MaskResult<Option<Number>> {
    match mask_type {
        MaskType::Mask => Ok(Some(Number::from(DEFAULT_NUMBER_MASK))),
        MaskType::MaskNull => Ok(None),
        MaskType::MaskNone => Ok(Some(value.clone())),
        MaskType::Custom => {
            let raw = custom.unwrap_or_default();
            raw.parse::<i64>()
                .map(|n| Some(Number::from(n)))
                .map_err(|_| MaskingError::InvalidCustomValue {
                    kind: "number",
                    value: raw.to_string(),
                })
        }
        other => Err(unsupported("number", other)),
    }
}

/// Mask a boolean
pub fn mask_boolean(
    value: bool,
    mask_type: MaskType,
    custom: Option<&str>,
) -> MaskResult<Option<bool>> {
    match mask_type {
        MaskType::Mask => Ok(Some(DEFAULT_BOOLEAN_MASK)),
        MaskType::MaskNull => Ok(None),
        MaskType::MaskNone => Ok(Some(value)),
        // Anything that is not "true" reads as false
        MaskType::Custom => Ok(Some(
            custom.is_some_and(|c| c.eq_ignore_ascii_case("true")),
        )),
        other => Err(unsupported("boolean", other)),
    }
}

fn generate_mask(value: &str) -> String {
    let len = value
        .chars()
        .count()
        .clamp(MIN_MASK_LENGTH, MAX_MASK_LENGTH);
    MASK_CHAR.to_string().repeat(len)
}

fn show_last_four(value: &str) -> String {
    let len = value.chars().count();
    if len < SHOWN_CHARS {
        return value.to_string();
    }
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i < len - SHOWN_CHARS { FILLER_CHAR } else { c })
        .collect()
}

fn show_first_four(value: &str) -> String {
    if value.chars().count() < SHOWN_CHARS {
        return value.to_string();
    }
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i < SHOWN_CHARS { c } else { FILLER_CHAR })
        .collect()
}

fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

fn mask_year(value: &str) -> MaskResult<String> {
    date::year_of(value).ok_or_else(|| MaskingError::UnsupportedDateFormat {
        value: value.to_string(),
    })
}
