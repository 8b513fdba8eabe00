//! Outcome of one authorization call

use crate::error::AuthorizeError;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// What the caller gets back for one record
///
/// `json` is present exactly when `granted` is true. `errors` is non-empty
/// only when authorization failed internally, in which case the record is
/// denied.
#[derive(Debug, Default, Serialize)]
pub struct AccessResult {
    pub granted: bool,
    pub json: Option<String>,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<AuthorizeError>,
}

impl AccessResult {
    /// Denied by policy
    pub fn denied() -> Self {
        Self::default()
    }

    /// Granted, carrying the masked record
    pub fn granted(json: String) -> Self {
        Self {
            granted: true,
            json: Some(json),
            errors: Vec::new(),
        }
    }

    /// Denied because authorization could not complete
    pub fn failed(error: AuthorizeError) -> Self {
        Self {
            granted: false,
            json: None,
            errors: vec![error],
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render as a JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn serialize_errors<S: Serializer>(
    errors: &[AuthorizeError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(errors.len()))?;
    for error in errors {
        seq.serialize_element(&error.to_string())?;
    }
    seq.end()
}
