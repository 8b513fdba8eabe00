//! Record authorization
//!
//! [`NestedAuthorizer`] decides whether a user may see a JSON record and, when
//! they may, returns the record with every masked field rewritten.
//!
//! ## Pipeline
//!
//! 1. Schema gate: the user needs access to the schema or something beneath it
//! 2. Row filter: the schema's filter expression must accept the record
//! 3. Field discovery over the parsed document
//! 4. One access and mask decision per field; any denied field denies the record
//! 5. Masking of every concrete leaf behind a masked field
//! 6. Re-serialization
//!
//! Failures at any step deny the record and are reported on the
//! [`AccessResult`]; nothing is returned as an `Err`.

pub mod decisions;
pub mod result;

pub use decisions::{AccessContext, FanOut, FieldDecision, FieldDecisions, decide_fields};
pub use result::AccessResult;

use crate::config::AuthorizerConfig;
use crate::document::Document;
use crate::error::{AuthorizeError, AuthorizeResult};
use crate::filter::SharedRowFilter;
use crate::masking::mask_value;
use crate::policy::{AccessType, MatchingScope, SharedAuthority};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// One record to authorize, in a shape that can be read from a file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthorizeRequest {
    pub schema: String,
    pub user: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub access_type: AccessType,
    /// The record, as JSON text
    pub json: String,
}

impl AuthorizeRequest {
    fn context(&self) -> AccessContext {
        AccessContext {
            schema: self.schema.clone(),
            user: self.user.clone(),
            groups: self.groups.clone(),
            access_type: self.access_type,
        }
    }
}

impl From<&AuthorizerConfig> for FanOut {
    fn from(config: &AuthorizerConfig) -> Self {
        Self {
            parallel: config.parallel,
            threshold: config.parallel_threshold,
        }
    }
}

/// Field-level authorizer for JSON records
///
/// Stateless between calls; one instance can serve many threads.
#[derive(Clone)]
pub struct NestedAuthorizer {
    authority: SharedAuthority,
    row_filter: SharedRowFilter,
    fan_out: FanOut,
}

impl NestedAuthorizer {
    pub fn new(
        authority: SharedAuthority,
        row_filter: SharedRowFilter,
        config: &AuthorizerConfig,
    ) -> Self {
        Self {
            authority,
            row_filter,
            fan_out: FanOut::from(config),
        }
    }

    /// Authorize `json` for `user` reading or updating a record of `schema`.
    pub fn authorize(
        &self,
        schema: &str,
        user: &str,
        groups: &BTreeSet<String>,
        json: &str,
        access_type: AccessType,
    ) -> AccessResult {
        let context = AccessContext {
            schema: schema.to_string(),
            user: user.to_string(),
            groups: groups.clone(),
            access_type,
        };
        self.authorize_in(&context, json)
    }

    /// Same as [`authorize`](Self::authorize), taking the inputs as one struct
    pub fn authorize_request(&self, request: &AuthorizeRequest) -> AccessResult {
        self.authorize_in(&request.context(), &request.json)
    }

    fn authorize_in(&self, context: &AccessContext, json: &str) -> AccessResult {
        match self.run(context, json) {
            Ok(Some(masked)) => AccessResult::granted(masked),
            Ok(None) => AccessResult::denied(),
            Err(e) => {
                warn!(user = %context.user, json, error = %e, "Unable to authorize record");
                AccessResult::failed(e)
            }
        }
    }

    /// `Ok(None)` is a policy denial
    #[instrument(
        skip(self, context, json),
        fields(schema = %context.schema, user = %context.user, access = %context.access_type)
    )]
    fn run(&self, context: &AccessContext, json: &str) -> AuthorizeResult<Option<String>> {
        if !self.schema_allowed(context)? {
            info!("Denied: no access to schema");
            return Ok(None);
        }

        if !self.record_allowed(context, json)? {
            info!("Denied: row filter rejected record");
            return Ok(None);
        }

        let mut document = Document::parse(json)?;
        let fields = document.fields();
        debug!(fields = fields.len(), "Discovered fields");

        let decisions = decide_fields(self.authority.as_ref(), context, &fields, self.fan_out)?;
        if !decisions.granted {
            info!("Denied: at least one field is not accessible");
            return Ok(None);
        }

        let masked = apply_masks(&mut document, &decisions)?;
        info!(masked, "Granted");
        Ok(Some(document.to_json_string()))
    }

    fn schema_allowed(&self, context: &AccessContext) -> AuthorizeResult<bool> {
        let request = context.schema_request();
        let outcome = self
            .authority
            .is_access_allowed(&request, MatchingScope::SelfOrDescendants)
            .ok_or_else(|| AuthorizeError::decision_unavailable(request.resource.qualified_name()))?;
        debug!(
            granted = outcome.is_granted(),
            policy_id = ?outcome.policy_id,
            "Checked schema access"
        );
        Ok(outcome.is_granted())
    }

    fn record_allowed(&self, context: &AccessContext, json: &str) -> AuthorizeResult<bool> {
        let request = context.schema_request();
        let outcome = self
            .authority
            .eval_row_filter_policy(&request)
            .ok_or_else(|| AuthorizeError::decision_unavailable(request.resource.qualified_name()))?;

        if !outcome.filter_enabled {
            return Ok(true);
        }

        // An enabled filter without an expression fails to parse, which denies.
        let expression = outcome.filter_expr.as_deref().unwrap_or_default();
        debug!(expression, policy_id = ?outcome.policy_id, "Row filter enabled");

        let record: Value = serde_json::from_str(json)?;
        Ok(self
            .row_filter
            .evaluate(expression, &context.user, &record)?)
    }
}

/// Mask every leaf behind a masked decision; returns the number of leaves rewritten
fn apply_masks(document: &mut Document, decisions: &FieldDecisions) -> AuthorizeResult<usize> {
    let mut count = 0;
    for decision in decisions.masking_plan() {
        for path in document.expand(&decision.field) {
            let Some(current) = document.get(&path) else {
                continue;
            };
            let masked = mask_value(
                current,
                decision.mask_type.as_deref(),
                decision.custom_mask_value.as_deref(),
            )?;
            document.replace(&path, masked);
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ExpressionFilter, RowFilterEvaluator};
    use crate::policy::{
        AccessOutcome, AccessRequest, MaskOutcome, PolicyAuthority, RowFilterOutcome,
    };
    use std::sync::Arc;

    /// Allows everything, masks one field, optionally filters rows
    struct FixedAuthority {
        masked_field: Option<(&'static str, &'static str)>,
        filter: Option<&'static str>,
    }

    impl PolicyAuthority for FixedAuthority {
        fn is_access_allowed(
            &self,
            _request: &AccessRequest,
            _scope: MatchingScope,
        ) -> Option<AccessOutcome> {
            Some(AccessOutcome::allowed(1))
        }

        fn eval_mask_policy(&self, request: &AccessRequest) -> Option<MaskOutcome> {
            Some(match self.masked_field {
                Some((field, mask_type)) if request.resource.field.as_deref() == Some(field) => {
                    MaskOutcome {
                        mask_enabled: true,
                        mask_type: Some(mask_type.to_string()),
                        masked_value: None,
                        policy_id: Some(2),
                    }
                }
                _ => MaskOutcome::disabled(),
            })
        }

        fn eval_row_filter_policy(&self, _request: &AccessRequest) -> Option<RowFilterOutcome> {
            Some(match self.filter {
                Some(expr) => RowFilterOutcome {
                    filter_enabled: true,
                    filter_expr: Some(expr.to_string()),
                    policy_id: Some(3),
                },
                None => RowFilterOutcome::disabled(),
            })
        }
    }

    fn authorizer(authority: FixedAuthority) -> NestedAuthorizer {
        let filter: Arc<dyn RowFilterEvaluator> = Arc::new(ExpressionFilter::new());
        NestedAuthorizer::new(Arc::new(authority), filter, &AuthorizerConfig::default())
    }

    #[test]
    fn test_masks_nested_field() {
        let authorizer = authorizer(FixedAuthority {
            masked_field: Some(("address.city", "MASK")),
            filter: None,
        });
        let result = authorizer.authorize(
            "orders",
            "alice",
            &BTreeSet::new(),
            r#"{"id":"7","address":{"city":"philadelphia"}}"#,
            AccessType::Read,
        );
        assert!(result.granted);
        assert_eq!(
            result.json.as_deref(),
            Some(r#"{"id":"7","address":{"city":"************"}}"#)
        );
    }

    #[test]
    fn test_row_filter_rejects_record() {
        let authorizer = authorizer(FixedAuthority {
            masked_field: None,
            filter: Some("owner == $user"),
        });
        let result = authorizer.authorize(
            "orders",
            "alice",
            &BTreeSet::new(),
            r#"{"owner":"bob"}"#,
            AccessType::Read,
        );
        assert!(!result.granted);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_empty_filter_expression_fails_closed() {
        let authorizer = authorizer(FixedAuthority {
            masked_field: None,
            filter: Some(""),
        });
        let result = authorizer.authorize(
            "orders",
            "alice",
            &BTreeSet::new(),
            r#"{"owner":"alice"}"#,
            AccessType::Read,
        );
        assert!(!result.granted);
        assert!(matches!(result.errors[0], AuthorizeError::RowFilter(_)));
    }

    #[test]
    fn test_masking_failure_is_reported() {
        let authorizer = authorizer(FixedAuthority {
            masked_field: Some(("count", "MASK_SHOW_LAST_4")),
            filter: None,
        });
        let result = authorizer.authorize(
            "orders",
            "alice",
            &BTreeSet::new(),
            r#"{"count":12}"#,
            AccessType::Read,
        );
        assert!(!result.granted);
        assert!(result.json.is_none());
        assert!(matches!(result.errors[0], AuthorizeError::Masking(_)));
    }

    #[test]
    fn test_authorize_request_deserializes_defaults() {
        let request: AuthorizeRequest =
            serde_json::from_str(r#"{"schema":"orders","user":"alice","json":"{\"a\":1}"}"#)
                .unwrap();
        assert_eq!(request.access_type, AccessType::Read);
        assert!(request.groups.is_empty());

        let result = authorizer(FixedAuthority {
            masked_field: None,
            filter: None,
        })
        .authorize_request(&request);
        assert!(result.granted);
        assert_eq!(result.json.as_deref(), Some(r#"{"a":1}"#));
    }
}
