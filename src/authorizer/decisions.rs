//! Per-field decisions
//!
//! Asks the authority about every discovered field, once each, and folds the
//! answers into one all-or-nothing gate. A single denied field denies the
//! record: a document with fields silently missing would reveal which paths
//! the caller is not allowed to see.

use crate::document::FieldPath;
use crate::error::{AuthorizeError, AuthorizeResult};
use crate::policy::{AccessRequest, AccessType, MatchingScope, PolicyAuthority, Resource};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// Who is asking for what
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub schema: String,
    pub user: String,
    pub groups: BTreeSet<String>,
    pub access_type: AccessType,
}

impl AccessContext {
    pub fn new(
        schema: impl Into<String>,
        user: impl Into<String>,
        groups: impl IntoIterator<Item = String>,
        access_type: AccessType,
    ) -> Self {
        Self {
            schema: schema.into(),
            user: user.into(),
            groups: groups.into_iter().collect(),
            access_type,
        }
    }

    /// Request for the schema as a whole
    pub fn schema_request(&self) -> AccessRequest {
        self.request(Resource::schema(&self.schema))
    }

    /// Request for one field of the schema
    pub fn field_request(&self, field: &FieldPath) -> AccessRequest {
        self.request(Resource::field(&self.schema, field.resource_name()))
    }

    fn request(&self, resource: Resource) -> AccessRequest {
        AccessRequest {
            resource,
            access_type: self.access_type,
            user: self.user.clone(),
            groups: self.groups.clone(),
        }
    }
}

/// The authority's verdict on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecision {
    pub field: FieldPath,
    pub has_access: bool,
    pub is_masked: bool,
    pub mask_type: Option<String>,
    pub custom_mask_value: Option<String>,
    pub mask_policy_id: Option<i64>,
}

impl FieldDecision {
    pub fn denied(field: FieldPath) -> Self {
        Self {
            field,
            has_access: false,
            is_masked: false,
            mask_type: None,
            custom_mask_value: None,
            mask_policy_id: None,
        }
    }

    /// Whether this field must be masked before the record is returned
    pub fn needs_masking(&self) -> bool {
        self.has_access && self.is_masked
    }
}

/// Decisions for every field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecisions {
    pub decisions: Vec<FieldDecision>,
    /// True only when every field is accessible
    pub granted: bool,
}

impl FieldDecisions {
    fn from_decisions(decisions: Vec<FieldDecision>) -> Self {
        let granted = decisions.iter().all(|d| d.has_access);
        Self { decisions, granted }
    }

    /// Fields that need masking
    pub fn masking_plan(&self) -> impl Iterator<Item = &FieldDecision> {
        self.decisions.iter().filter(|d| d.needs_masking())
    }

    /// Fields the caller may not see
    pub fn denied_fields(&self) -> impl Iterator<Item = &FieldPath> {
        self.decisions
            .iter()
            .filter(|d| !d.has_access)
            .map(|d| &d.field)
    }
}

/// How field queries are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    pub parallel: bool,
    /// Minimum number of fields before queries go to the rayon pool
    pub threshold: usize,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            parallel: true,
            threshold: 16,
        }
    }
}

impl FanOut {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            threshold: usize::MAX,
        }
    }

    fn use_pool(&self, fields: usize) -> bool {
        self.parallel && fields >= self.threshold.max(1)
    }
}

/// Query the authority about one field
pub fn decide_field(
    authority: &dyn PolicyAuthority,
    context: &AccessContext,
    field: &FieldPath,
) -> AuthorizeResult<FieldDecision> {
    let request = context.field_request(field);

    let access = authority
        .is_access_allowed(&request, MatchingScope::SelfOnly)
        .ok_or_else(|| AuthorizeError::decision_unavailable(request.resource.qualified_name()))?;
    let has_access = access.is_granted();

    debug!(
        access_type = %context.access_type,
        field = %field,
        resource = %request.resource,
        user = %context.user,
        has_access,
        policy_id = ?access.policy_id,
        "Checked field access"
    );

    if !has_access {
        return Ok(FieldDecision::denied(field.clone()));
    }

    let mask = authority
        .eval_mask_policy(&request)
        .ok_or_else(|| AuthorizeError::decision_unavailable(request.resource.qualified_name()))?;

    trace!(
        field = %field,
        masked = mask.mask_enabled,
        mask_type = ?mask.mask_type,
        policy_id = ?mask.policy_id,
        "Evaluated mask policy"
    );

    Ok(FieldDecision {
        field: field.clone(),
        has_access,
        is_masked: mask.mask_enabled,
        mask_type: mask.mask_type,
        custom_mask_value: mask.masked_value,
        mask_policy_id: mask.policy_id,
    })
}

/// Query the authority about every field and combine the answers.
///
/// Every query completes before the gate is evaluated. The first failure, in
/// field order, is returned.
pub fn decide_fields(
    authority: &dyn PolicyAuthority,
    context: &AccessContext,
    fields: &BTreeSet<FieldPath>,
    fan_out: FanOut,
) -> AuthorizeResult<FieldDecisions> {
    let results: Vec<AuthorizeResult<FieldDecision>> = if fan_out.use_pool(fields.len()) {
        trace!(fields = fields.len(), "Fanning out field decisions");
        let ordered: Vec<&FieldPath> = fields.iter().collect();
        ordered
            .par_iter()
            .map(|field| decide_field(authority, context, field))
            .collect()
    } else {
        fields
            .iter()
            .map(|field| decide_field(authority, context, field))
            .collect()
    };

    let decisions = results.into_iter().collect::<AuthorizeResult<Vec<_>>>()?;
    let decisions = FieldDecisions::from_decisions(decisions);

    if !decisions.granted {
        let denied: HashSet<String> = decisions.denied_fields().map(ToString::to_string).collect();
        debug!(denied = ?denied, "Record denied by field policy");
    }

    Ok(decisions)
}
