//! Config-driven policy authority
//!
//! Resolves requests against the policies declared under `[policy]`:
//! 1. Access: any matching deny policy wins, then any matching allow policy.
//!    With no match the request is undetermined.
//! 2. Masks: the first matching mask policy, in declaration order.
//! 3. Row filters: the first matching row filter policy, in declaration order.
//!
//! A policy matches when its schema pattern matches the resource schema, its
//! field patterns (if any) match the resource field, the requesting user or one
//! of their groups is listed (or both lists are empty), and the access type is
//! listed (or the list is empty).

use crate::config::{
    AccessPolicyConfig, MaskPolicyConfig, PolicyConfig, PolicyEffect, RowFilterPolicyConfig,
};
use crate::error::ConfigError;
use crate::policy::authority::PolicyAuthority;
use crate::policy::patterns::PatternMatcher;
use crate::policy::types::{
    AccessOutcome, AccessRequest, AccessType, MatchingScope, MaskOutcome, Resource,
    RowFilterOutcome,
};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Policy authority backed by configuration
pub struct ConfigAuthority {
    /// Access policies, in declaration order
    access: Vec<CompiledAccessPolicy>,
    /// Mask policies, in declaration order
    masks: Vec<CompiledMaskPolicy>,
    /// Row filter policies, in declaration order
    row_filters: Vec<CompiledRowFilterPolicy>,
}

/// Who and what a policy applies to
struct PolicyTarget {
    schema: PatternMatcher,
    fields: PatternMatcher,
    users: HashSet<String>,
    groups: HashSet<String>,
    access_types: Vec<AccessType>,
}

struct CompiledAccessPolicy {
    id: i64,
    target: PolicyTarget,
    effect: PolicyEffect,
}

struct CompiledMaskPolicy {
    id: i64,
    target: PolicyTarget,
    mask_type: String,
    value: Option<String>,
}

struct CompiledRowFilterPolicy {
    id: i64,
    target: PolicyTarget,
    filter: String,
}

impl PolicyTarget {
    fn compile(
        schema: &str,
        fields: &[String],
        users: &[String],
        groups: &[String],
        access_types: &[AccessType],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            schema: PatternMatcher::new(&[schema.to_string()])?,
            fields: PatternMatcher::new(fields)?,
            users: users.iter().cloned().collect(),
            groups: groups.iter().cloned().collect(),
            access_types: access_types.to_vec(),
        })
    }

    /// Whether the principal and access type of `request` are covered
    fn covers_principal(&self, request: &AccessRequest) -> bool {
        let access_ok =
            self.access_types.is_empty() || self.access_types.contains(&request.access_type);
        let everyone = self.users.is_empty() && self.groups.is_empty();
        let principal_ok = everyone
            || self.users.contains(&request.user)
            || request.groups.iter().any(|g| self.groups.contains(g));
        access_ok && principal_ok
    }

    /// Whether `resource` is covered
    fn covers_resource(&self, resource: &Resource, scope: MatchingScope) -> bool {
        if !self.schema.matches(&resource.schema) {
            return false;
        }
        match (&resource.field, scope) {
            (Some(field), _) => self.fields.is_empty() || self.fields.matches(field),
            (None, MatchingScope::SelfOnly) => self.fields.is_empty(),
            (None, MatchingScope::SelfOrDescendants) => true,
        }
    }
}

impl ConfigAuthority {
    /// Create a new authority from configuration
    pub fn new(config: &PolicyConfig) -> Result<Self, ConfigError> {
        let access = config
            .access
            .iter()
            .map(Self::compile_access)
            .collect::<Result<Vec<_>, _>>()?;
        let masks = config
            .masks
            .iter()
            .map(Self::compile_mask)
            .collect::<Result<Vec<_>, _>>()?;
        let row_filters = config
            .row_filters
            .iter()
            .map(Self::compile_row_filter)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            access = access.len(),
            masks = masks.len(),
            row_filters = row_filters.len(),
            "Compiled policies"
        );

        Ok(Self {
            access,
            masks,
            row_filters,
        })
    }

    fn compile_access(config: &AccessPolicyConfig) -> Result<CompiledAccessPolicy, ConfigError> {
        Ok(CompiledAccessPolicy {
            id: config.id,
            target: PolicyTarget::compile(
                &config.schema,
                &config.fields,
                &config.users,
                &config.groups,
                &config.access_types,
            )?,
            effect: config.effect,
        })
    }

    fn compile_mask(config: &MaskPolicyConfig) -> Result<CompiledMaskPolicy, ConfigError> {
        Ok(CompiledMaskPolicy {
            id: config.id,
            target: PolicyTarget::compile(
                &config.schema,
                &config.fields,
                &config.users,
                &config.groups,
                &config.access_types,
            )?,
            mask_type: config.mask_type.clone(),
            value: config.value.clone(),
        })
    }

    fn compile_row_filter(
        config: &RowFilterPolicyConfig,
    ) -> Result<CompiledRowFilterPolicy, ConfigError> {
        Ok(CompiledRowFilterPolicy {
            id: config.id,
            target: PolicyTarget::compile(
                &config.schema,
                &[],
                &config.users,
                &config.groups,
                &config.access_types,
            )?,
            filter: config.filter.clone(),
        })
    }

    /// Resolve an access request without going through the trait
    pub fn check(&self, request: &AccessRequest, scope: MatchingScope) -> AccessOutcome {
        let candidates = || {
            self.access
                .iter()
                .filter(|p| p.target.covers_principal(request))
        };

        // A field-level deny does not deny the schema as a whole
        if let Some(policy) = candidates().find(|p| {
            p.effect == PolicyEffect::Deny
                && p.target
                    .covers_resource(&request.resource, MatchingScope::SelfOnly)
        }) {
            trace!(policy = policy.id, resource = %request.resource, "Matched deny policy");
            return AccessOutcome::denied(policy.id);
        }

        if let Some(policy) = candidates().find(|p| {
            p.effect == PolicyEffect::Allow && p.target.covers_resource(&request.resource, scope)
        }) {
            trace!(policy = policy.id, resource = %request.resource, "Matched allow policy");
            return AccessOutcome::allowed(policy.id);
        }

        trace!(resource = %request.resource, "No access policy matched");
        AccessOutcome::undetermined()
    }

    /// Create a permissive authority that allows everything without masking
    pub fn allow_all() -> Result<Self, ConfigError> {
        Self::new(&PolicyConfig {
            access: vec![AccessPolicyConfig {
                id: 0,
                schema: ".*".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    /// Create a restrictive authority that determines nothing
    pub fn deny_all() -> Self {
        Self {
            access: Vec::new(),
            masks: Vec::new(),
            row_filters: Vec::new(),
        }
    }
}

impl PolicyAuthority for ConfigAuthority {
    fn is_access_allowed(
        &self,
        request: &AccessRequest,
        scope: MatchingScope,
    ) -> Option<AccessOutcome> {
        Some(self.check(request, scope))
    }

    fn eval_mask_policy(&self, request: &AccessRequest) -> Option<MaskOutcome> {
        if request.resource.field.is_none() {
            return Some(MaskOutcome::disabled());
        }
        let outcome = self
            .masks
            .iter()
            .find(|p| {
                p.target.covers_principal(request)
                    && p.target
                        .covers_resource(&request.resource, MatchingScope::SelfOnly)
            })
            .map(|p| MaskOutcome {
                mask_enabled: true,
                mask_type: Some(p.mask_type.clone()),
                masked_value: p.value.clone(),
                policy_id: Some(p.id),
            })
            .unwrap_or_default();
        Some(outcome)
    }

    fn eval_row_filter_policy(&self, request: &AccessRequest) -> Option<RowFilterOutcome> {
        let outcome = self
            .row_filters
            .iter()
            .find(|p| {
                p.target.covers_principal(request)
                    && p.target.schema.matches(&request.resource.schema)
            })
            .map(|p| RowFilterOutcome {
                filter_enabled: true,
                filter_expr: Some(p.filter.clone()),
                policy_id: Some(p.id),
            })
            .unwrap_or_default();
        Some(outcome)
    }
}
