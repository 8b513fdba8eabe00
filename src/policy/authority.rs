//! Policy authority trait
//!
//! The authority decides who may see what. The authorizer only asks it
//! questions and never caches the answers.

use crate::policy::types::{
    AccessOutcome, AccessRequest, MatchingScope, MaskOutcome, RowFilterOutcome,
};
use std::sync::Arc;

/// Source of access, masking and row filter decisions
///
/// Implementations must be safe to query from several threads at once.
/// Returning `None` means the authority could not produce an answer at all,
/// which the authorizer treats as a failure of the whole request.
pub trait PolicyAuthority: Send + Sync {
    /// Whether `request` is allowed
    fn is_access_allowed(
        &self,
        request: &AccessRequest,
        scope: MatchingScope,
    ) -> Option<AccessOutcome>;

    /// Masking to apply to the field named by `request`
    fn eval_mask_policy(&self, request: &AccessRequest) -> Option<MaskOutcome>;

    /// Row filter to apply to records of the schema named by `request`
    fn eval_row_filter_policy(&self, request: &AccessRequest) -> Option<RowFilterOutcome>;
}

/// Shared handle to an authority
pub type SharedAuthority = Arc<dyn PolicyAuthority>;
