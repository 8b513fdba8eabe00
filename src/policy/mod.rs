//! Policy module
//!
//! Defines the questions the authorizer asks a policy authority and ships a
//! config-driven authority.
//!
//! ## Resources
//!
//! Every decision is about a [`Resource`]: a schema, or one field within a
//! schema. Fields are named by their normalized path with interior array
//! wildcards collapsed, so `items.*.sku` is asked about as `items.sku`.
//! Catalog systems write the pair as a qualified name, `schema#field`.
//!
//! ## Example Configuration
//!
//! ```toml
//! [[policy.access]]
//! id = 1
//! schema = "json_object\\.foo\\..*"
//! users = ["someuser"]
//!
//! [[policy.access]]
//! id = 2
//! schema = "json_object\\.foo\\..*"
//! fields = ["ssn"]
//! effect = "deny"
//!
//! [[policy.masks]]
//! id = 10
//! schema = "json_object\\.foo\\..*"
//! fields = ["address\\.city"]
//! mask_type = "MASK"
//! ```

pub mod authority;
pub mod patterns;
pub mod resolver;
pub mod types;

pub use authority::{PolicyAuthority, SharedAuthority};
pub use patterns::PatternMatcher;
pub use resolver::ConfigAuthority;
pub use types::{
    AccessOutcome, AccessRequest, AccessType, MatchingScope, MaskOutcome, Resource,
    RowFilterOutcome,
};
