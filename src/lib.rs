//! nestguard
//!
//! Field-level access control and masking for nested JSON records.
//!
//! ## Features
//!
//! - **Schema and row gating** before any field is looked at
//! - **Field discovery** over arbitrary JSON, with array elements collapsed into one field
//! - **All-or-nothing field access**: one denied field denies the whole record
//! - **Masking** of strings, numbers and booleans (redaction, hashing, partial reveal, year-only dates)
//! - **Pluggable policy authority**, with a config-driven one built in
//! - **Flexible configuration** via TOML files and environment variables
//!
//! ## Decision Model
//!
//! ```text
//! schema gate → row filter → fields → per-field access + mask → masked record
//! ```
//!
//! Field names sent to the authority collapse `.*.` into `.`, so both
//! `addresses[0].city` and `addresses[1].city` are asked about as
//! `addresses.city`.
//!
//! ## Example Configuration
//!
//! ```toml
//! [authorizer]
//! parallel = true
//! parallel_threshold = 16
//!
//! [[policy.access]]
//! id = 1
//! schema = "json_object\\.foo\\..*"
//! users = ["someuser"]
//!
//! [[policy.masks]]
//! id = 10
//! schema = "json_object\\.foo\\..*"
//! fields = ["address\\.city"]
//! mask_type = "MASK"
//!
//! [[policy.row_filters]]
//! id = 20
//! schema = "json_object\\.foo\\..*"
//! filter = "owner == $user"
//! ```

pub mod authorizer;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod masking;
pub mod policy;

// Re-export main types
pub use authorizer::{AccessResult, AuthorizeRequest, NestedAuthorizer};
pub use config::{AppConfig, load_config};
pub use error::{AuthorizeError, ConfigError, MaskingError};
pub use policy::{AccessType, ConfigAuthority, PolicyAuthority};
