//! Configuration types for nestguard
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::policy::AccessType;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Orchestration settings
    pub authorizer: AuthorizerConfig,

    /// Policies served by the built-in authority
    pub policy: PolicyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Orchestration settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthorizerConfig {
    /// Query field decisions on the rayon pool
    pub parallel: bool,

    /// Minimum number of fields before decisions are fanned out
    pub parallel_threshold: usize,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 16,
        }
    }
}

/// Policies for the config-driven authority
///
/// Access policies are combined with deny-overrides. Mask and row filter
/// policies are evaluated in declaration order and the first match wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Schema and field access policies
    pub access: Vec<AccessPolicyConfig>,

    /// Field masking policies
    pub masks: Vec<MaskPolicyConfig>,

    /// Record-level filter policies
    pub row_filters: Vec<RowFilterPolicyConfig>,
}

/// Whether a matching access policy grants or refuses access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    #[default]
    Allow,
    Deny,
}

/// Access policy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessPolicyConfig {
    /// Policy id reported with every decision it makes
    pub id: i64,

    /// Schema regex (whole-name match)
    pub schema: String,

    /// Field regexes (whole-name match); empty covers every field
    pub fields: Vec<String>,

    /// User names; with `groups`, empty covers everyone
    pub users: Vec<String>,

    /// Group names
    pub groups: Vec<String>,

    /// Access types covered; empty covers all
    pub access_types: Vec<AccessType>,

    pub effect: PolicyEffect,
}

/// Mask policy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MaskPolicyConfig {
    pub id: i64,
    pub schema: String,
    pub fields: Vec<String>,
    pub users: Vec<String>,
    pub groups: Vec<String>,
    pub access_types: Vec<AccessType>,

    /// Mask directive, e.g. `MASK` or `MASK_SHOW_LAST_4`
    pub mask_type: String,

    /// Replacement used by `CUSTOM`
    pub value: Option<String>,
}

/// Row filter policy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RowFilterPolicyConfig {
    pub id: i64,
    pub schema: String,
    pub users: Vec<String>,
    pub groups: Vec<String>,
    pub access_types: Vec<AccessType>,

    /// Filter expression, e.g. `partner == $user`
    pub filter: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
