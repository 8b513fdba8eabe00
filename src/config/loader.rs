//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (NESTGUARD__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::AppConfig;
use crate::error::ConfigError;
use crate::filter::Expr;
use crate::masking::MaskType;
use crate::policy::patterns::compile_anchored;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "nestguard.toml",
    ".nestguard.toml",
    "~/.config/nestguard/config.toml",
    "/etc/nestguard/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        let expanded = shellexpand::tilde(path);
        if !Path::new(expanded.as_ref()).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with NESTGUARD prefix
    // e.g., NESTGUARD__LOGGING__LEVEL, NESTGUARD__AUTHORIZER__PARALLEL
    // Double underscore (__) maps to nested keys (logging.level)
    builder = builder.add_source(
        Environment::with_prefix("NESTGUARD")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.authorizer.parallel_threshold == 0 {
        return Err(ConfigError::Invalid {
            message: "authorizer.parallel_threshold must be greater than 0".to_string(),
        });
    }

    for (i, policy) in config.policy.access.iter().enumerate() {
        let at = format!("policy.access[{}]", i);
        require_schema(&policy.schema, &at)?;
        validate_patterns(std::slice::from_ref(&policy.schema), &at)?;
        validate_patterns(&policy.fields, &at)?;
    }

    for (i, policy) in config.policy.masks.iter().enumerate() {
        let at = format!("policy.masks[{}]", i);
        require_schema(&policy.schema, &at)?;
        validate_patterns(std::slice::from_ref(&policy.schema), &at)?;
        validate_patterns(&policy.fields, &at)?;
        if MaskType::try_parse(&policy.mask_type).is_none() {
            return Err(ConfigError::Invalid {
                message: format!("{}.mask_type: unknown mask type '{}'", at, policy.mask_type),
            });
        }
    }

    for (i, policy) in config.policy.row_filters.iter().enumerate() {
        let at = format!("policy.row_filters[{}]", i);
        require_schema(&policy.schema, &at)?;
        validate_patterns(std::slice::from_ref(&policy.schema), &at)?;
        if policy.filter.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: format!("{}.filter", at),
            });
        }
        if let Err(e) = Expr::parse(&policy.filter) {
            return Err(ConfigError::Invalid {
                message: format!("{}.filter: {}", at, e),
            });
        }
    }

    Ok(())
}

fn require_schema(schema: &str, field_path: &str) -> Result<(), ConfigError> {
    if schema.is_empty() {
        return Err(ConfigError::Missing {
            field: format!("{}.schema", field_path),
        });
    }
    Ok(())
}

/// Validate that all patterns are valid regex
fn validate_patterns(patterns: &[String], field_path: &str) -> Result<(), ConfigError> {
    for pattern in patterns {
        if let Err(ConfigError::InvalidPattern { reason, .. }) = compile_anchored(pattern) {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: format!("in {}: {}", field_path, reason),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{AccessPolicyConfig, PolicyConfig};

    #[test]
    fn test_load_config_from_str_basic() {
        let toml = r#"
[authorizer]
parallel = false

[logging]
level = "debug"

[[policy.access]]
id = 1
schema = "orders"
users = ["alice"]
"#;

        let config = load_config_from_str(toml).unwrap();
        assert!(!config.authorizer.parallel);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.policy.access.len(), 1);
        assert_eq!(config.policy.access[0].users, vec!["alice"]);
    }

    #[test]
    fn test_invalid_regex_pattern() {
        let config = AppConfig {
            policy: PolicyConfig {
                access: vec![AccessPolicyConfig {
                    schema: "orders".to_string(),
                    fields: vec!["[invalid".to_string()],
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        };

        let result = validate_config(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_missing_schema_error() {
        let toml = r#"
[[policy.access]]
id = 1
fields = ["foo"]
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::Missing { .. }));
    }

    #[test]
    fn test_unknown_mask_type_error() {
        let toml = r#"
[[policy.masks]]
id = 1
schema = "orders"
mask_type = "MASK_EVERYTHING"
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_zero_threshold_error() {
        let toml = r#"
[authorizer]
parallel_threshold = 0
"#;

        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn test_empty_filter_error() {
        let toml = r#"
[[policy.row_filters]]
id = 1
schema = "orders"
filter = "  "
"#;

        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn test_malformed_filter_error() {
        let toml = r#"
[[policy.row_filters]]
id = 1
schema = "orders"
filter = "owner == "
"#;

        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::Invalid { .. }
        ));
    }
}
