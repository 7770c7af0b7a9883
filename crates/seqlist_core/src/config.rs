//! List configuration and process-wide defaults.
//!
//! # Responsibility
//! - Define the options that shape position assignment and storage access.
//! - Hold a process default for hosts that configure once at startup.
//!
//! # Invariants
//! - `position_field_name` must be a plain identifier; it is spliced into
//!   SQL and JSON keys by the repositories.
//! - Changing `start_list_at` never renumbers existing data; only new
//!   inserts observe the new base.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::RwLock;

/// Default attribute name for the position field.
pub const DEFAULT_POSITION_FIELD: &str = "position";

static FIELD_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern must compile"));

static PROCESS_DEFAULT: Lazy<RwLock<ListConfig>> = Lazy::new(|| RwLock::new(ListConfig::default()));

/// Configuration error for invalid option values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Position field name is not a plain identifier.
    InvalidFieldName(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFieldName(name) => write!(
                f,
                "position field name `{name}` must match [A-Za-z_][A-Za-z0-9_]*"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Options shaping position assignment and storage access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConfig {
    /// Base index for positions. New items in an empty scope start here.
    pub start_list_at: i64,
    /// Attribute name repositories read/write for the position value.
    ///
    /// Referenced shape: the SQL column name. Embedded shape: the JSON key
    /// inside the parent document.
    pub position_field_name: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            start_list_at: 0,
            position_field_name: DEFAULT_POSITION_FIELD.to_string(),
        }
    }
}

impl ListConfig {
    /// Validates option values that get spliced into storage access paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !FIELD_NAME_PATTERN.is_match(&self.position_field_name) {
            return Err(ConfigError::InvalidFieldName(
                self.position_field_name.clone(),
            ));
        }
        Ok(())
    }
}

/// Mutates the process-wide default configuration.
///
/// Intended for host startup; engines capture their config at construction,
/// so already-built engines keep the values they were created with.
pub fn configure(mutate: impl FnOnce(&mut ListConfig)) {
    let mut config = PROCESS_DEFAULT
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    mutate(&mut config);
}

/// Returns a snapshot of the process-wide default configuration.
pub fn current_config() -> ListConfig {
    PROCESS_DEFAULT
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ListConfig, DEFAULT_POSITION_FIELD};

    #[test]
    fn default_config_uses_zero_base_and_position_field() {
        let config = ListConfig::default();
        assert_eq!(config.start_list_at, 0);
        assert_eq!(config.position_field_name, DEFAULT_POSITION_FIELD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_accepts_identifier_names() {
        let mut config = ListConfig::default();
        config.position_field_name = "ordinal_2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_sql_splice_attempts() {
        let mut config = ListConfig::default();
        config.position_field_name = "position; DROP TABLE items".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFieldName(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let mut config = ListConfig::default();
        config.position_field_name = String::new();
        assert!(config.validate().is_err());
    }
}
