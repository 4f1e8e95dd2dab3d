//! Environment-style configuration for the data-lifecycle subsystem.

use std::{env, time::Duration};

/// How often the scheduled archival job runs.
pub const ARCHIVAL_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// How often the query monitor's counters are reset.
pub const MONITOR_RESET_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// How often the scheduled maintenance job runs.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Options controlling archival, cleanup and scheduling.
///
/// Read from the environment; every option has a default and a malformed
/// value falls back to it with a warning rather than failing startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Live records older than this many years qualify for archival.
    pub data_retention_years: u32,
    /// How many records each archival batch reads.
    pub archive_batch_size: usize,
    /// Archived records older than this many years qualify for cleanup.
    pub max_archive_years: u32,
    /// Whether maintenance runs perform archive cleanup. Cleanup never runs
    /// automatically unless this is enabled.
    pub cleanup_old_archives: bool,
    /// Whether the scheduler runs its jobs. Disabled by default.
    pub scheduler_enabled: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            data_retention_years: 10,
            archive_batch_size: 1000,
            max_archive_years: 20,
            cleanup_old_archives: false,
            scheduler_enabled: false,
        }
    }
}

impl LifecycleConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            data_retention_years: parse_option(
                &lookup,
                "DATA_RETENTION_YEARS",
                defaults.data_retention_years,
            ),
            archive_batch_size: parse_option(
                &lookup,
                "ARCHIVE_BATCH_SIZE",
                defaults.archive_batch_size,
            ),
            max_archive_years: parse_option(
                &lookup,
                "MAX_ARCHIVE_YEARS",
                defaults.max_archive_years,
            ),
            cleanup_old_archives: parse_bool(
                &lookup,
                "CLEANUP_OLD_ARCHIVES",
                defaults.cleanup_old_archives,
            ),
            scheduler_enabled: parse_bool(&lookup, "ENABLE_SCHEDULER", defaults.scheduler_enabled),
        }
    }
}

fn parse_option<T: std::str::FromStr + Copy + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("could not parse {name}=\"{value}\", using the default {default}");
            default
        }),
        None => default,
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    match lookup(name) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                tracing::warn!("could not parse {name}=\"{value}\", using the default {default}");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::LifecycleConfig;

    fn config_from(vars: &[(&str, &str)]) -> LifecycleConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        LifecycleConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);

        assert_eq!(config, LifecycleConfig::default());
        assert_eq!(config.data_retention_years, 10);
        assert_eq!(config.archive_batch_size, 1000);
        assert_eq!(config.max_archive_years, 20);
        assert!(!config.cleanup_old_archives);
        assert!(!config.scheduler_enabled);
    }

    #[test]
    fn set_values_override_the_defaults() {
        let config = config_from(&[
            ("DATA_RETENTION_YEARS", "5"),
            ("ARCHIVE_BATCH_SIZE", "250"),
            ("MAX_ARCHIVE_YEARS", "15"),
            ("CLEANUP_OLD_ARCHIVES", "true"),
            ("ENABLE_SCHEDULER", "1"),
        ]);

        assert_eq!(config.data_retention_years, 5);
        assert_eq!(config.archive_batch_size, 250);
        assert_eq!(config.max_archive_years, 15);
        assert!(config.cleanup_old_archives);
        assert!(config.scheduler_enabled);
    }

    #[test]
    fn malformed_values_fall_back_to_the_defaults() {
        let config = config_from(&[
            ("DATA_RETENTION_YEARS", "ten"),
            ("CLEANUP_OLD_ARCHIVES", "maybe"),
        ]);

        assert_eq!(config.data_retention_years, 10);
        assert!(!config.cleanup_old_archives);
    }
}
