//! Documented configuration files.
//!
//! A config written by [`DocumentedConfig::save_with_documentation`] has one
//! `key = value  # description` line per field. Optional fields that are unset are
//! written commented out with the value they fall back to, so the file doubles as
//! reference documentation.
//!
//! Fields with `#[serde(default)]` are always populated when loading, so only
//! `Option<T>` fields can be absent.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::paths;
use crate::emmc::{OrchestratorConfig, RetryPolicy};

/// Metadata about a configuration field
#[derive(Debug, Clone)]
pub struct ConfigFieldMeta {
    pub name: &'static str,
    /// TOML-serialized default value, or None if serialization failed
    pub default_value: Option<String>,
    pub description: &'static str,
    pub is_optional: bool,
}

/// Implemented by the `documented_config!` macro.
pub trait DocumentedConfig: Sized + Default {
    fn field_metadata() -> Vec<ConfigFieldMeta>;

    fn is_optional_field_set(&self, field_name: &str) -> bool;

    /// TOML-serialized value of one field
    fn get_field_value(&self, field_name: &str) -> String;

    /// Where the config lives when no explicit path is given
    fn config_path() -> Result<PathBuf>;

    fn to_documented_string(&self) -> String {
        let mut output = String::new();
        for field in Self::field_metadata() {
            if field.is_optional && !self.is_optional_field_set(field.name) {
                let Some(default_val) = &field.default_value else {
                    continue;
                };
                output.push_str(&format!(
                    "# {} = {}  # {}\n",
                    field.name, default_val, field.description
                ));
            } else {
                output.push_str(&format!(
                    "{} = {}  # {}\n",
                    field.name,
                    self.get_field_value(field.name),
                    field.description
                ));
            }
        }
        output
    }

    fn save_with_documentation(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        fs::write(path, self.to_documented_string())
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Load from `path`; a missing file yields the defaults.
    fn load_from_path(path: &Path) -> Result<Self>
    where
        for<'de> Self: Deserialize<'de>,
    {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config at {}", path.display()))
    }
}

macro_rules! documented_config {
    (
        $config_name:ident {
            fields: [
                $($field:ident, $desc:expr),* $(,)?
            ],
            optional: [
                $($opt_field:ident, $opt_desc:expr),* $(,)?
            ],
            config_path: $path:expr $(,)?
        }
    ) => {
        impl DocumentedConfig for $config_name {
            fn field_metadata() -> Vec<ConfigFieldMeta> {
                let default_config = Self::default();
                vec![
                    $(
                        ConfigFieldMeta {
                            name: stringify!($field),
                            default_value: toml::Value::try_from(&default_config.$field)
                                .map(|v| v.to_string())
                                .ok(),
                            description: $desc,
                            is_optional: false,
                        },
                    )*
                    $(
                        ConfigFieldMeta {
                            name: stringify!($opt_field),
                            // commented-out line shows the inner type's default
                            default_value: toml::Value::try_from(
                                &default_config.$opt_field.clone().unwrap_or_default(),
                            )
                            .map(|v| v.to_string())
                            .ok(),
                            description: $opt_desc,
                            is_optional: true,
                        },
                    )*
                ]
            }

            fn is_optional_field_set(&self, field_name: &str) -> bool {
                match field_name {
                    $(stringify!($opt_field) => self.$opt_field.is_some(),)*
                    _ => false,
                }
            }

            fn get_field_value(&self, field_name: &str) -> String {
                match field_name {
                    $(
                        stringify!($field) => toml::Value::try_from(&self.$field)
                            .map(|v| v.to_string())
                            .unwrap_or_else(|_| format!("{:?}", self.$field)),
                    )*
                    $(
                        stringify!($opt_field) => toml::Value::try_from(
                            &self.$opt_field.clone().unwrap_or_default(),
                        )
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    )*
                    _ => String::new(),
                }
            }

            fn config_path() -> Result<PathBuf> {
                $path
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmmcConfig {
    pub payload_path: PathBuf,
    pub output_dir: PathBuf,
    pub progress_interval_blocks: u64,
    pub required_partitions: Vec<String>,
    pub system_partition: String,
    pub userdata_partition: String,
    pub boot0_blocks: u64,
    pub retry_delay_ms: u64,
    pub retry_max_attempts: Option<u32>,
}

impl Default for EmmcConfig {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            payload_path: PathBuf::from("brom-payload/build/payload.bin"),
            output_dir: defaults.output_dir,
            progress_interval_blocks: defaults.progress_interval,
            required_partitions: defaults.required_partitions,
            system_partition: defaults.system_partition,
            userdata_partition: defaults.userdata_partition,
            boot0_blocks: 0x2000,
            retry_delay_ms: 0,
            retry_max_attempts: None,
        }
    }
}

documented_config!(EmmcConfig {
    fields: [
        payload_path, "Payload uploaded after the handshake",
        output_dir, "Directory extracted images are written to",
        progress_interval_blocks, "Blocks between progress updates",
        required_partitions, "Partitions a healthy table must contain",
        system_partition, "Partition dumped for the system selection",
        userdata_partition, "Partition dumped for the userdata selection",
        boot0_blocks, "Blocks of the boot region written to boot0.bin",
        retry_delay_ms, "Pause between handshake attempts in milliseconds",
    ],
    optional: [
        retry_max_attempts, "Give up after this many handshake attempts (unset retries forever)",
    ],
    config_path: paths::config_file(),
});

impl EmmcConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::unbounded();
        if let Some(attempts) = self.retry_max_attempts {
            policy = policy.with_max_attempts(attempts);
        }
        if self.retry_delay_ms > 0 {
            policy = policy.with_delay(Duration::from_millis(self.retry_delay_ms));
        }
        policy
    }

    pub fn read_payload(&self) -> Result<Vec<u8>> {
        fs::read(&self.payload_path)
            .with_context(|| format!("reading payload from {}", self.payload_path.display()))
    }

    /// Session settings for a run using `payload`.
    pub fn orchestrator_config(&self, payload: Vec<u8>) -> OrchestratorConfig {
        OrchestratorConfig {
            payload,
            output_dir: self.output_dir.clone(),
            required_partitions: self.required_partitions.clone(),
            system_partition: self.system_partition.clone(),
            userdata_partition: self.userdata_partition.clone(),
            retry: self.retry_policy(),
            progress_interval: self.progress_interval_blocks,
        }
    }
}

/// Load the config from `explicit` or the default location.
///
/// Returns the config and the path it was looked up at.
pub fn load_config(explicit: Option<&Path>) -> Result<(EmmcConfig, PathBuf)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => EmmcConfig::config_path()?,
    };
    let config = EmmcConfig::load_from_path(&path)?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = load_config(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config, EmmcConfig::default());
        assert_eq!(path, dir.path().join("absent.toml"));
        assert_eq!(config.progress_interval_blocks, 40);
        assert_eq!(config.required_partitions, ["lk_a", "tee1", "boot_a", "misc"]);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emmctool.toml");
        fs::write(
            &path,
            "output_dir = \"/tmp/dumps\"\nretry_max_attempts = 5\nretry_delay_ms = 250\n",
        )
        .unwrap();

        let (config, _) = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/dumps"));
        assert_eq!(config.system_partition, "system_a");

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, Some(5));
        assert_eq!(policy.delay, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emmctool.toml");
        fs::write(&path, "boot0_blocks = \"lots\"\n").unwrap();

        let err = load_config(Some(path.as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }

    #[test]
    fn test_documented_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("emmctool.toml");
        EmmcConfig::default().save_with_documentation(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("progress_interval_blocks = 40  # Blocks between progress updates"));
        // unset optional field stays commented out
        assert!(contents.contains("# retry_max_attempts = 0  #"));

        let (config, _) = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config, EmmcConfig::default());
    }

    #[test]
    fn test_set_optional_field_is_written_uncommented() {
        let config = EmmcConfig {
            retry_max_attempts: Some(3),
            ..EmmcConfig::default()
        };
        let text = config.to_documented_string();
        assert!(text.lines().any(|l| l.starts_with("retry_max_attempts = 3")));

        let parsed: EmmcConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_orchestrator_config_carries_settings() {
        let config = EmmcConfig {
            progress_interval_blocks: 8,
            userdata_partition: "data".to_string(),
            ..EmmcConfig::default()
        };
        let session = config.orchestrator_config(vec![1, 2, 3]);
        assert_eq!(session.payload, vec![1, 2, 3]);
        assert_eq!(session.progress_interval, 8);
        assert_eq!(session.userdata_partition, "data");
        assert_eq!(session.retry, RetryPolicy::unbounded());
    }
}
