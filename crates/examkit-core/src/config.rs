//! examkit configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::ExamMode;

/// Top-level examkit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamkitConfig {
    /// Where session history is stored.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Mode used when the command line does not pick one.
    #[serde(default)]
    pub default_mode: ExamMode,
    /// Question count used when neither a count nor a preset is given.
    #[serde(default = "default_count")]
    pub default_count: usize,
    /// Session length used when no duration is given.
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u64,
    /// Time presets offered to the user.
    #[serde(default = "default_presets")]
    pub presets: Vec<TimePreset>,
}

/// A session length paired with its question count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePreset {
    pub minutes: u64,
    pub questions: usize,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("./examkit-history.json")
}
fn default_count() -> usize {
    30
}
fn default_duration_minutes() -> u64 {
    45
}
fn default_presets() -> Vec<TimePreset> {
    [(15, 10), (30, 20), (45, 30), (60, 40), (90, 50)]
        .into_iter()
        .map(|(minutes, questions)| TimePreset { minutes, questions })
        .collect()
}

impl Default for ExamkitConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            default_mode: ExamMode::default(),
            default_count: default_count(),
            default_duration_minutes: default_duration_minutes(),
            presets: default_presets(),
        }
    }
}

impl ExamkitConfig {
    /// Question count for a time preset, if one is defined.
    pub fn preset_count(&self, minutes: u64) -> Option<usize> {
        self.presets
            .iter()
            .find(|preset| preset.minutes == minutes)
            .map(|preset| preset.questions)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.default_count == 0 {
            anyhow::bail!("default_count must be positive");
        }
        if self.default_duration_minutes == 0 {
            anyhow::bail!("default_duration_minutes must be positive");
        }
        if let Some(preset) = self
            .presets
            .iter()
            .find(|preset| preset.minutes == 0 || preset.questions == 0)
        {
            anyhow::bail!(
                "preset {} min → {} questions must have a positive duration and count",
                preset.minutes,
                preset.questions
            );
        }
        for (i, preset) in self.presets.iter().enumerate() {
            if self.presets[..i].iter().any(|p| p.minutes == preset.minutes) {
                anyhow::bail!("preset for {} minutes is defined twice", preset.minutes);
            }
        }
        if self.history_path.as_os_str().is_empty() {
            anyhow::bail!("history_path must not be empty");
        }
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables expand to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        from = start + value.len();
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examkit.toml` in the current directory
/// 2. `~/.config/examkit/config.toml`
///
/// `EXAMKIT_HISTORY` overrides the history path.
pub fn load_config() -> Result<ExamkitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamkitConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("examkit.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamkitConfig::default(),
    };

    if let Ok(history) = std::env::var("EXAMKIT_HISTORY") {
        if !history.trim().is_empty() {
            config.history_path = PathBuf::from(history);
        }
    }

    let expanded = resolve_env_vars(&config.history_path.to_string_lossy());
    config.history_path = PathBuf::from(expanded);

    config.validate().with_context(|| match &config_path {
        Some(path) => format!("invalid config: {}", path.display()),
        None => "invalid config".to_string(),
    })?;

    tracing::debug!(
        source = ?config_path,
        history = %config.history_path.display(),
        "loaded config"
    );
    Ok(config)
}

/// Parse a TOML config document.
pub fn parse_config(content: &str) -> Result<ExamkitConfig> {
    Ok(toml::from_str(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examkit"))
}

/// Starter config written by `examkit init`.
pub const STARTER_CONFIG: &str = r#"# examkit configuration

# Where finished sessions are recorded. ${VAR} references are expanded.
history_path = "./examkit-history.json"

# "Standard" (50/30/20 ratio) or "Custom" (free filter).
default_mode = "Standard"
default_count = 30
default_duration_minutes = 45

# Session length in minutes and the number of questions it offers.
[[presets]]
minutes = 15
questions = 10

[[presets]]
minutes = 30
questions = 20

[[presets]]
minutes = 45
questions = 30

[[presets]]
minutes = 60
questions = 40

[[presets]]
minutes = 90
questions = 50
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMKIT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_EXAMKIT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_EXAMKIT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_EXAMKIT_UNSET_VAR}/h.json"), "/h.json");
        assert_eq!(resolve_env_vars("no refs"), "no refs");
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_EXAMKIT_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ExamkitConfig::default();
        assert_eq!(config.default_mode, ExamMode::Standard);
        assert_eq!(config.default_count, 30);
        assert_eq!(config.default_duration_minutes, 45);
        assert_eq!(config.preset_count(60), Some(40));
        assert_eq!(config.preset_count(20), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn starter_config_matches_defaults() {
        let parsed = parse_config(STARTER_CONFIG).unwrap();
        assert_eq!(parsed, ExamkitConfig::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config = parse_config(
            r#"
default_mode = "Custom"

[[presets]]
minutes = 20
questions = 12
"#,
        )
        .unwrap();
        assert_eq!(config.default_mode, ExamMode::Custom);
        assert_eq!(config.default_count, 30);
        assert_eq!(config.presets.len(), 1);
        assert_eq!(config.preset_count(20), Some(12));
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut config = ExamkitConfig {
            default_count: 0,
            ..ExamkitConfig::default()
        };
        assert!(config.validate().is_err());

        config.default_count = 10;
        config.presets.push(TimePreset {
            minutes: 5,
            questions: 0,
        });
        assert!(config.validate().is_err());

        config.presets.pop();
        config.presets.push(TimePreset {
            minutes: 15,
            questions: 8,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = load_config_from(Some(Path::new("/nonexistent/examkit.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examkit.toml");
        std::fs::write(&path, "default_count = 12\ndefault_duration_minutes = 20\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.default_count, 12);
        assert_eq!(config.default_duration_minutes, 20);
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "default_count = 0\n").unwrap();
        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }
}
