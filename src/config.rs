//! Configuration loading from pdep.toml.
//!
//! Search order mirrors other project-local tools:
//! - `pdep.toml` in the working directory
//! - `pdep.toml` in any parent directory (nearest wins)
//! - built-in defaults
//!
//! ## Example
//!
//! ```toml
//! [surface]
//! row-ceiling = 30000
//! random-seed = 42
//! grid-policy = "even-width"
//! scoring-timeout-secs = 600
//!
//! [scorer]
//! command = "batch_scoring"
//! host = "https://app.example.com"
//! user = "analyst@example.com"
//! api-token = "..."
//! api-key = "..."
//! project-id = "5e3a329379dd6b7602771631"
//! model-id = "5e3a3b2c75b241123ea3516f"
//! ```
//!
//! Scorer credentials live only in the [`ScorerConfig`] value handed to the
//! scorer's constructor; nothing is stashed in process-wide state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::{PdError, PdResult};
use crate::sweep::{DEFAULT_ROW_CEILING, GridPolicy};

/// File name looked up in the working directory and its parents.
pub const CONFIG_FILE_NAME: &str = "pdep.toml";

/// Default bound on a single scoring call.
pub const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(600);

/// Knobs for one surface computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    /// Total synthetic rows to aim for.
    pub row_ceiling: usize,
    /// Pinned sampling seed. `None` draws a fresh one per computation.
    pub random_seed: Option<u64>,
    /// Reduction for columns with more than 25 distinct values.
    pub grid_policy: GridPolicy,
    /// Bound on the scoring call. `None` waits indefinitely.
    pub scoring_timeout: Option<Duration>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            row_ceiling: DEFAULT_ROW_CEILING,
            random_seed: None,
            grid_policy: GridPolicy::default(),
            scoring_timeout: Some(DEFAULT_SCORING_TIMEOUT),
        }
    }
}

impl SurfaceConfig {
    pub fn validate(&self) -> PdResult<()> {
        if self.row_ceiling == 0 {
            return Err(PdError::config("row ceiling must be at least 1"));
        }
        if self.scoring_timeout == Some(Duration::ZERO) {
            return Err(PdError::config("scoring timeout must be positive"));
        }
        Ok(())
    }
}

/// Connection settings for the batch-scoring bridge.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScorerConfig {
    /// Executable to run.
    pub command: String,
    pub host: String,
    pub user: String,
    pub api_token: String,
    pub api_key: String,
    pub project_id: String,
    pub model_id: String,
    /// Output column holding the positive-class probability.
    pub positive_column: String,
    /// Output column holding the point estimate.
    pub prediction_column: String,
    /// Arguments placed before the generated ones (a script path, a subcommand).
    pub extra_args: Vec<String>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            command: "batch_scoring".to_string(),
            host: String::new(),
            user: String::new(),
            api_token: String::new(),
            api_key: String::new(),
            project_id: String::new(),
            model_id: String::new(),
            positive_column: "true".to_string(),
            prediction_column: "prediction".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl ScorerConfig {
    /// Fields the bridge cannot run without.
    pub fn validate(&self) -> PdResult<()> {
        let required = [
            ("command", &self.command),
            ("host", &self.host),
            ("project-id", &self.project_id),
            ("model-id", &self.model_id),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(PdError::config(format!(
                "scorer configuration is missing: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

// Credentials stay out of logs and panic messages.
impl fmt::Debug for ScorerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScorerConfig")
            .field("command", &self.command)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("api_token", &redact(&self.api_token))
            .field("api_key", &redact(&self.api_key))
            .field("project_id", &self.project_id)
            .field("model_id", &self.model_id)
            .field("positive_column", &self.positive_column)
            .field("prediction_column", &self.prediction_column)
            .field("extra_args", &self.extra_args)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "***" }
}

/// Full pdep configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Source file for this config (for display).
    pub source: Option<PathBuf>,
    pub surface: SurfaceConfig,
    pub scorer: ScorerConfig,
}

/// Raw config as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    surface: Option<RawSurface>,
    scorer: Option<ScorerConfig>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawSurface {
    row_ceiling: Option<usize>,
    random_seed: Option<u64>,
    grid_policy: Option<GridPolicy>,
    /// 0 disables the bound.
    scoring_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration for the given directory.
    ///
    /// Walks up from `directory` to the nearest `pdep.toml`. A file that
    /// fails to parse is reported and skipped; defaults apply when nothing
    /// usable is found.
    pub fn load(directory: &Path) -> Self {
        let mut current = Some(directory.to_path_buf());
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                match Self::from_path(&candidate) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("ignoring {}: {:#}", candidate.display(), e),
                }
            }
            current = dir.parent().map(Path::to_path_buf);
        }

        Self::default()
    }

    /// Load an explicit config file; errors if it is missing or malformed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            ..config
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let config = Self::from_raw(raw);
        config.surface.validate()?;
        Ok(config)
    }

    fn from_raw(raw: RawConfig) -> Self {
        let defaults = SurfaceConfig::default();
        let surface = raw.surface.unwrap_or_default();
        Self {
            source: None,
            surface: SurfaceConfig {
                row_ceiling: surface.row_ceiling.unwrap_or(defaults.row_ceiling),
                random_seed: surface.random_seed,
                grid_policy: surface.grid_policy.unwrap_or(defaults.grid_policy),
                scoring_timeout: match surface.scoring_timeout_secs {
                    Some(0) => None,
                    Some(secs) => Some(Duration::from_secs(secs)),
                    None => defaults.scoring_timeout,
                },
            },
            scorer: raw.scorer.unwrap_or_default(),
        }
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        if let Some(ref source) = self.source {
            lines.push(format!("   Config: {}", source.display()));
        } else {
            lines.push("   Config: (defaults)".to_string());
        }

        let s = &self.surface;
        lines.push(format!("   Row ceiling: {}", s.row_ceiling));
        lines.push(format!("   Grid policy: {}", s.grid_policy));
        match s.random_seed {
            Some(seed) => lines.push(format!("   Seed: {} (pinned)", seed)),
            None => lines.push("   Seed: (fresh per run)".to_string()),
        }
        match s.scoring_timeout {
            Some(t) => lines.push(format!("   Scoring timeout: {}s", t.as_secs())),
            None => lines.push("   Scoring timeout: none".to_string()),
        }

        if !self.scorer.host.is_empty() {
            lines.push(format!(
                "   Scorer: {} @ {} (project {}, model {})",
                self.scorer.command, self.scorer.host, self.scorer.project_id, self.scorer.model_id
            ));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.surface.row_ceiling, 30_000);
        assert_eq!(config.surface.grid_policy, GridPolicy::EvenWidth);
        assert_eq!(config.surface.scoring_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.scorer.command, "batch_scoring");
        assert_eq!(config.scorer.positive_column, "true");
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::from_toml_str(
            r#"
            [surface]
            row-ceiling = 5000
            random-seed = 7
            grid-policy = "truncate"
            scoring-timeout-secs = 0

            [scorer]
            host = "https://scoring.example.com"
            user = "me"
            api-token = "secret"
            project-id = "p1"
            model-id = "m1"
            "#,
        )
        .unwrap();

        assert_eq!(config.surface.row_ceiling, 5000);
        assert_eq!(config.surface.random_seed, Some(7));
        assert_eq!(config.surface.grid_policy, GridPolicy::Truncate);
        assert_eq!(config.surface.scoring_timeout, None);
        assert_eq!(config.scorer.host, "https://scoring.example.com");
        assert_eq!(config.scorer.command, "batch_scoring");
        assert!(config.scorer.validate().is_ok());
        assert!(!format!("{:?}", config.scorer).contains("secret"));
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let err = Config::from_toml_str("[surface]\nrow-ceiling = 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("row ceiling"));
    }

    #[test]
    fn test_scorer_validation_names_missing_fields() {
        let err = ScorerConfig::default().validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("host"));
        assert!(msg.contains("project-id"));
        assert!(msg.contains("model-id"));
    }

    #[test]
    fn test_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[surface]\nrow-ceiling = 1234\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::load(&nested);
        assert_eq!(config.surface.row_ceiling, 1234);
        assert_eq!(config.source, Some(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path());
        assert_eq!(config.surface.row_ceiling, DEFAULT_ROW_CEILING);
    }
}
