use crate::page::window::WindowProbe;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

/// Environment override for [`PaginationConfig::query_timeout_ms`].
pub const TIMEOUT_ENV: &str = "QUILL_QUERY_TIMEOUT_MS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used by front ends when the caller gives no count.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Largest `first`/`last`/window side the engine accepts.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Per-call deadline in milliseconds; `0` disables it.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Run the two window side reads concurrently.
    #[serde(default = "default_true")]
    pub parallel_window: bool,
    #[serde(default)]
    pub window_probe: WindowProbe,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            query_timeout_ms: default_query_timeout_ms(),
            parallel_window: default_true(),
            window_probe: WindowProbe::default(),
        }
    }
}

impl PaginationConfig {
    /// The per-call deadline, or `None` when disabled.
    #[must_use]
    pub const fn query_timeout(&self) -> Option<Duration> {
        if self.query_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.query_timeout_ms))
        }
    }

    /// Reject settings the engine cannot honor.
    ///
    /// # Errors
    ///
    /// Returns an error when a page size is zero or the default exceeds the
    /// maximum.
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            bail!("pagination.max_page_size must be at least 1");
        }
        if self.default_page_size == 0 {
            bail!("pagination.default_page_size must be at least 1");
        }
        if self.default_page_size > self.max_page_size {
            bail!(
                "pagination.default_page_size ({}) exceeds pagination.max_page_size ({})",
                self.default_page_size,
                self.max_page_size
            );
        }
        Ok(())
    }

    fn apply_env(&mut self, timeout_env: Option<&str>) -> Result<()> {
        if let Some(raw) = timeout_env {
            self.query_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be an integer, got '{raw}'"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Load `.quill/config.toml` under `project_root`, or defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or
/// validated.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".quill/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .pagination
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(config)
}

/// Load `<config_dir>/quill/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("quill/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config and environment.
///
/// # Errors
///
/// Returns an error when a config file or environment override is invalid.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let mut project = load_project_config(project_root)?;
    let user = load_user_config()?;

    project
        .pagination
        .apply_env(env::var(TIMEOUT_ENV).ok().as_deref())?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(
        cli_json,
        user.output.clone(),
        env_format,
        std::io::stdout().is_terminal(),
    );

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
    is_tty: bool,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if is_tty {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_true() -> bool {
    true
}

const fn default_page_size() -> u32 {
    20
}

const fn default_max_page_size() -> u32 {
    100
}

const fn default_query_timeout_ms() -> u64 {
    5_000
}
