//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::graph::{GroupingRules, KeywordGroup};
use crate::domain::layout::LayoutConfig;

/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: [&str; 2] = ["SCHOLARGRAPH_API_KEY", "OPENROUTER_API_KEY"];

/// Overrides the config directory
pub const CONFIG_DIR_VAR: &str = "SCHOLARGRAPH_CONFIG_DIR";

/// OpenRouter API base URL
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Scholargraph configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub grouping: GroupingRules,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub default_model: String,
    pub fallback_models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: "anthropic/claude-sonnet-4-20250514".to_string(),
            fallback_models: vec![
                "anthropic/claude-3-5-haiku-latest".to_string(),
                "openai/gpt-4o".to_string(),
            ],
            temperature: 0.7,
            max_tokens: 4096,
            timeout_secs: 120,
            base_url: OPENROUTER_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on ids accepted from one semantic search
    pub max_results: usize,
    /// Upper bound on nodes sent to the collaborator as context
    pub context_nodes: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 25,
            context_nodes: 200,
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        API_KEY_VARS
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn redacted_api_key(&self) -> Option<String> {
        self.resolved_api_key().map(|key| redact(&key))
    }
}

fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        "***".to_string()
    } else {
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("***{}", suffix)
    }
}

const LAYOUT_KEYS: [&str; 17] = [
    "charge",
    "link_distance",
    "link_strength",
    "center_strength",
    "collision_strength",
    "collision_padding",
    "char_width",
    "min_radius",
    "max_radius",
    "alpha_min",
    "alpha_decay",
    "velocity_decay",
    "drag_alpha_target",
    "reheat_alpha",
    "energy_threshold",
    "width",
    "height",
];

fn layout_field<'a>(layout: &'a mut LayoutConfig, name: &str) -> Option<&'a mut f64> {
    Some(match name {
        "charge" => &mut layout.charge,
        "link_distance" => &mut layout.link_distance,
        "link_strength" => &mut layout.link_strength,
        "center_strength" => &mut layout.center_strength,
        "collision_strength" => &mut layout.collision_strength,
        "collision_padding" => &mut layout.collision_padding,
        "char_width" => &mut layout.char_width,
        "min_radius" => &mut layout.min_radius,
        "max_radius" => &mut layout.max_radius,
        "alpha_min" => &mut layout.alpha_min,
        "alpha_decay" => &mut layout.alpha_decay,
        "velocity_decay" => &mut layout.velocity_decay,
        "drag_alpha_target" => &mut layout.drag_alpha_target,
        "reheat_alpha" => &mut layout.reheat_alpha,
        "energy_threshold" => &mut layout.energy_threshold,
        "width" => &mut layout.width,
        "height" => &mut layout.height,
        _ => return None,
    })
}

/// Render the keyword table as `kw1,kw2=Group; kw3=Other`
fn format_keyword_groups(groups: &[KeywordGroup]) -> String {
    groups
        .iter()
        .map(|g| format!("{}={}", g.keywords.join(","), g.group))
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse_keyword_groups(value: &str) -> anyhow::Result<Vec<KeywordGroup>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (keywords, group) = entry.split_once('=').ok_or_else(|| {
                anyhow!("Invalid keyword group '{}': expected `kw1,kw2=Group`", entry)
            })?;
            let keywords: Vec<&str> = keywords
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .collect();
            let group = group.trim();
            if keywords.is_empty() || group.is_empty() {
                return Err(anyhow!("Keyword group '{}' needs keywords and a group name", entry));
            }
            Ok(KeywordGroup::new(&keywords, group))
        })
        .collect()
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_VAR) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("scholargraph")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let raw: toml::Value = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        if raw.get("llm").and_then(|llm| llm.get("api_key")).is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration ({})",
                path.display()
            ));
        }

        let config: Config = raw
            .try_into()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.default_model.trim().is_empty() {
            return Err(anyhow!("llm.default_model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
        }
        if self.search.max_results == 0 {
            return Err(anyhow!("search.max_results must be at least 1"));
        }
        self.layout.validate().map_err(|e| anyhow!(e.to_string()))
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        if let Some(name) = key.strip_prefix("layout.") {
            let mut layout = self.layout.clone();
            return layout_field(&mut layout, name)
                .map(|v| v.to_string())
                .ok_or_else(|| unknown_key(key));
        }

        match key {
            // LLM settings
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.fallback_models" => Ok(self.llm.fallback_models.join(", ")),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),
            "llm.base_url" => Ok(self.llm.base_url.clone()),

            // Grouping settings
            "grouping.fallback" => Ok(self.grouping.fallback.clone()),
            "grouping.keywords" => Ok(format_keyword_groups(&self.grouping.keyword_groups)),

            // Search settings
            "search.max_results" => Ok(self.search.max_results.to_string()),
            "search.context_nodes" => Ok(self.search.context_nodes.to_string()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key() {
                Some(redacted) => Ok(redacted),
                None => Ok(
                    "(not set - use SCHOLARGRAPH_API_KEY or OPENROUTER_API_KEY env var)".to_string(),
                ),
            },

            _ => Err(unknown_key(key)),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        if let Some(name) = key.strip_prefix("layout.") {
            let mut layout = self.layout.clone();
            let field = layout_field(&mut layout, name).ok_or_else(|| unknown_key(key))?;
            *field = value
                .parse()
                .with_context(|| format!("Invalid number for {}: {}", key, value))?;
            layout.validate().map_err(|e| anyhow!(e.to_string()))?;
            self.layout = layout;
            return Ok(());
        }

        match key {
            // LLM settings
            "llm.default_model" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("llm.default_model must not be empty"));
                }
                self.llm.default_model = value.trim().to_string();
            }
            "llm.fallback_models" => {
                self.llm.fallback_models = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }
            "llm.base_url" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(anyhow!("llm.base_url must be an http(s) URL"));
                }
                self.llm.base_url = value.trim_end_matches('/').to_string();
            }

            // Grouping settings
            "grouping.fallback" => {
                self.grouping.fallback = value.trim().to_string();
            }
            "grouping.keywords" => {
                self.grouping.keyword_groups = parse_keyword_groups(value)?;
            }

            // Search settings
            "search.max_results" => {
                let max: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_results value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("search.max_results must be at least 1"));
                }
                self.search.max_results = max;
            }
            "search.context_nodes" => {
                self.search.context_nodes = value
                    .parse()
                    .with_context(|| format!("Invalid context_nodes value: {}", value))?;
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the SCHOLARGRAPH_API_KEY or OPENROUTER_API_KEY environment variable instead."
                ));
            }

            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let mut keys: Vec<String> = [
            "llm.default_model",
            "llm.fallback_models",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.base_url",
            "llm.api_key",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        keys.extend(LAYOUT_KEYS.iter().map(|k| format!("layout.{}", k)));
        keys.extend(
            [
                "grouping.fallback",
                "grouping.keywords",
                "search.max_results",
                "search.context_nodes",
            ]
            .iter()
            .map(|k| k.to_string()),
        );

        keys.into_iter()
            .map(|key| {
                let value = self.get(&key)?;
                Ok((key, value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        Self::reset_at(&Self::config_path()?)
    }

    pub fn reset_at(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow!(
        "Unknown configuration key: {}. Use `scholargraph config list` to see available keys.",
        key
    )
}
