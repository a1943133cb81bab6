use anyhow::{Context, Result};
use parley_core::config::{
    AnthropicConfig, DEFAULT_ANTHROPIC_BASE_URL, GenericChatConfig, InvokerConfig,
    finite_temperature, mask_secret,
};
use parley_core::providers::{CallContext, classify};
use parley_core::ProviderId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Pin a provider ("anthropic" or "generic_chat"); empty means auto-detect
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub generic_chat: GenericChatSection,
    #[serde(default)]
    pub anthropic: AnthropicSection,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GenericChatSection {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl std::fmt::Debug for GenericChatSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericChatSection")
            .field("base_url", &self.base_url)
            .field("api_key", &mask_secret(&self.api_key))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AnthropicSection {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

impl Default for AnthropicSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_anthropic_base_url(),
        }
    }
}

impl std::fmt::Debug for AnthropicSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicSection")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_anthropic_base_url() -> String {
    DEFAULT_ANTHROPIC_BASE_URL.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parley")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl ParleyConfig {
    /// Load the config file. An explicit path must exist; the default path
    /// may be absent, in which case `None` is returned.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Option<Self>> {
        let path = match custom_path {
            Some(p) => p.clone(),
            None => {
                let p = default_config_path();
                if !p.exists() {
                    debug!("No config file at {}", p.display());
                    return Ok(None);
                }
                p
            }
        };
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        // Refuse world/group-readable config files; they may hold credentials
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `parley init` first.",
                path.display()
            )
        })?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Parse TOML after expanding allowlisted `${VAR}` references
    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_with(content, |name| std::env::var(name).ok())
    }

    fn parse_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Check the raw text, before expansion hides where a key came from
        let raw: Self = toml::from_str(content)?;
        if raw.providers.anthropic.api_key.starts_with("sk-ant-") {
            warn!(
                "Anthropic API key is hardcoded in config file. For security, use environment variables: api_key = \"${{ANTHROPIC_API_KEY}}\""
            );
        }
        if !raw.providers.generic_chat.api_key.is_empty()
            && !raw.providers.generic_chat.api_key.contains("${")
        {
            warn!(
                "Chat endpoint API key is hardcoded in config file. For security, use environment variables: api_key = \"${{OPENAI_API_KEY}}\""
            );
        }

        let expanded = expand_with(content, lookup);
        Ok(toml::from_str(&expanded)?)
    }

    /// Convert to the core configuration. An unknown pinned provider is
    /// reported as a classified error.
    pub fn to_invoker_config(&self) -> Result<InvokerConfig> {
        let provider = match non_blank(&self.providers.provider) {
            Some(name) => Some(
                name.parse::<ProviderId>()
                    .map_err(|e| classify(e, CallContext::default()))?,
            ),
            None => None,
        };

        Ok(InvokerConfig {
            provider,
            generic_chat: GenericChatConfig {
                base_url: non_blank(&self.providers.generic_chat.base_url),
                api_key: non_blank(&self.providers.generic_chat.api_key),
            },
            anthropic: AnthropicConfig {
                api_key: non_blank(&self.providers.anthropic.api_key),
                base_url: non_blank(&self.providers.anthropic.base_url)
                    .unwrap_or_else(default_anthropic_base_url),
            },
            default_model: non_blank(&self.defaults.model),
            default_max_tokens: self.defaults.max_tokens,
            default_temperature: self
                .defaults
                .temperature
                .and_then(|t| finite_temperature("defaults.temperature", t)),
        })
    }
}

/// Config file if present, otherwise the process environment
pub fn resolve(custom_path: &Option<PathBuf>) -> Result<InvokerConfig> {
    match ParleyConfig::load(custom_path)? {
        Some(file) => file.to_invoker_config(),
        None => Ok(InvokerConfig::from_env()),
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
/// This prevents an attacker who can modify the config from reading arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &[
    "PARLEY_PROVIDER",
    "PARLEY_MODEL",
    "OPENAI_BASE_URL",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "ANTHROPIC_BASE_URL",
    "HOME",
    "USER",
];

/// Replace allowlisted `${VAR}` references using `lookup`. Unset variables
/// expand to nothing; names outside the allowlist stay as written.
fn expand_with<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("${") {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 2..open + close];
        out.push_str(&rest[..open]);
        if ALLOWED_ENV_VARS.contains(&name) {
            out.push_str(&lookup(name).unwrap_or_default());
        } else {
            warn!("Not expanding '{}' in config: variable is not allowlisted", name);
            out.push_str(&rest[open..=open + close]);
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}
