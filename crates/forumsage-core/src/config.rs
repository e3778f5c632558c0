//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RESPONDERS__API_KEY`). Provides helpers to expand `~` and `${VAR}`
//! and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{GenerationLimits, ResponderType};

pub struct Config {
    figment: Figment,
    env: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self::from_figment(figment, env_name)
    }

    /// Wrap an already assembled figment. Used by `load_for_env` and by tests
    /// that want to feed inline TOML.
    pub fn from_figment(figment: Figment, env_name: &str) -> anyhow::Result<Self> {
        let config = Self { figment, env: env_name.to_string() };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    fn validate_for_env(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        settings.validate()?;
        match self.env.as_str() {
            "prod" | "production" => {
                if settings.responders.api_key.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "Prod config requires responders.api_key to be set"
                    ));
                }
            }
            "dev" | "development" => {}
            "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub corpus: CorpusSettings,
    pub responders: ResponderSettings,
    pub synthesis: SynthesisSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    pub path: String,
    pub max_results: usize,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self { path: "data/comprehensive_scraping_results.json".to_string(), max_results: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Role names go through `ResponderType::from_str`, so "Technical Expert"
    /// and "technical-expert" are accepted alongside the wire names.
    #[serde(deserialize_with = "deserialize_roles")]
    pub enabled: Vec<ResponderType>,
}

impl Default for ResponderSettings {
    fn default() -> Self {
        let limits = GenerationLimits::default();
        Self {
            base_url: "https://api.formul8.com/multiagent/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_tokens: limits.max_tokens,
            temperature: limits.temperature,
            enabled: ResponderType::SPECIALISTS.to_vec(),
        }
    }
}

fn deserialize_roles<'de, D>(d: D) -> std::result::Result<Vec<ResponderType>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(d)?
        .iter()
        .map(|name| name.parse::<ResponderType>().map_err(serde::de::Error::custom))
        .collect()
}

impl ResponderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn limits(&self) -> GenerationLimits {
        GenerationLimits { max_tokens: self.max_tokens, temperature: self.temperature }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// When false the local fallback synthesis is always used.
    pub enabled: bool,
    pub timeout_secs: u64,
    pub instructions: String,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 30,
            instructions: "Synthesize the responses from all specialists into one \
                           comprehensive, well-structured answer that keeps the best \
                           insight from each."
                .to_string(),
        }
    }
}

impl SynthesisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.corpus.max_results == 0 {
            return Err(Error::InvalidConfig(
                "corpus.max_results must be greater than 0".to_string(),
            ));
        }
        if self.responders.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "responders.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.synthesis.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "synthesis.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.responders.enabled.is_empty() {
            return Err(Error::InvalidConfig(
                "responders.enabled must name at least one responder".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.responders.temperature) {
            return Err(Error::InvalidConfig(format!(
                "responders.temperature must be within [0, 2], got {}",
                self.responders.temperature
            )));
        }
        Ok(())
    }

    /// Corpus location after `~`/`${VAR}` expansion, relative to `base`.
    pub fn corpus_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.corpus.path)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
