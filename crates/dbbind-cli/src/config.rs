use dbbind::{ExecutorConfig, ParamStyle, SessionConfig};
use serde::Deserialize;
use std::path::Path;

/// Contents of `dbbind.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    pub param_style: Option<ParamStyle>,
    #[serde(default)]
    pub compile_cache: usize,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            database: DatabaseConfig::default(),
            session: SessionSection::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Load `path`. A `url_override` replaces `database.url` before it is expanded or
    /// validated.
    pub fn load(path: &Path, url_override: Option<&str>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        Self::parse_with(&raw, url_override)
            .map_err(|e| anyhow::anyhow!("invalid config file {}: {e:#}", path.display()))
    }

    /// Load `path`, or fall back to defaults when it does not exist and `url_override`
    /// supplies the database.
    pub fn load_or_default(path: &Path, url_override: Option<&str>) -> anyhow::Result<Self> {
        if let Some(url) = url_override {
            if !path.exists() {
                let mut file = Self::default();
                file.database.url = url.to_string();
                file.validate()?;
                return Ok(file);
            }
        }
        Self::load(path, url_override)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Self::parse_with(raw, None)
    }

    fn parse_with(raw: &str, url_override: Option<&str>) -> anyhow::Result<Self> {
        let mut file: ConfigFile = toml::from_str(raw)?;
        file.database.url = match url_override {
            Some(url) => url.to_string(),
            None => expand_env_vars(&file.database.url)?,
        };
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.version != "1" {
            anyhow::bail!("unsupported config version: {}", self.version);
        }
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url is empty");
        }
        self.executor.validate()?;
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            param_style: self.session.param_style,
            executor: self.executor.clone(),
            compile_cache: self.session.compile_cache,
            autocommit: false,
        }
    }
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            anyhow::bail!("unterminated env var reference: ${{{after}");
        };
        let key = &after[..end];
        if key.is_empty() {
            anyhow::bail!("invalid env var reference: ${{}}");
        }
        let value = std::env::var(key)
            .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}
