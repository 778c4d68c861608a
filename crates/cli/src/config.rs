//! `redirects.toml` loading.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use redirects::{DocumentType, PathResolverRegistry, PathTemplate, RedirectConfig, RedirectOptions};
use sanity::{SanityClient, SanitySettings};

/// Contents of the configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Content store connection.
    pub sanity: SanitySettings,
    /// Plugin options, camelCase keys.
    #[serde(default)]
    pub options: RedirectOptions,
    /// Document type to path template, e.g. `event = "/events/{slug.current}"`.
    #[serde(default)]
    pub resolvers: BTreeMap<String, PathTemplate>,
}

impl FileConfig {
    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parses configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Resolves the plugin configuration.
    pub fn redirect_config(&self) -> Result<RedirectConfig> {
        let mut registry = PathResolverRegistry::new();
        for (name, template) in &self.resolvers {
            let doc_type =
                DocumentType::new(name.as_str()).ok_or_else(|| anyhow!("resolver type names must not be empty"))?;
            registry.register(doc_type, template.clone());
        }
        RedirectConfig::from_options(registry, self.options.clone())
            .context("invalid redirect configuration")
    }

    /// Builds the content store client. The token is read from the
    /// environment variable named by `token_env`.
    pub fn client(&self, config: &RedirectConfig) -> Result<SanityClient> {
        let token = match &self.sanity.token_env {
            Some(var) => Some(
                std::env::var(var)
                    .with_context(|| format!("environment variable {var} is not set"))?,
            ),
            None => None,
        };
        Ok(SanityClient::new(
            &self.sanity,
            Some(config.api_version()),
            token,
        )?)
    }
}
