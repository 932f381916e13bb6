//! Probe profiles.
//!
//! A profile is a small YAML file naming the endpoint to probe:
//!
//! ```yaml
//! url: https://maps.example.com/collections/blueMarble/map/tiles/WebMercatorQuad
//! tile_matrix_set: WebMercatorQuad
//! context:
//!   style: night
//! timeout_secs: 20
//! ```
//!
//! Command line flags override profile values.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use tms_resolver::{FetchConfig, ResolverOptions};

pub const DEFAULT_TILE_MATRIX_SET: &str = "WebMercatorQuad";

fn default_tile_matrix_set() -> String {
    DEFAULT_TILE_MATRIX_SET.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Endpoint description loaded from YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProbeProfile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_tile_matrix_set")]
    pub tile_matrix_set: String,
    /// Extra URL template values
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProbeProfile {
    fn default() -> Self {
        Self {
            url: None,
            tile_matrix_set: default_tile_matrix_set(),
            context: BTreeMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProbeProfile {
    /// Load a profile from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {:?}", path))?;
        let profile: ProbeProfile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse profile: {:?}", path))?;

        info!(path = %path.display(), url = ?profile.url, "Loaded probe profile");
        Ok(profile)
    }

    /// Apply command line overrides.
    pub fn merge(
        mut self,
        url: Option<String>,
        tile_matrix_set: Option<String>,
        context: &[(String, String)],
        timeout_secs: Option<u64>,
    ) -> Self {
        if url.is_some() {
            self.url = url;
        }
        if let Some(id) = tile_matrix_set {
            self.tile_matrix_set = id;
        }
        for (key, value) in context {
            debug!(key = %key, value = %value, "Context override");
            self.context.insert(key.clone(), value.clone());
        }
        if let Some(secs) = timeout_secs {
            self.timeout_secs = secs;
        }
        self
    }

    /// Resolver options for this profile. Fails when no URL was given.
    pub fn resolver_options(&self) -> Result<ResolverOptions> {
        let Some(url) = &self.url else {
            bail!("No tileset URL given (use --url, TILESET_URL or a profile)");
        };

        Ok(self
            .context
            .iter()
            .fold(ResolverOptions::new(url.clone(), self.tile_matrix_set.clone()), |options, (k, v)| {
                options.with_context(k.clone(), v.clone())
            }))
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            request_timeout: Duration::from_secs(self.timeout_secs),
            ..FetchConfig::default()
        }
    }
}

/// Parse a `key=value` command line pair.
pub fn parse_context_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}
