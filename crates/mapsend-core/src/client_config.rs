//! Expose the resolved revision to client bundles.
//!
//! Error reporting code running in the browser needs the same revision the
//! sourcemaps were uploaded under. Build scripts inline this payload through
//! the bundler's `define`, import the generated module, or load it from a
//! dotenv file.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Global the generated module assigns and dotenv key the env format writes.
pub const CLIENT_CONFIG_NAME: &str = "MAPSEND_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientConfigFormat {
    /// Bare JSON object.
    Json,
    /// `globalThis.MAPSEND_CONFIG = {...}` module body.
    Module,
    /// `MAPSEND_CONFIG={...}` dotenv line.
    Env,
}

impl ClientConfig {
    pub fn new(release: Option<String>) -> Self {
        Self { release }
    }

    pub fn render(&self, format: ClientConfigFormat) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(match format {
            ClientConfigFormat::Json => json,
            ClientConfigFormat::Module => format!("globalThis.{} = {}\n", CLIENT_CONFIG_NAME, json),
            ClientConfigFormat::Env => format!("{}={}", CLIENT_CONFIG_NAME, json),
        })
    }
}
