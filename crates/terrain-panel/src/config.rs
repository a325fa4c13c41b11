//! Panel configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use terrain_audio::AnalyzerConfig;
use terrain_bus::{generate_identity, Bus, BusMode, FrameRef};
use url::Url;

use crate::api::{ApiNamespace, PanelQuery};
use crate::error::PanelError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub bus: BusConfig,
    pub api: ApiConfig,
    pub audio: AnalyzerConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Frame identity; generated from `identity_prefix` when unset.
    pub identity: Option<String>,
    pub identity_prefix: String,
    /// Run as the top-level hub instead of a leaf.
    pub hub: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            identity: None,
            identity_prefix: "panel".into(),
            hub: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub org: String,
    pub env: String,
    pub user: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4444".into(),
            org: "tetra".into(),
            env: "dev".into(),
            user: None,
        }
    }
}

impl ApiConfig {
    pub fn query(&self) -> PanelQuery {
        let query = PanelQuery::new(&self.org, &self.env);
        match &self.user {
            Some(user) => query.with_user(user),
            None => query,
        }
    }

    pub fn endpoint(&self, namespace: ApiNamespace, path: &str) -> Result<Url, PanelError> {
        let base = Url::parse(&self.base_url)?;
        self.query().endpoint(&base, namespace, path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub refresh_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl PanelConfig {
    /// `<config dir>/tetra/terrain.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tetra").join("terrain.toml"))
    }

    pub fn from_toml(text: &str) -> Result<Self, PanelError> {
        let config: PanelConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, PanelError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "Loaded panel config");
        Ok(config)
    }

    /// Load from [`PanelConfig::default_path`], falling back to defaults
    /// when the file does not exist.
    pub fn load_default() -> Result<Self, PanelError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String, PanelError> {
        toml::to_string_pretty(self).map_err(|e| PanelError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<(), PanelError> {
        if self.poll.refresh_interval_secs == 0 {
            return Err(PanelError::Config(
                "poll.refresh_interval_secs must be positive".into(),
            ));
        }
        if self.audio.hop_ms == 0 {
            return Err(PanelError::Config("audio.hop_ms must be positive".into()));
        }
        Url::parse(&self.api.base_url)?;
        Ok(())
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        self.audio
    }

    pub fn bus_mode(&self) -> BusMode {
        if self.bus.hub {
            BusMode::Hub
        } else {
            BusMode::Leaf
        }
    }

    pub fn identity(&self) -> String {
        self.bus
            .identity
            .clone()
            .unwrap_or_else(|| generate_identity(&self.bus.identity_prefix))
    }

    /// Build the frame's bus. A leaf needs the handle to its parent window.
    pub fn build_bus(&self, parent: Option<FrameRef>) -> Result<Bus, PanelError> {
        let identity = self.identity();
        match (self.bus_mode(), parent) {
            (BusMode::Hub, _) => Ok(Bus::hub(&identity)),
            (BusMode::Leaf, Some(parent)) => Ok(Bus::leaf(&identity, parent)),
            (BusMode::Leaf, None) => Err(PanelError::Config(
                "leaf bus requires a parent frame".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = PanelConfig::from_toml("").unwrap();
        assert_eq!(config, PanelConfig::default());
        assert_eq!(config.poll.interval(), Duration::from_secs(5));
        assert_eq!(config.analyzer_config().hop_ms, 20);
    }

    #[test]
    fn test_partial_sections() {
        let config = PanelConfig::from_toml(
            r#"
            [bus]
            identity = "voxlab"

            [audio.vad]
            threshold = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(config.identity(), "voxlab");
        assert_eq!(config.bus_mode(), BusMode::Leaf);
        assert_eq!(config.audio.vad.threshold, 0.05);
        assert_eq!(config.audio.vad.padding, 0.05);
        assert_eq!(config.api.org, "tetra");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = PanelConfig::from_toml("[poll]\nrefresh_interval_secs = 0").unwrap_err();
        assert!(matches!(err, PanelError::Config(_)));
    }

    #[test]
    fn test_generated_identity_uses_prefix() {
        let config = PanelConfig::default();
        assert!(config.identity().starts_with("panel-"));
    }

    #[test]
    fn test_api_endpoint_from_config() {
        let mut config = PanelConfig::default();
        config.api.user = Some("ann".into());
        let url = config.api.endpoint(ApiNamespace::Screentool, "recordings").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4444/api/screentool/recordings?org=tetra&env=dev&user=ann"
        );
    }

    #[test]
    fn test_toml_output_reloads() {
        let mut config = PanelConfig::default();
        config.bus.hub = true;
        config.poll.refresh_interval_secs = 30;
        let reloaded = PanelConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reloaded, config);
    }
}
