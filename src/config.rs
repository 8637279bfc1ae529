use crate::classify::{Classifier, Tier};
use crate::render::ColorScale;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_FEED_URL: &str = "https://bot-api.vost.pt/rally-pt/rallyptdata.csv";

/// Every section is optional; a missing file section falls back to the
/// built-in rally dashboard defaults.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub schedule: ScheduleConfig,
    pub server: ServerConfig,
    pub map: MapConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub max_body_bytes: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: 8,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8050,
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Static map presentation. None of this is derived from the feed.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub style: String,
    pub color_title: String,
    pub color_scale: Vec<String>,
    pub color_domain: [f64; 2],
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: 40.777132,
            center_lon: -7.441015,
            zoom: 7.0,
            style: "carto-darkmatter".to_string(),
            color_title: "Lotação/Capacidad/Capacity".to_string(),
            color_scale: ["#61c462", "#ffff00", "#f89406", "#ee5f5a"]
                .map(String::from)
                .to_vec(),
            color_domain: [0.0, 100.0],
        }
    }
}

impl MapConfig {
    pub fn color_scale(&self) -> Result<ColorScale> {
        ColorScale::new(&self.color_scale, self.color_domain).context("Invalid [map] color scale")
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPreset {
    #[default]
    Refresh,
    InitialRender,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    pub preset: ThresholdPreset,
    /// Explicit rule table; overrides `preset` when present.
    pub tiers: Option<Vec<Tier>>,
}

impl ClassifierConfig {
    pub fn build(&self) -> Result<Classifier> {
        match &self.tiers {
            Some(tiers) => Classifier::new(tiers.clone()).context("Invalid [classifier] tiers"),
            None => Ok(match self.preset {
                ThresholdPreset::Refresh => Classifier::refresh(),
                ThresholdPreset::InitialRender => Classifier::initial_render(),
            }),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..=MAX_INTERVAL_SECS).contains(&self.schedule.interval_secs),
            "[schedule] interval_secs must be between 1 and {MAX_INTERVAL_SECS}"
        );
        anyhow::ensure!(self.source.timeout_secs > 0, "[source] timeout_secs must be > 0");
        anyhow::ensure!(!self.source.url.is_empty(), "[source] url must not be empty");
        self.map.color_scale()?;
        self.classifier.build()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusSymbol;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_rally_dashboard() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.source.url, DEFAULT_FEED_URL);
        assert_eq!(config.schedule.interval(), Duration::from_secs(10));
        assert!(config.source.timeout() < config.schedule.interval());
        assert_eq!(config.map.zoom, 7.0);
        assert_eq!(config.map.color_domain, [0.0, 100.0]);
        assert_eq!(config.classifier.build().unwrap(), Classifier::refresh());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config("[server]\nport = 9000\n\n[schedule]\ninterval_secs = 30\n");
        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.schedule.interval_secs, 30);
        assert_eq!(config.map.style, "carto-darkmatter");
    }

    #[test]
    fn custom_tiers_override_preset() {
        let file = write_config(
            r#"
[classifier]
preset = "initial_render"

[[classifier.tiers]]
above = 80
status = "full"

[[classifier.tiers]]
above = 0
status = "free"
"#,
        );
        let config = AppConfig::load_from_file(file.path()).unwrap();
        let classifier = config.classifier.build().unwrap();
        assert_eq!(classifier.classify(81.0), StatusSymbol::Full);
        assert_eq!(classifier.classify(80.0), StatusSymbol::Free);
        assert_eq!(classifier.classify(0.0), StatusSymbol::Empty);
    }

    #[test]
    fn initial_render_preset_is_selectable() {
        let file = write_config("[classifier]\npreset = \"initial_render\"\n");
        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.classifier.build().unwrap(), Classifier::initial_render());
    }

    #[test]
    fn invalid_values_fail_to_load() {
        let file = write_config("[map]\ncolor_scale = [\"green\"]\n");
        assert!(AppConfig::load_from_file(file.path()).is_err());

        let file = write_config("[schedule]\ninterval_secs = 0\n");
        assert!(AppConfig::load_from_file(file.path()).is_err());

        let file = write_config("[schedule]\ninterval_secs = 9223372036854775807\n");
        assert!(AppConfig::load_from_file(file.path()).is_err());

        let file = write_config(concat!(
            "[[classifier.tiers]]\nabove = 10\nstatus = \"free\"\n\n",
            "[[classifier.tiers]]\nabove = 20\nstatus = \"full\"\n",
        ));
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load_from_file(Path::new("/nonexistent/rallymap.toml")).is_err());
    }
}
