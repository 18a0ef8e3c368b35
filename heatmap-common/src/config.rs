use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketingConfig {
    #[serde(default = "default_nbuckets")]
    pub nbuckets: usize,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64, // 0 means "scan the data"
    #[serde(default)]
    pub weighbyrange: bool,
    #[serde(default = "default_normalization")]
    pub normalization: String,
}

fn default_nbuckets() -> usize {
    100
}
fn default_normalization() -> String {
    "rank".into()
}

impl Default for BucketingConfig {
    fn default() -> Self {
        Self {
            nbuckets: default_nbuckets(),
            min: 0.0,
            max: 0.0,
            weighbyrange: false,
            normalization: default_normalization(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default = "default_hue")]
    pub hue: f64,
    #[serde(default = "default_hue_step")]
    pub hue_step: f64,
    #[serde(default = "default_saturation")]
    pub saturation: [f64; 2],
    #[serde(default = "default_value")]
    pub value: f64,
}

fn default_width() -> usize {
    1000
}
fn default_height() -> usize {
    300
}
fn default_hue() -> f64 {
    21.0
}
fn default_hue_step() -> f64 {
    91.0
}
fn default_saturation() -> [f64; 2] {
    [0.0, 0.9]
}
fn default_value() -> f64 {
    0.95
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            hue: default_hue(),
            hue_step: default_hue_step(),
            saturation: default_saturation(),
            value: default_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_percentile")]
    pub percentile: f64,
}

fn default_percentile() -> f64 {
    0.95
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { percentile: default_percentile() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    ".".into()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { output_dir: default_output_dir() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bucketing: BucketingConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("heatmap")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        let path = if let Ok(env_path) = std::env::var("HEATMAP_CONFIG") {
            PathBuf::from(env_path) // $HEATMAP_CONFIG overrides default config path
        } else {
            Self::config_path()
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::HeatmapError::Config(e.to_string()))
    }

    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::HeatmapError::Config(e.to_string()))
    }
}
