use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "yolov8n";
pub const DEFAULT_ASSETS_DIR: &str = "app/src/main/assets";
pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_EXPORT_FORMAT: &str = "onnx";
pub const DEFAULT_IMGSZ: u32 = 640;
pub const DEFAULT_OPSET: u32 = 12;

pub const RELEASES_BASE: &str = "https://github.com/ultralytics/assets/releases/download";

/// Asset releases carrying pre-converted TFLite files, tried in order.
pub const DEFAULT_RELEASES: &[&str] = &["v8.3.0", "v8.2.0", "v8.1.0"];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub model: Option<String>,
    pub assets_dir: Option<PathBuf>,
    pub python: Option<String>,
    pub urls: Option<Vec<String>>,
    pub export_format: Option<String>,
    pub imgsz: Option<u32>,
    pub opset: Option<u32>,
    pub simplify: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Assets directory, resolved against `workdir` when relative.
    pub fn assets_dir(&self, workdir: &Path) -> PathBuf {
        let dir = self
            .assets_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR));
        if dir.is_absolute() { dir } else { workdir.join(dir) }
    }

    /// Download sources; without explicit ones, the release assets for
    /// the configured model.
    pub fn urls(&self) -> Vec<String> {
        match &self.urls {
            Some(urls) if !urls.is_empty() => urls.clone(),
            _ => DEFAULT_RELEASES
                .iter()
                .map(|tag| format!("{RELEASES_BASE}/{tag}/{}.tflite", self.model()))
                .collect(),
        }
    }
}
