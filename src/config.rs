use crate::error::{InspectError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SERVICE_URL_ENV: &str = "TOOLKIT_SERVICE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 検出サービスのベースURL（/detect, /detect/batch, /models）
    pub service_url: String,
    /// 使用モデル（未指定時はモデル一覧の先頭）
    pub model: Option<String>,
    /// サービスに渡す信頼度閾値（0..1）
    pub confidence_threshold: f64,
    pub batch_size: usize,
    pub text_detection: bool,
    /// 送信前に縮小するか
    pub compress: bool,
    pub max_side: u32,
    pub jpeg_quality: u8,
    /// 前処理の同時実行数
    pub concurrency: usize,
    pub timeout_seconds: u64,
    /// 工具キットJSON（未指定時は組み込みキット）
    pub tool_kit: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000/api".into(),
            model: None,
            confidence_threshold: 0.5,
            batch_size: 8,
            text_detection: false,
            compress: true,
            max_side: 1280,
            jpeg_quality: 82,
            concurrency: 6,
            timeout_seconds: 120,
            tool_kit: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| InspectError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("toolkit-inspect").join("config.json"))
    }

    /// 検出サービスURL（環境変数を優先）
    pub fn service_url(&self) -> String {
        match std::env::var(SERVICE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => self.service_url.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(InspectError::Config(format!(
                "confidence_threshold は 0〜1 で指定してください: {}",
                self.confidence_threshold
            )));
        }
        if self.batch_size == 0 {
            return Err(InspectError::Config("batch_size は1以上にしてください".into()));
        }
        if self.concurrency == 0 {
            return Err(InspectError::Config("concurrency は1以上にしてください".into()));
        }
        if self.max_side == 0 {
            return Err(InspectError::Config("max_side は1以上にしてください".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(InspectError::Config(format!(
                "jpeg_quality は 1〜100 で指定してください: {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    pub fn set_service_url(&mut self, url: String) -> Result<()> {
        self.service_url = url;
        self.save()
    }
}
