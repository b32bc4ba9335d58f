//! 検出サービス連携
//!
//! - 単体検出: POST {base}/detect（multipart: img_file ほか）
//! - バッチ検出: POST {base}/detect/batch（multipart: files を複数）
//! - モデル一覧: GET {base}/models

use crate::error::{InspectError, Result};
use crate::preprocess::PreparedImage;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use toolkit_inspect_common::{BatchResponse, ModelCatalog, ResponseData};

/// 検出リクエストのパラメータ
#[derive(Debug, Clone)]
pub struct DetectParams {
    pub model_name: String,
    /// 0..1
    pub confidence_threshold: f64,
    pub text_detection: bool,
    pub batch_size: usize,
}

impl DetectParams {
    /// 単体検出のテキストフィールド
    pub fn single_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("model_name", self.model_name.clone()),
            ("confidence_threshold", self.confidence_threshold.to_string()),
            ("text_detection", self.text_detection.to_string()),
        ]
    }

    /// バッチ検出のテキストフィールド
    pub fn batch_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("model_name", self.model_name.clone()),
            ("bs", self.batch_size.to_string()),
            ("confidence_threshold", self.confidence_threshold.to_string()),
        ]
    }
}

pub struct DetectionClient {
    http: Client,
    base_url: String,
}

impl DetectionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InspectError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 利用可能なモデル一覧を取得
    pub async fn list_models(&self) -> Result<ModelCatalog> {
        let url = self.endpoint("models");
        tracing::debug!(%url, "モデル一覧を取得");
        let response = self.http.get(&url).send().await?;
        let catalog: ModelCatalog = read_json(response).await?;
        Ok(ModelCatalog::new(catalog.available().to_vec()))
    }

    /// 画像1枚を検出
    pub async fn detect(&self, image: PreparedImage, params: &DetectParams) -> Result<ResponseData> {
        let url = self.endpoint("detect");
        let file_name = image.file_name.clone();

        let mut form = Form::new().part("img_file", file_part(image)?);
        for (key, value) in params.single_fields() {
            form = form.text(key, value);
        }

        let started = Instant::now();
        let response = self.http.post(&url).multipart(form).send().await?;
        let data: ResponseData = read_json(response).await?;
        tracing::info!(
            file = %file_name,
            detections = data.detections.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "単体検出完了"
        );
        Ok(data)
    }

    /// 複数画像を1リクエストで検出
    pub async fn detect_batch(&self, images: Vec<PreparedImage>, params: &DetectParams) -> Result<BatchResponse> {
        let url = self.endpoint("detect/batch");
        let count = images.len();

        let mut form = Form::new();
        for image in images {
            form = form.part("files", file_part(image)?);
        }
        for (key, value) in params.batch_fields() {
            form = form.text(key, value);
        }

        let started = Instant::now();
        let response = self.http.post(&url).multipart(form).send().await?;
        let batch: BatchResponse = read_json(response).await?;

        if !batch.errors.is_empty() {
            tracing::warn!(errors = batch.errors.len(), "バッチ応答にエラーが含まれています");
        }
        tracing::info!(
            files = count,
            items = batch.items.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "バッチ検出完了"
        );
        Ok(batch)
    }
}

/// モデル一覧が取得できなかったときのモデル名
pub const FALLBACK_MODEL: &str = "default";

/// 使用するモデルを決定する
///
/// 指定があれば一覧に含まれるか確認する（一覧が空なら確認しない）。
/// 指定が無ければ一覧の先頭、一覧も空なら `FALLBACK_MODEL`。
pub fn resolve_model(requested: Option<&str>, catalog: &ModelCatalog) -> Result<String> {
    match requested {
        Some(name) if catalog.is_empty() || catalog.contains(name) => Ok(name.to_string()),
        Some(name) => Err(InspectError::UnknownModel(
            name.to_string(),
            catalog.available().join(", "),
        )),
        None => Ok(catalog.default_model().unwrap_or(FALLBACK_MODEL).to_string()),
    }
}

fn file_part(image: PreparedImage) -> Result<Part> {
    Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(image.mime_type)
        .map_err(|e| InspectError::Transport(e.to_string()))
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), url = %response.url(), "検出サービスがエラーを返しました");
        return Err(InspectError::Http(status.as_u16()));
    }

    let body = response.text().await?;
    tracing::debug!(bytes = body.len(), "応答受信");
    parse_body(&body)
}

/// 応答本文をパース
pub fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| InspectError::ApiParse(e.to_string()))
}
