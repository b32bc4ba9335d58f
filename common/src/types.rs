//! 検出結果・工具定義の型定義
//!
//! CLIと照合エンジンで共有される型:
//! - Tool: 検査対象の工具（閾値は操作者が変更可能）
//! - Detection: 検出サービスが返す生の検出1件
//! - ResponseData: 検出サービスの応答エンベロープ
//! - BatchResponse: バッチ検出の応答（ファイル名付き）

use serde::{Deserialize, Serialize};

/// 工具ID（検出器のクラスIDと一致）
pub type ToolId = i64;

/// 閾値を [0,100] に丸める
pub fn clamp_threshold(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// 検査対象の工具
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: ToolId,
    pub name: String,

    /// 合格閾値（%、0〜100）
    pub threshold: u8,

    /// 最大信頼度（%）: 表示用の派生値
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u32>,

    /// 有効検出数（閾値通過後・手動補正後）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    /// 最高信頼度の検出に付いたOCRテキスト
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<String>,
}

impl Tool {
    pub fn new(id: ToolId, name: impl Into<String>, threshold: i64) -> Self {
        Self {
            id,
            name: name.into(),
            threshold: clamp_threshold(threshold),
            confidence: None,
            count: None,
            ocr: None,
        }
    }

    /// 閾値を書き込む（常に [0,100] に丸める）
    pub fn set_threshold(&mut self, value: i64) {
        self.threshold = clamp_threshold(value);
    }
}

/// 検出サービスの出力1件
///
/// 欠損フィールドはデフォルト値で読み込む。`class_id` が無い検出は
/// どの工具にも一致しない扱いになる。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<ToolId>,

    #[serde(default)]
    pub class_name: String,

    /// 信頼度（0..1）
    #[serde(default)]
    pub confidence: f64,

    /// 正規化座標 [x1, y1, x2, y2]
    #[serde(default)]
    pub bbox: [f64; 4],

    /// 正規化座標のポリゴン群
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygons: Option<Vec<Vec<[f64; 2]>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<String>,
}

impl Detection {
    pub fn new(class_id: ToolId, confidence: f64) -> Self {
        Self {
            class_id: Some(class_id),
            confidence,
            ..Default::default()
        }
    }

    pub fn with_ocr(mut self, text: impl Into<String>) -> Self {
        self.ocr = Some(text.into());
        self
    }
}

/// 照合サマリ（`passed` はサービス側の参考値、再計算で上書きされる）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSummary {
    pub overall: f64,
    pub passed: bool,
}

/// 検出サービスの応答
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub detections: Vec<Detection>,

    #[serde(rename = "match", default)]
    pub match_summary: MatchSummary,
}

/// バッチ応答の `match` 部分
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchMatch {
    #[serde(default)]
    pub overall: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectedSetMatch {
    #[serde(default)]
    pub passed: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    #[serde(default)]
    pub match_expected_set: Option<ExpectedSetMatch>,
}

/// バッチ応答の1件（ファイル名で識別）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub detections: Vec<Detection>,

    #[serde(rename = "match", default)]
    pub match_info: Option<BatchMatch>,

    #[serde(default)]
    pub stats: Option<BatchStats>,
}

impl BatchItem {
    /// 内部の ResponseData 形式へ変換（欠損は overall=0, passed=false）
    pub fn to_response_data(&self) -> ResponseData {
        let overall = self
            .match_info
            .as_ref()
            .and_then(|m| m.overall)
            .unwrap_or(0.0);
        let passed = self
            .stats
            .as_ref()
            .and_then(|s| s.match_expected_set.as_ref())
            .and_then(|m| m.passed)
            .unwrap_or(false);

        ResponseData {
            detections: self.detections.clone(),
            match_summary: MatchSummary { overall, passed },
        }
    }
}

/// バッチ検出の応答
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub items: Vec<BatchItem>,

    #[serde(default)]
    pub errors: Vec<serde_json::Value>,

    #[serde(default)]
    pub summary: Option<serde_json::Value>,
}

/// 利用可能なモデル一覧
///
/// 起動時に一度だけ取得し、以降は参照として渡す。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    available: Vec<String>,
}

impl ModelCatalog {
    pub fn new(available: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(available.len());
        for name in available {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { available: unique }
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    pub fn contains(&self, name: &str) -> bool {
        self.available.iter().any(|m| m == name)
    }

    /// 先頭のモデル（選択リストの初期値）
    pub fn default_model(&self) -> Option<&str> {
        self.available.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}
