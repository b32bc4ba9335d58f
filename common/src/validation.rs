//! 撮影画像1枚の検査
//!
//! 全工具について閾値通過数（または手動補正値）を求め、
//! 「各工具がちょうど1個」のときだけ合格とする。

use crate::aggregate::{max_confidence_percent, pass_count};
use crate::types::{Detection, ResponseData, Tool, ToolId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ファイル単位の手動補正（工具ID → 件数）
///
/// 補正がある工具は計算値より常に優先される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub counts: BTreeMap<ToolId, u32>,
}

impl Overrides {
    pub fn set_count(&mut self, tool_id: ToolId, count: u32) {
        self.counts.insert(tool_id, count);
    }

    pub fn clear_count(&mut self, tool_id: ToolId) -> bool {
        self.counts.remove(&tool_id).is_some()
    }

    pub fn count(&self, tool_id: ToolId) -> Option<u32> {
        self.counts.get(&tool_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// 検査結果（エクスポートJSONの `client` ブロック）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoValidation {
    pub counts_by_tool: BTreeMap<ToolId, u32>,
    pub max_conf_by_tool: BTreeMap<ToolId, Option<u32>>,
    pub per_tool_passed: BTreeMap<ToolId, bool>,
    pub overall_passed: bool,
}

/// 工具一覧と検出リストから検査結果を計算
///
/// 工具が空なら合格。副作用なし。
pub fn validate(tools: &[Tool], detections: &[Detection], overrides: Option<&Overrides>) -> PhotoValidation {
    let mut result = PhotoValidation::default();

    for tool in tools {
        let effective = overrides
            .and_then(|o| o.count(tool.id))
            .unwrap_or_else(|| pass_count(tool, detections));

        result.counts_by_tool.insert(tool.id, effective);
        result
            .max_conf_by_tool
            .insert(tool.id, max_confidence_percent(tool, detections));
        result.per_tool_passed.insert(tool.id, effective == 1);
    }

    result.overall_passed = result.per_tool_passed.values().all(|&passed| passed);
    result
}

/// 再計算済みの応答（エクスポート対象）
///
/// `match.passed` はエンジンの判定で上書き済み。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatedResponse {
    #[serde(flatten)]
    pub response: ResponseData,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<PhotoValidation>,
}

impl ValidatedResponse {
    /// 未検査の応答として包む
    pub fn unvalidated(response: ResponseData) -> Self {
        Self { response, client: None }
    }

    /// 現在の工具設定・補正で再検査する
    pub fn revalidate(&self, tools: &[Tool], overrides: &Overrides) -> Self {
        let verdict = validate(tools, &self.response.detections, Some(overrides));
        let mut response = self.response.clone();
        response.match_summary.passed = verdict.overall_passed;
        Self {
            response,
            client: Some(verdict),
        }
    }

    pub fn overall_passed(&self) -> Option<bool> {
        self.client.as_ref().map(|c| c.overall_passed)
    }
}
