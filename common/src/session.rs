//! 検査セッションの状態遷移
//!
//! 閾値変更・手動補正・検出結果の受信はすべて `reduce` を通り、
//! 同じ再計算処理で派生値（検査結果）を更新する。
//! 状態と派生値が食い違うことはない。

use crate::aggregate::{best_ocr_text, max_confidence_percent, raw_count};
use crate::reconcile::SubmittedName;
use crate::types::{ResponseData, Tool, ToolId};
use crate::validation::{Overrides, ValidatedResponse};
use serde::{Deserialize, Serialize};

/// 対応する結果が無かったファイルのエラーメッセージ
pub const NO_DATA_MESSAGE: &str = "no data";

/// ファイルの処理状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Idle,
    Processing,
    Done,
    Error,
}

/// 送信対象の画像1枚
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileItem {
    pub id: usize,
    pub name: String,
    pub relative_path: Option<String>,
    pub status: FileStatus,
    pub data: Option<ValidatedResponse>,
    pub error: Option<String>,
    pub overrides: Overrides,
    pub has_mismatch: bool,
}

impl FileItem {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn submitted_name(&self) -> SubmittedName {
        SubmittedName {
            name: self.name.clone(),
            relative_path: self.relative_path.clone(),
        }
    }

    /// 処理済みかつ全工具合格のときだけ true
    ///
    /// エラー状態のファイルは古いデータが残っていても合格扱いしない。
    pub fn passed(&self) -> bool {
        self.status == FileStatus::Done
            && self.data.as_ref().and_then(|d| d.overall_passed()) == Some(true)
    }

    fn recompute(&mut self, tools: &[Tool]) {
        let Some(data) = &self.data else {
            return;
        };
        let updated = data.revalidate(tools, &self.overrides);
        self.data = Some(updated);
        // 処理済み以外（エラー・処理中）は不一致として表示する
        self.has_mismatch = !self.passed();
    }
}

/// 送信モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// 1枚ずつ送信（失敗時は結果を記録しない）
    #[default]
    Single,
    /// 複数枚を1リクエストで送信
    Batch,
}

/// 操作者の操作・外部イベント
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// 新しいファイル群を読み込む（補正はすべて破棄）
    LoadFiles(Vec<SubmittedName>),
    /// 表示中のファイルを切り替える
    Select(usize),
    /// 工具の閾値を変更（全ファイル再計算）
    SetThreshold { tool_id: ToolId, value: i64 },
    /// 表示中ファイルの件数を手動補正
    SetCount { tool_id: ToolId, count: u32 },
    /// 表示中ファイルの手動補正を解除
    ClearCount { tool_id: ToolId },
    /// 解析開始
    BeginAnalysis,
    /// 解析結果（ファイル順に対応付け済み）
    ResultsReceived(Vec<Option<ResponseData>>),
    /// 通信失敗
    AnalysisFailed(String),
}

/// 検査セッション
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub mode: Mode,
    pub tools: Vec<Tool>,
    pub files: Vec<FileItem>,
    pub current: usize,
    pub analyzing: bool,
}

/// ファイル状態の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub total: usize,
    pub passed: usize,
    pub mismatched: usize,
    pub failed: usize,
    pub pending: usize,
}

impl Session {
    pub fn new(mode: Mode, tools: Vec<Tool>) -> Self {
        Self {
            mode,
            tools,
            ..Default::default()
        }
    }

    pub fn current_file(&self) -> Option<&FileItem> {
        self.files.get(self.current)
    }

    /// 表示用の工具一覧（表示中ファイルの信頼度・件数・OCRを埋める）
    pub fn tool_rows(&self) -> Vec<Tool> {
        let data = self.current_file().and_then(|f| f.data.as_ref());
        let detections = data.map(|d| d.response.detections.as_slice()).unwrap_or(&[]);
        let counts = data.and_then(|d| d.client.as_ref()).map(|c| &c.counts_by_tool);

        self.tools
            .iter()
            .map(|tool| {
                let count = counts
                    .and_then(|c| c.get(&tool.id).copied())
                    .unwrap_or_else(|| raw_count(tool, detections));
                Tool {
                    confidence: max_confidence_percent(tool, detections),
                    count: Some(count),
                    ocr: best_ocr_text(tool, detections),
                    ..tool.clone()
                }
            })
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            total: self.files.len(),
            ..Default::default()
        };
        for file in &self.files {
            match file.status {
                FileStatus::Done if file.passed() => summary.passed += 1,
                FileStatus::Done => summary.mismatched += 1,
                FileStatus::Error => summary.failed += 1,
                FileStatus::Idle | FileStatus::Processing => summary.pending += 1,
            }
        }
        summary
    }

    fn recompute_current(&mut self) {
        let tools = &self.tools;
        if let Some(file) = self.files.get_mut(self.current) {
            file.recompute(tools);
        }
    }

    fn recompute_all(&mut self) {
        let tools = &self.tools;
        for file in &mut self.files {
            file.recompute(tools);
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::LoadFiles(names) => {
                self.files = names
                    .into_iter()
                    .enumerate()
                    .map(|(id, name)| FileItem {
                        id,
                        name: name.name,
                        relative_path: name.relative_path,
                        ..Default::default()
                    })
                    .collect();
                self.current = 0;
                self.analyzing = false;
            }

            Action::Select(index) => {
                if !self.files.is_empty() {
                    self.current = index.min(self.files.len() - 1);
                }
            }

            Action::SetThreshold { tool_id, value } => {
                if let Some(tool) = self.tools.iter_mut().find(|t| t.id == tool_id) {
                    tool.set_threshold(value);
                    self.recompute_all();
                }
            }

            Action::SetCount { tool_id, count } => {
                if let Some(file) = self.files.get_mut(self.current) {
                    file.overrides.set_count(tool_id, count);
                    self.recompute_current();
                }
            }

            Action::ClearCount { tool_id } => {
                if let Some(file) = self.files.get_mut(self.current) {
                    if file.overrides.clear_count(tool_id) {
                        self.recompute_current();
                    }
                }
            }

            Action::BeginAnalysis => {
                // 送信中の二重送信は受け付けない
                if self.files.is_empty() || self.analyzing {
                    return;
                }
                self.analyzing = true;
                for file in &mut self.files {
                    file.status = FileStatus::Processing;
                    file.error = None;
                }
            }

            Action::ResultsReceived(results) => {
                if !self.analyzing {
                    return;
                }
                self.analyzing = false;

                let mut results = results.into_iter();
                for file in &mut self.files {
                    match results.next().flatten() {
                        Some(data) => {
                            file.status = FileStatus::Done;
                            file.error = None;
                            file.data = Some(ValidatedResponse::unvalidated(data));
                        }
                        None => {
                            file.status = FileStatus::Error;
                            file.error = Some(NO_DATA_MESSAGE.to_string());
                            file.has_mismatch = true;
                        }
                    }
                }
                self.recompute_all();
            }

            Action::AnalysisFailed(message) => {
                self.analyzing = false;
                for file in &mut self.files {
                    file.error = Some(message.clone());
                    file.status = match self.mode {
                        Mode::Batch => FileStatus::Error,
                        Mode::Single if file.data.is_some() => FileStatus::Done,
                        Mode::Single => FileStatus::Idle,
                    };
                    if file.status == FileStatus::Error {
                        file.has_mismatch = true;
                    }
                }
            }
        }
    }
}

/// 状態遷移関数
pub fn reduce(mut state: Session, action: Action) -> Session {
    state.apply(action);
    state
}
