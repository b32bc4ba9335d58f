//! 検出から検査までの流れ
//!
//! セッション状態の更新はすべて `reduce` に渡すアクションで行う。
//! 通信や前処理の失敗は `AnalysisFailed` としてセッションに反映し、
//! 呼び出し側にはエラーを返さない。

use crate::cli::FileCount;
use crate::client::{DetectParams, DetectionClient};
use crate::error::{InspectError, Result};
use crate::preprocess::{prepare_all, prepare_image, PreprocessOptions};
use crate::scanner::ImageInfo;
use toolkit_inspect_common::reconcile::{normalize_full, normalize_stem};
use toolkit_inspect_common::{
    reconcile_items, reduce, Action, BatchResponse, Mode, ResponseData, Session, SubmittedName, Tool, ToolId,
};

/// 画像一覧を読み込んだセッションを作る
pub fn load_session(mode: Mode, tools: Vec<Tool>, images: &[ImageInfo]) -> Session {
    let names = images.iter().map(ImageInfo::submitted_name).collect();
    reduce(Session::new(mode, tools), Action::LoadFiles(names))
}

pub fn apply_thresholds(session: Session, thresholds: &[(ToolId, i64)]) -> Session {
    thresholds.iter().fold(session, |state, &(tool_id, value)| {
        reduce(state, Action::SetThreshold { tool_id, value })
    })
}

/// 表示中ファイルに件数補正を適用
pub fn apply_counts(session: Session, counts: &[(ToolId, u32)]) -> Session {
    counts.iter().fold(session, |state, &(tool_id, count)| {
        reduce(state, Action::SetCount { tool_id, count })
    })
}

/// 補正対象のファイルを探す（相対パス・ファイル名・拡張子なしの順）
pub fn find_file(session: &Session, name: &str) -> Option<usize> {
    let path = name.replace('\\', "/");
    let full = normalize_full(name);
    let stem = normalize_stem(name);
    let files = &session.files;

    files
        .iter()
        .position(|f| f.relative_path.as_deref() == Some(path.as_str()))
        .or_else(|| files.iter().position(|f| normalize_full(&f.name) == full))
        .or_else(|| files.iter().position(|f| normalize_stem(&f.name) == stem))
}

fn locate(session: &Session, entry: &FileCount) -> Result<usize> {
    find_file(session, &entry.file)
        .ok_or_else(|| InspectError::InvalidArgument(format!("対象ファイルがありません: {}", entry.file)))
}

/// 補正対象のファイルがすべて存在するか確認する（送信前に呼ぶ）
pub fn check_file_counts(session: &Session, counts: &[FileCount]) -> Result<()> {
    for entry in counts {
        locate(session, entry)?;
    }
    Ok(())
}

/// ファイル指定の件数補正を適用し、表示位置を先頭に戻す
pub fn apply_file_counts(session: Session, counts: &[FileCount]) -> Result<Session> {
    let mut state = session;
    for entry in counts {
        let index = locate(&state, entry)?;
        state = reduce(state, Action::Select(index));
        state = reduce(
            state,
            Action::SetCount {
                tool_id: entry.tool_id,
                count: entry.count,
            },
        );
    }
    Ok(reduce(state, Action::Select(0)))
}

/// バッチ応答を送信ファイル順に並べ替える
pub fn batch_results(files: &[SubmittedName], response: &BatchResponse) -> Vec<Option<ResponseData>> {
    let matched = reconcile_items(files, &response.items, |item| item.filename.as_str());

    let unmatched_files = matched.iter().filter(|m| m.is_none()).count();
    let unused_items = response.items.len().saturating_sub(files.len() - unmatched_files);
    if unmatched_files > 0 || unused_items > 0 {
        tracing::warn!(unmatched_files, unused_items, "バッチ応答とファイルが対応しません");
    }

    matched
        .into_iter()
        .map(|item| item.map(|i| i.to_response_data()))
        .collect()
}

fn finish(session: Session, outcome: Result<Vec<Option<ResponseData>>>) -> Session {
    match outcome {
        Ok(results) => reduce(session, Action::ResultsReceived(results)),
        Err(e) => {
            tracing::warn!(error = %e, "検出に失敗しました");
            reduce(session, Action::AnalysisFailed(e.to_string()))
        }
    }
}

/// 写真1枚を送信して検査
pub async fn run_single(
    client: &DetectionClient,
    session: Session,
    image: &ImageInfo,
    params: &DetectParams,
    options: PreprocessOptions,
) -> Session {
    let session = reduce(session, Action::BeginAnalysis);
    if !session.analyzing {
        return session;
    }

    let outcome = async {
        let prepared = prepare_image(image.clone(), options).await?;
        let data = client.detect(prepared, params).await?;
        Ok::<_, InspectError>(vec![Some(data)])
    }
    .await;

    finish(session, outcome)
}

/// フォルダ内の写真をまとめて送信して検査
pub async fn run_batch(
    client: &DetectionClient,
    session: Session,
    images: &[ImageInfo],
    params: &DetectParams,
    options: PreprocessOptions,
) -> Session {
    let session = reduce(session, Action::BeginAnalysis);
    if !session.analyzing {
        return session;
    }

    let submitted: Vec<SubmittedName> = session.files.iter().map(|f| f.submitted_name()).collect();
    let outcome = async {
        let prepared = prepare_all(images, options).await?;
        let response = client.detect_batch(prepared, params).await?;
        Ok::<_, InspectError>(batch_results(&submitted, &response))
    }
    .await;

    finish(session, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolkit_inspect_common::{BatchItem, Detection, FileStatus};

    fn image(name: &str, relative: &str) -> ImageInfo {
        ImageInfo {
            path: relative.into(),
            file_name: name.into(),
            relative_path: relative.into(),
        }
    }

    fn kit() -> Vec<Tool> {
        vec![Tool::new(1, "Screwdriver", 80), Tool::new(2, "Pliers", 80)]
    }

    fn item(name: &str, ids: &[ToolId]) -> BatchItem {
        BatchItem {
            filename: name.into(),
            detections: ids.iter().map(|&id| Detection::new(id, 0.9)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_results_follow_file_order() {
        let session = load_session(
            Mode::Batch,
            kit(),
            &[image("a.png", "a.png"), image("b.png", "b.png")],
        );
        let submitted: Vec<SubmittedName> = session.files.iter().map(|f| f.submitted_name()).collect();
        let response = BatchResponse {
            items: vec![item("b.jpg", &[1]), item("a.jpg", &[1, 2])],
            ..Default::default()
        };

        let results = batch_results(&submitted, &response);
        assert_eq!(results[0].as_ref().unwrap().detections.len(), 2);
        assert_eq!(results[1].as_ref().unwrap().detections.len(), 1);
        assert!(!results[0].as_ref().unwrap().match_summary.passed);
    }

    #[test]
    fn test_find_file() {
        let session = load_session(
            Mode::Batch,
            kit(),
            &[image("kit.jpg", "shelf-a/kit.jpg"), image("kit.jpg", "shelf-b/kit.jpg"), image("Other.PNG", "Other.PNG")],
        );
        assert_eq!(find_file(&session, "shelf-b/kit.jpg"), Some(1));
        assert_eq!(find_file(&session, "kit.jpg"), Some(0));
        assert_eq!(find_file(&session, "other"), Some(2));
        assert_eq!(find_file(&session, "missing.jpg"), None);
    }

    #[test]
    fn test_apply_file_counts() {
        let session = load_session(Mode::Batch, kit(), &[image("a.jpg", "a.jpg"), image("b.jpg", "b.jpg")]);
        let session = reduce(session, Action::BeginAnalysis);
        let session = reduce(
            session,
            Action::ResultsReceived(vec![
                Some(item("a.jpg", &[2]).to_response_data()),
                Some(item("b.jpg", &[2]).to_response_data()),
            ]),
        );

        let counts = vec![FileCount { file: "b.jpg".into(), tool_id: 1, count: 1 }];
        let session = apply_file_counts(session, &counts).unwrap();

        assert_eq!(session.current, 0);
        assert!(!session.files[0].passed());
        assert!(session.files[1].passed());
    }

    #[test]
    fn test_check_file_counts_before_submission() {
        let session = load_session(
            Mode::Batch,
            kit(),
            &[image("kit.jpg", "shelf-a/kit.jpg"), image("b.jpg", "b.jpg")],
        );
        let known = vec![
            FileCount { file: "shelf-a/kit.jpg".into(), tool_id: 1, count: 1 },
            FileCount { file: "b".into(), tool_id: 2, count: 0 },
        ];
        assert!(check_file_counts(&session, &known).is_ok());

        let unknown = vec![
            FileCount { file: "b.jpg".into(), tool_id: 1, count: 1 },
            FileCount { file: "zzz.jpg".into(), tool_id: 1, count: 1 },
        ];
        assert!(matches!(
            check_file_counts(&session, &unknown),
            Err(InspectError::InvalidArgument(_))
        ));
        // 確認だけで状態は変えない
        assert!(!session.analyzing);
        assert!(session.files.iter().all(|f| f.overrides.is_empty()));
    }

    #[test]
    fn test_apply_file_counts_unknown_file() {
        let session = load_session(Mode::Batch, kit(), &[image("a.jpg", "a.jpg")]);
        let counts = vec![FileCount { file: "zzz.jpg".into(), tool_id: 1, count: 1 }];
        assert!(matches!(
            apply_file_counts(session, &counts),
            Err(InspectError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_finish_with_error_marks_batch_files() {
        let session = load_session(Mode::Batch, kit(), &[image("a.jpg", "a.jpg")]);
        let session = reduce(session, Action::BeginAnalysis);
        let session = finish(session, Err(InspectError::Http(503)));
        assert_eq!(session.files[0].status, FileStatus::Error);
        assert_eq!(session.files[0].error.as_deref(), Some("HTTP 503"));
    }

    #[test]
    fn test_thresholds_then_counts() {
        let session = load_session(Mode::Single, kit(), &[image("a.jpg", "a.jpg")]);
        let session = apply_thresholds(session, &[(1, 50), (2, 500)]);
        assert_eq!(session.tools[0].threshold, 50);
        assert_eq!(session.tools[1].threshold, 100);

        let session = apply_counts(session, &[(2, 1)]);
        assert_eq!(session.files[0].overrides.count(2), Some(1));
    }
}
