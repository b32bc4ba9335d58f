//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use std::path::Path;
use tempfile::tempdir;
use toolkit_inspect::error::InspectError;
use toolkit_inspect::scanner;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"), false);
    assert!(matches!(result, Err(InspectError::FolderNotFound(_))));
}

/// 空のフォルダをスキャンした場合
#[test]
fn test_scan_empty_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = scanner::scan_folder(dir.path(), true);

    // 空フォルダはエラーではなく空のVecを返す
    assert!(result.unwrap().is_empty());
}

/// 存在しない画像を指定した場合
#[test]
fn test_image_not_found() {
    let result = scanner::ImageInfo::from_path(Path::new("/nonexistent/kit.jpg"));
    assert!(matches!(result, Err(InspectError::FileNotFound(_))));
}

/// InspectErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        InspectError::Config("テスト設定エラー".to_string()),
        InspectError::FileNotFound("test.jpg".to_string()),
        InspectError::FolderNotFound("/path/to/folder".to_string()),
        InspectError::NoImagesFound("フォルダ".to_string()),
        InspectError::ImageLoad("broken.jpg".to_string()),
        InspectError::Transport("connection refused".to_string()),
        InspectError::ApiParse("expected value".to_string()),
        InspectError::InvalidArgument("1=x".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// HTTPエラーはステータスだけを表示（ファイルのエラー欄にそのまま入る）
#[test]
fn test_http_error_message() {
    assert_eq!(InspectError::Http(500).to_string(), "HTTP 500");
}

/// 不明なモデルのメッセージに候補が含まれる
#[test]
fn test_unknown_model_message() {
    let err = InspectError::UnknownModel("huge".into(), "main, small".into());
    let display = err.to_string();
    assert!(display.contains("huge"));
    assert!(display.contains("main, small"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: InspectError = io_err.into();

    assert!(matches!(err, InspectError::Io(_)));
    assert!(err.to_string().contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: InspectError = json_err.into();

    assert!(matches!(err, InspectError::JsonParse(_)));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_conversion() {
    let common_err = toolkit_inspect_common::Error::DuplicateToolId(3);
    let err: InspectError = common_err.into();

    assert!(matches!(err, InspectError::Common(_)));
    assert_eq!(err.to_string(), "Duplicate tool id in kit: 3");
}

/// 重複IDを含むキットファイル
#[test]
fn test_duplicate_kit_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kit.json");
    std::fs::write(&path, r#"[{"id": 1, "name": "A"}, {"id": 1, "name": "B"}]"#).unwrap();

    let err: InspectError = toolkit_inspect_common::load_kit(&path).unwrap_err().into();
    assert!(matches!(
        err,
        InspectError::Common(toolkit_inspect_common::Error::DuplicateToolId(1))
    ));
}
