//! 検出結果のJSON出力
//!
//! 出力ファイル名は `<拡張子なしのファイル名>_detections.json`。
//! サブフォルダ内のファイルはフォルダ名を `_` でつないで前に付ける。
//! 内容は `{ detections, match, client }` の3キーのみ。

use crate::error::Result;
use std::path::{Path, PathBuf};
use toolkit_inspect_common::reconcile::{base_name, strip_extension};
use toolkit_inspect_common::FileItem;

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// 相対パスから出力ファイル名を作る
pub fn export_file_name(relative_path: &str) -> String {
    let base = base_name(relative_path);
    let dir = relative_path[..relative_path.len() - base.len()].trim_matches(is_separator);
    let stem = strip_extension(base);
    if dir.is_empty() {
        format!("{}_detections.json", stem)
    } else {
        format!("{}_{}_detections.json", dir.replace(is_separator, "_"), stem)
    }
}

pub fn export_path(output_dir: &Path, relative_path: &str) -> PathBuf {
    output_dir.join(export_file_name(relative_path))
}

/// 1ファイル分の結果を書き出す
///
/// 結果を持たないファイルは何もせず `None` を返す。
pub fn export_file(file: &FileItem, output_dir: &Path) -> Result<Option<PathBuf>> {
    let Some(data) = &file.data else {
        return Ok(None);
    };

    std::fs::create_dir_all(output_dir)?;
    let relative_path = file.relative_path.as_deref().filter(|p| !p.is_empty()).unwrap_or(&file.name);
    let path = export_path(output_dir, relative_path);
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(&path, json)?;

    tracing::debug!(path = %path.display(), "検出結果を保存");
    Ok(Some(path))
}

/// 全ファイルの結果を書き出し、保存したパスを返す
pub fn export_all(files: &[FileItem], output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for file in files {
        if let Some(path) = export_file(file, output_dir)? {
            written.push(path);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("kit_01.jpg"), "kit_01_detections.json");
        assert_eq!(export_file_name("noext"), "noext_detections.json");
    }

    #[test]
    fn test_export_file_name_keeps_subfolder() {
        assert_eq!(export_file_name("shelf/kit.v2.png"), "shelf_kit.v2_detections.json");
        assert_eq!(export_file_name("room-1/shelf-a/kit.jpg"), "room-1_shelf-a_kit_detections.json");
        assert_eq!(export_file_name("dir.v1\\kit"), "dir.v1_kit_detections.json");
    }

    #[test]
    fn test_export_without_data_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileItem::new(0, "kit.jpg");
        assert!(export_file(&file, dir.path()).unwrap().is_none());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
