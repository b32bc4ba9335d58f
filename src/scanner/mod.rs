use crate::error::{InspectError, Result};
use std::path::{Path, PathBuf};
use toolkit_inspect_common::SubmittedName;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    /// スキャンしたフォルダからの相対パス
    pub relative_path: String,
}

impl ImageInfo {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(InspectError::FileNotFound(path.display().to_string()));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            relative_path: file_name.clone(),
            file_name,
        })
    }

    pub fn submitted_name(&self) -> SubmittedName {
        SubmittedName::new(self.file_name.clone()).with_relative_path(self.relative_path.clone())
    }

    /// 拡張子から推定したMIMEタイプ
    pub fn mime_type(&self) -> &'static str {
        match self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            _ => "image/jpeg",
        }
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// 対応画像の拡張子か（大文字小文字を区別しない）
pub fn is_image_extension(ext: &str) -> bool {
    let lower = ext.to_lowercase();
    IMAGE_EXTENSIONS.contains(&lower.as_str())
}

pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<ImageInfo>> {
    if !folder.is_dir() {
        return Err(InspectError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let is_image = path
            .extension()
            .map(|ext| is_image_extension(&ext.to_string_lossy()))
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let relative_path = path
            .strip_prefix(folder)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| file_name.clone());

        images.push(ImageInfo {
            path: path.to_path_buf(),
            file_name,
            relative_path,
        });
    }

    // 相対パスでソート（送信順 = 表示順）
    images.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(images)
}
