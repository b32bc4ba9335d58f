//! 工具キット定義
//!
//! 組み込みキット（11種・閾値98%）と、JSONファイルからの読み込み。

use crate::error::{Error, Result};
use crate::types::{Tool, ToolId};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// 組み込みキットの既定閾値（%）
pub const DEFAULT_THRESHOLD: i64 = 98;

const DEFAULT_KIT: &[(ToolId, &str)] = &[
    (0, "Flat screwdriver"),
    (1, "Phillips screwdriver"),
    (2, "Offset cross screwdriver"),
    (3, "Brace"),
    (4, "Safety wire pliers"),
    (5, "Pliers"),
    (6, "Shank"),
    (7, "Adjustable wrench"),
    (8, "Oil can opener"),
    (9, "Combination wrench 3/4"),
    (10, "Side cutters"),
];

/// キットファイルの1行
#[derive(Debug, Clone, Deserialize)]
struct ToolSpec {
    id: ToolId,
    name: String,
    #[serde(default)]
    threshold: Option<i64>,
}

/// 組み込みキット
pub fn default_kit() -> Vec<Tool> {
    DEFAULT_KIT
        .iter()
        .map(|&(id, name)| Tool::new(id, name, DEFAULT_THRESHOLD))
        .collect()
}

/// IDの重複を検査
pub fn ensure_unique_ids(tools: &[Tool]) -> Result<()> {
    let mut seen = HashSet::new();
    for tool in tools {
        if !seen.insert(tool.id) {
            return Err(Error::DuplicateToolId(tool.id));
        }
    }
    Ok(())
}

/// JSON文字列からキットを読み込む
///
/// 形式は `[{"id": 0, "name": "...", "threshold": 90}, ...]`。
/// 閾値省略時は既定値、範囲外は [0,100] に丸める。
pub fn parse_kit(json: &str) -> Result<Vec<Tool>> {
    let specs: Vec<ToolSpec> = serde_json::from_str(json)?;
    if specs.is_empty() {
        return Err(Error::Config("tool kit is empty".into()));
    }

    let tools: Vec<Tool> = specs
        .into_iter()
        .map(|s| Tool::new(s.id, s.name, s.threshold.unwrap_or(DEFAULT_THRESHOLD)))
        .collect();

    ensure_unique_ids(&tools)?;
    Ok(tools)
}

/// キットファイルを読み込む
pub fn load_kit(path: &Path) -> Result<Vec<Tool>> {
    let content = std::fs::read_to_string(path)?;
    parse_kit(&content)
}
