//! バッチ結果とファイルの対応付け
//!
//! バックエンドはファイル名付きで結果を返すが、名前は拡張子落ち・パス付き・
//! 大文字小文字違い・順序入れ替え・欠落がありうる。
//!
//! 1. 名前照合: 正規化フルネーム → 拡張子なし名の順で未使用の結果を探す
//! 2. 位置照合: 残ったファイルに、未使用の結果を元の順序で割り当てる
//!
//! 結果は送信ファイルと同じ長さ・同じ順序。各結果は最大1回しか使わない。

use regex::Regex;
use std::collections::HashMap;

/// 送信したファイルの名前情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedName {
    pub name: String,
    /// 選択フォルダからの相対パス（あれば）
    pub relative_path: Option<String>,
}

impl SubmittedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relative_path: None,
        }
    }

    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }

    /// 照合候補キー（重複・空は除外、優先順）
    fn candidate_keys(&self) -> Vec<String> {
        let mut keys = vec![normalize_full(&self.name), normalize_stem(&self.name)];
        if let Some(path) = self.relative_path.as_deref().filter(|p| !p.is_empty()) {
            keys.push(normalize_full(path));
            keys.push(normalize_stem(path));
        }

        let mut unique: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            if !key.is_empty() && !unique.contains(&key) {
                unique.push(key);
            }
        }
        unique
    }
}

/// パスの最後の要素（`/` と `\` の両方で区切る）
pub fn base_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}

/// 末尾の拡張子を除去
pub fn strip_extension(name: &str) -> &str {
    lazy_static::lazy_static! {
        static ref EXTENSION_RE: Regex = Regex::new(r"\.[^.]+$").unwrap();
    }
    match EXTENSION_RE.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

/// 正規化フルネーム（ベース名の小文字）
pub fn normalize_full(path: &str) -> String {
    base_name(path).to_lowercase()
}

/// 正規化した拡張子なし名
pub fn normalize_stem(path: &str) -> String {
    strip_extension(base_name(path)).to_lowercase()
}

/// 結果のアリーナと使用済みフラグ
struct Matching {
    by_full: HashMap<String, Vec<usize>>,
    by_stem: HashMap<String, Vec<usize>>,
    consumed: Vec<bool>,
}

impl Matching {
    fn new(result_names: &[&str]) -> Self {
        let mut by_full: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_stem: HashMap<String, Vec<usize>> = HashMap::new();

        // 同名の結果は応答順に並べる
        for (idx, name) in result_names.iter().enumerate() {
            let full = normalize_full(name);
            let stem = normalize_stem(name);
            if !full.is_empty() {
                by_full.entry(full).or_default().push(idx);
            }
            if !stem.is_empty() {
                by_stem.entry(stem).or_default().push(idx);
            }
        }

        Self {
            by_full,
            by_stem,
            consumed: vec![false; result_names.len()],
        }
    }

    fn take_by_key(&mut self, key: &str) -> Option<usize> {
        let consumed = &self.consumed;
        let found = [self.by_full.get(key), self.by_stem.get(key)]
            .into_iter()
            .flatten()
            .flat_map(|indices| indices.iter().copied())
            .find(|&idx| !consumed[idx])?;
        self.consumed[found] = true;
        Some(found)
    }
}

/// 送信ファイルに結果のインデックスを割り当てる
///
/// 戻り値の `i` 番目は `files[i]` に対応する `result_names` のインデックス。
/// どちらの照合でも見つからなかったファイルは `None`。
pub fn reconcile(files: &[SubmittedName], result_names: &[&str]) -> Vec<Option<usize>> {
    let mut matching = Matching::new(result_names);
    let mut assignment: Vec<Option<usize>> = vec![None; files.len()];

    for (slot, file) in assignment.iter_mut().zip(files) {
        *slot = file
            .candidate_keys()
            .iter()
            .find_map(|key| matching.take_by_key(key));
    }

    let mut cursor = 0;
    for slot in assignment.iter_mut().filter(|s| s.is_none()) {
        while cursor < matching.consumed.len() && matching.consumed[cursor] {
            cursor += 1;
        }
        if cursor >= matching.consumed.len() {
            break;
        }
        matching.consumed[cursor] = true;
        *slot = Some(cursor);
        cursor += 1;
    }

    assignment
}

/// 割り当てに従って結果を取り出す
pub fn reconcile_items<T: Clone>(
    files: &[SubmittedName],
    results: &[T],
    name_of: impl Fn(&T) -> &str,
) -> Vec<Option<T>> {
    let names: Vec<&str> = results.iter().map(|r| name_of(r)).collect();
    reconcile(files, &names)
        .into_iter()
        .map(|slot| slot.map(|idx| results[idx].clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn files(names: &[&str]) -> Vec<SubmittedName> {
        names.iter().map(|n| SubmittedName::new(*n)).collect()
    }

    fn assert_distinct(assignment: &[Option<usize>]) {
        let used: Vec<usize> = assignment.iter().flatten().copied().collect();
        let unique: HashSet<usize> = used.iter().copied().collect();
        assert_eq!(used.len(), unique.len(), "結果が重複して割り当てられた: {:?}", assignment);
    }

    #[test]
    fn test_base_name_and_extension() {
        assert_eq!(base_name("dir/sub/a.JPG"), "a.JPG");
        assert_eq!(base_name(r"C:\photos\b.png"), "b.png");
        assert_eq!(base_name("plain"), "plain");
        assert_eq!(strip_extension("a.tar.gz"), "a.tar");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension("trailing."), "trailing.");
        assert_eq!(strip_extension(".hidden"), "");
        assert_eq!(normalize_full("Dir/IMG_01.JPG"), "img_01.jpg");
        assert_eq!(normalize_stem("Dir/IMG_01.JPG"), "img_01");
    }

    #[test]
    fn test_case_and_extension_variance() {
        let out = reconcile(&files(&["a.jpg", "b.jpg"]), &["B.JPG", "a"]);
        assert_eq!(out, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_positional_fallback_and_missing() {
        let out = reconcile(&files(&["x.jpg", "y.jpg", "z.jpg"]), &["foo", "bar"]);
        assert_eq!(out, vec![Some(0), Some(1), None]);
    }

    #[test]
    fn test_recompressed_names_match_by_stem() {
        // 前処理で .png → .jpg に変わったケース
        let out = reconcile(&files(&["kit_1.png", "kit_2.PNG"]), &["kit_2.jpg", "kit_1.jpg"]);
        assert_eq!(out, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_path_qualified_result_names() {
        let out = reconcile(&files(&["a.jpg", "b.jpg"]), &["/tmp/upload/b.jpg", r"C:\x\a.jpg"]);
        assert_eq!(out, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_relative_path_candidate() {
        let submitted = vec![
            SubmittedName::new("renamed.jpg").with_relative_path("kits/Set-7.jpg"),
            SubmittedName::new("other.jpg"),
        ];
        let out = reconcile(&submitted, &["other.jpg", "set-7"]);
        assert_eq!(out, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_name_match_never_double_assigns() {
        // 同名ファイル2つに結果1つ → 2つ目は位置照合で残りを取る
        let out = reconcile(&files(&["a.jpg", "a.jpg"]), &["a.jpg", "zzz"]);
        assert_eq!(out, vec![Some(0), Some(1)]);
        assert_distinct(&out);
    }

    #[test]
    fn test_same_key_falls_back_to_stem_map() {
        // "x" はフルネーム表では0番、拡張子なし表では1番を指す
        let out = reconcile(&files(&["x", "X"]), &["x", "x.jpg"]);
        assert_eq!(out, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_duplicate_names_keep_result_order() {
        let submitted = vec![
            SubmittedName::new("kit.jpg").with_relative_path("shelf-a/kit.jpg"),
            SubmittedName::new("kit.jpg").with_relative_path("shelf-b/kit.jpg"),
        ];
        let out = reconcile(&submitted, &["kit.jpg", "kit.jpg"]);
        assert_eq!(out, vec![Some(0), Some(1)]);

        // 拡張子が変わっていても応答順で割り当てる
        let out = reconcile(&submitted, &["kit.png", "KIT.png"]);
        assert_eq!(out, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_positional_skips_name_matched() {
        let out = reconcile(&files(&["p.jpg", "q.jpg", "r.jpg"]), &["r.jpg", "zz1", "zz2"]);
        assert_eq!(out, vec![Some(1), Some(2), Some(0)]);
        assert_distinct(&out);
    }

    #[test]
    fn test_more_results_than_files() {
        let out = reconcile(&files(&["only.jpg"]), &["a", "b", "only"]);
        assert_eq!(out, vec![Some(2)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reconcile(&[], &["a"]).is_empty());
        assert_eq!(reconcile(&files(&["a.jpg"]), &[]), vec![None]);
    }

    #[test]
    fn test_length_distinctness_and_determinism() {
        let name_pool = ["a.jpg", "B.jpg", "c", "dir/d.PNG", "e.jpeg", ""];
        for n_files in 0..=name_pool.len() {
            for n_results in 0..=name_pool.len() {
                let submitted = files(&name_pool[..n_files]);
                let results: Vec<&str> = name_pool.iter().rev().take(n_results).copied().collect();

                let first = reconcile(&submitted, &results);
                assert_eq!(first.len(), submitted.len());
                assert_distinct(&first);
                assert!(first.iter().flatten().all(|&i| i < results.len()));
                assert_eq!(first, reconcile(&submitted, &results));

                // 割り当て数 = min(ファイル数, 結果数)
                let assigned = first.iter().filter(|s| s.is_some()).count();
                assert_eq!(assigned, n_files.min(n_results));
            }
        }
    }

    #[test]
    fn test_reconcile_items() {
        let results = vec![("b.jpg".to_string(), 2), ("a.jpg".to_string(), 1)];
        let out = reconcile_items(&files(&["a.jpg", "b.jpg", "c.jpg"]), &results, |r| r.0.as_str());
        assert_eq!(out[0].as_ref().map(|r| r.1), Some(1));
        assert_eq!(out[1].as_ref().map(|r| r.1), Some(2));
        assert!(out[2].is_none());
    }
}
