//! 工具単位の集計
//!
//! 検出リストを工具IDで絞り込み、件数・閾値通過数・最大信頼度・OCRテキストを求める。
//! すべて純粋関数。工具に対応しない検出は単に無視する。

use crate::types::{Detection, Tool};

/// 信頼度（0..1）をパーセント整数に変換
///
/// 負値・NaNは0になる。
pub fn to_percent(confidence: f64) -> u32 {
    (confidence * 100.0).round() as u32
}

fn matching<'a>(tool: &'a Tool, detections: &'a [Detection]) -> impl Iterator<Item = &'a Detection> + 'a {
    detections
        .iter()
        .filter(move |d| d.class_id == Some(tool.id))
}

/// 工具に一致する検出数（信頼度を問わない）
pub fn raw_count(tool: &Tool, detections: &[Detection]) -> u32 {
    matching(tool, detections).count() as u32
}

/// 閾値を通過した検出数（閾値ちょうどは通過）
pub fn pass_count(tool: &Tool, detections: &[Detection]) -> u32 {
    matching(tool, detections)
        .filter(|d| to_percent(d.confidence) >= u32::from(tool.threshold))
        .count() as u32
}

/// 一致する検出の最大信頼度（%）
///
/// `None` は「一度も検出されていない」、`Some(0)` は「検出されたが信頼度0」。
pub fn max_confidence_percent(tool: &Tool, detections: &[Detection]) -> Option<u32> {
    matching(tool, detections)
        .map(|d| to_percent(d.confidence))
        .max()
}

/// 最高信頼度の検出に付いたOCRテキスト
///
/// 空白のみのテキストは無視する。同点は先に出現した方を採用。
pub fn best_ocr_text(tool: &Tool, detections: &[Detection]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;

    for det in matching(tool, detections) {
        let text = match det.ocr.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => continue,
        };
        match best {
            Some((conf, _)) if det.confidence <= conf => {}
            _ => best = Some((det.confidence, text)),
        }
    }

    best.map(|(_, text)| text.to_string())
}
