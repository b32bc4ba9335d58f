//! 検査結果の表示（標準出力）

use toolkit_inspect_common::{FileItem, FileStatus, Session, Tool};

fn status_mark(file: &FileItem) -> &'static str {
    match file.status {
        FileStatus::Done if file.passed() => "✔",
        FileStatus::Done => "✘",
        FileStatus::Error => "!",
        FileStatus::Idle | FileStatus::Processing => "-",
    }
}

pub fn format_tool_row(tool: &Tool, overridden: bool) -> String {
    let confidence = tool
        .confidence
        .map(|c| format!("{:>3}%", c))
        .unwrap_or_else(|| "   -".to_string());
    let count = tool.count.unwrap_or(0);
    let mark = if overridden { "*" } else { " " };
    let ocr = tool.ocr.as_deref().unwrap_or("");
    format!(
        "  {:>3} {:<24} 閾値{:>3}%  信頼度{}  件数{:>2}{}  {}",
        tool.id, tool.name, tool.threshold, confidence, count, mark, ocr
    )
    .trim_end()
    .to_string()
}

/// 表示中ファイルの工具一覧を出力
pub fn print_tool_table(session: &Session) {
    let Some(file) = session.current_file() else {
        return;
    };

    println!("{} {}", status_mark(file), file.name);
    for row in session.tool_rows() {
        let overridden = file.overrides.count(row.id).is_some();
        println!("{}", format_tool_row(&row, overridden));
    }
    if let Some(error) = &file.error {
        println!("  エラー: {}", error);
    }
}

/// 全ファイルの判定と集計を出力
pub fn print_summary(session: &Session) {
    for file in &session.files {
        match &file.error {
            Some(error) if file.status == FileStatus::Error => {
                println!("  {} {} ({})", status_mark(file), file.name, error)
            }
            _ => println!("  {} {}", status_mark(file), file.name),
        }
    }

    let summary = session.summary();
    println!(
        "\n合計 {}件: 合格 {} / 不一致 {} / エラー {} / 未処理 {}",
        summary.total, summary.passed, summary.mismatched, summary.failed, summary.pending
    );
}
