use crate::error::{InspectError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolkit_inspect_common::ToolId;

#[derive(Parser)]
#[command(name = "toolkit-inspect")]
#[command(about = "工具キット写真の検出結果照合・検査ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 工具キットJSON（設定より優先）
    #[arg(long, global = true)]
    pub tools: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真1枚を検出・検査
    Detect {
        /// 写真ファイルのパス
        #[arg(required = true)]
        image: PathBuf,

        /// 出力ディレクトリ（デフォルト: 写真と同じフォルダ）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 使用モデル
        #[arg(short, long)]
        model: Option<String>,

        /// 工具の閾値 ID=PCT（複数指定可）
        #[arg(short, long)]
        threshold: Vec<String>,

        /// 件数の手動補正 ID=N（複数指定可）
        #[arg(short, long)]
        count: Vec<String>,

        /// 刻印文字の読み取りを有効化
        #[arg(long)]
        text_detection: bool,

        /// 縮小せずに元画像を送信
        #[arg(long)]
        no_compress: bool,
    },

    /// フォルダ内の写真をまとめて検出・検査
    Batch {
        /// 写真フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 出力ディレクトリ（デフォルト: 入力フォルダ）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// 使用モデル
        #[arg(short, long)]
        model: Option<String>,

        /// サービス側のバッチサイズ
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// 工具の閾値 ID=PCT（複数指定可）
        #[arg(short, long)]
        threshold: Vec<String>,

        /// 件数の手動補正 FILE:ID=N（複数指定可）
        #[arg(short, long)]
        count: Vec<String>,

        /// 縮小せずに元画像を送信
        #[arg(long)]
        no_compress: bool,

        /// 前処理の同時実行数
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// 利用可能なモデル一覧を表示
    Models,

    /// 設定を表示/編集
    Config {
        /// 検出サービスのURLを設定
        #[arg(long)]
        set_service_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// 件数の手動補正（バッチ用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCount {
    pub file: String,
    pub tool_id: ToolId,
    pub count: u32,
}

fn split_assignment(arg: &str) -> Result<(ToolId, &str)> {
    let (id, value) = arg
        .split_once('=')
        .ok_or_else(|| InspectError::InvalidArgument(format!("ID=値 の形式で指定してください: {}", arg)))?;
    let id = id
        .trim()
        .parse::<ToolId>()
        .map_err(|_| InspectError::InvalidArgument(format!("工具IDが不正です: {}", arg)))?;
    Ok((id, value.trim()))
}

/// `ID=PCT` を解析（範囲外の値はそのまま渡し、状態側で丸める）
pub fn parse_threshold(arg: &str) -> Result<(ToolId, i64)> {
    let (id, value) = split_assignment(arg)?;
    let value = value
        .parse::<f64>()
        .map_err(|_| InspectError::InvalidArgument(format!("閾値が不正です: {}", arg)))?;
    if !value.is_finite() {
        return Err(InspectError::InvalidArgument(format!("閾値が不正です: {}", arg)));
    }
    Ok((id, value.round() as i64))
}

/// `ID=N` を解析
pub fn parse_count(arg: &str) -> Result<(ToolId, u32)> {
    let (id, value) = split_assignment(arg)?;
    let count = value
        .parse::<u32>()
        .map_err(|_| InspectError::InvalidArgument(format!("件数は0以上の整数で指定してください: {}", arg)))?;
    Ok((id, count))
}

/// `FILE:ID=N` を解析
pub fn parse_file_count(arg: &str) -> Result<FileCount> {
    let (file, rest) = arg
        .rsplit_once(':')
        .ok_or_else(|| InspectError::InvalidArgument(format!("FILE:ID=N の形式で指定してください: {}", arg)))?;
    if file.is_empty() {
        return Err(InspectError::InvalidArgument(format!("ファイル名がありません: {}", arg)));
    }
    let (tool_id, count) = parse_count(rest)?;
    Ok(FileCount {
        file: file.to_string(),
        tool_id,
        count,
    })
}
