//! ログ初期化
//!
//! `RUST_LOG` → `LOG_LEVEL` の順でフィルタを読み、どちらも無ければ
//! 既定レベルを使う。ログは標準エラーへ出し、標準出力はレポート専用にする。

use tracing_subscriber::{fmt, EnvFilter};

pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // テストなどで二重初期化された場合は無視
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
