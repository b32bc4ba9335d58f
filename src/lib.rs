//! toolkit-inspect
//!
//! 工具キット写真を検出サービスに送り、結果を照合エンジンで検査するCLI。

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod preprocess;
pub mod report;
pub mod scanner;
pub mod pipeline;
