//! Toolkit Inspect Common Library
//!
//! 検出結果から工具キットの在庫判定を行う照合エンジン。
//! I/Oを持たない純粋な処理のみを置き、CLIから利用される。

pub mod types;
pub mod aggregate;
pub mod validation;
pub mod reconcile;
pub mod session;
pub mod toolkit;
pub mod error;

pub use types::{
    BatchItem, BatchResponse, Detection, MatchSummary, ModelCatalog, ResponseData, Tool, ToolId,
};
pub use aggregate::{best_ocr_text, max_confidence_percent, pass_count, raw_count, to_percent};
pub use validation::{validate, Overrides, PhotoValidation, ValidatedResponse};
pub use reconcile::{reconcile, reconcile_items, SubmittedName};
pub use session::{reduce, Action, FileItem, FileStatus, Mode, Session, SessionSummary};
pub use toolkit::{default_kit, load_kit, parse_kit};
pub use error::{Error, Result};
