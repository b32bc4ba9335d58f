use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像エンコードエラー: {0}")]
    ImageEncode(String),

    #[error("前処理エラー: {0}")]
    Preprocess(String),

    #[error("HTTP {0}")]
    Http(u16),

    #[error("通信エラー: {0}")]
    Transport(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("不明なモデル: {0}（利用可能: {1}）")]
    UnknownModel(String, String),

    #[error("引数エラー: {0}")]
    InvalidArgument(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] toolkit_inspect_common::Error),
}

impl From<reqwest::Error> for InspectError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => InspectError::Http(status.as_u16()),
            None => InspectError::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;
