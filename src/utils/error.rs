use crate::domain::model::Verdict;
use std::fmt;
use thiserror::Error;

/// 後端結構化錯誤碼:優先採用,字串比對只是相容性退路。
pub const DUPLICATE_PROGRAM_CODE: &str = "DUPLICATE_PROGRAM_ENROLLMENT";
pub const DUPLICATE_PERIOD_CODE: &str = "DUPLICATE_PERIOD_ENROLLMENT";

// 後端訊息文字的字面契約,與伺服器實作直接耦合。
const DUPLICATE_PERIOD_TEXT: &str =
    "already enrolled in this program for the specified semester and academic year";
const DUPLICATE_PROGRAM_TEXT: &str = "already enrolled in this program";

/// 伺服器拒絕中可辨識的重複註冊類型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// 同一學程已有註冊。
    SameProgram,
    /// 同學程同學期同學年的完全重複。
    SamePeriod,
}

impl DuplicateKind {
    /// 先看結構化 code,再退回訊息字串比對。
    /// 較長的字串要先比對,避免被較短的前綴吃掉。
    pub fn classify(code: Option<&str>, message: &str) -> Option<Self> {
        match code {
            Some(DUPLICATE_PROGRAM_CODE) => return Some(DuplicateKind::SameProgram),
            Some(DUPLICATE_PERIOD_CODE) => return Some(DuplicateKind::SamePeriod),
            _ => {}
        }
        if message.contains(DUPLICATE_PERIOD_TEXT) {
            Some(DuplicateKind::SamePeriod)
        } else if message.contains(DUPLICATE_PROGRAM_TEXT) {
            Some(DuplicateKind::SameProgram)
        } else {
            None
        }
    }
}

impl fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKind::SameProgram => f.write_str("same program"),
            DuplicateKind::SamePeriod => f.write_str("same semester and academic year"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    /// 本地驗證擋下,尚未發出任何網路請求。
    #[error("Enrollment blocked by local validation: {verdict}")]
    LocalConflict { verdict: Verdict },

    /// 本地判定通過但權威存放區拒絕:快照過期或與其他 session 競態。
    #[error("Server rejected enrollment as duplicate ({kind}): {message}")]
    ServerRejectedDuplicate {
        kind: DuplicateKind,
        message: String,
    },

    #[error("Server error (status {status}): {message}")]
    ServerError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Server response contained no data: {context}")]
    MissingData { context: String },

    #[error("No eligible students remain in the batch ({rejected} rejected locally)")]
    EmptyBatch { rejected: usize },
}

impl EnrollError {
    /// 把伺服器拒絕重新歸類為可辨識的重複註冊;辨識不出來就原樣回傳。
    pub fn into_classified(self) -> Self {
        match self {
            EnrollError::ServerError {
                status,
                code,
                message,
            } => match DuplicateKind::classify(code.as_deref(), &message) {
                Some(kind) => EnrollError::ServerRejectedDuplicate { kind, message },
                None => EnrollError::ServerError {
                    status,
                    code,
                    message,
                },
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrollError>;
