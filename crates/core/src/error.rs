use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Evidence contradiction: {0}")]
    EvidenceContradiction(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Corpus is empty: {0}")]
    EmptyCorpus(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AiError>;
