use history::HistoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TrackerError {
    /// False only for faults that must stop the process (clock skew).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::History(e) => e.is_recoverable(),
            Self::Storage(_) => true,
            Self::Config(_) => false,
        }
    }
}
