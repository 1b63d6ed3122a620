//! Error taxonomy for training, evaluation and facade operations.

use blithe_data::DataError;

use crate::hub::HubError;

/// Errors surfaced by the task facades and the trainer dispatch.
///
/// Argument validation happens before any load, tokenize or train work, so a
/// misconfiguration never wastes a run.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}")]
    DeviceUnsupported(String),
    #[error("{0} is currently not available for this task")]
    NotSupported(&'static str),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("failed to read or write a model record: {0}")]
    Recorder(#[from] burn::record::RecorderError),
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to serialize facade configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Single-example inference input must be a non-empty string.
pub(crate) fn validate_text_input(text: &str) -> Result<(), TrainError> {
    if text.is_empty() {
        return Err(TrainError::InvalidArgument(
            "the text input must have at least one character".to_string(),
        ));
    }
    Ok(())
}
