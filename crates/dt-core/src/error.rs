use thiserror::Error;

pub type DtResult<T> = Result<T, DtError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DtError {
    #[error("Malformed init data for twin {twin_id}: {reason}")]
    InitData { twin_id: String, reason: String },

    #[error("Model document is missing a string '@id' field")]
    MissingModelId,
}
