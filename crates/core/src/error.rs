use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocbenchError {
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
}
