use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("executable path is empty")]
    EmptyExecutable,
    #[error("output file path is empty")]
    EmptyOutput,
    #[error("invalid resource request: {0}")]
    InvalidResource(String),
}
