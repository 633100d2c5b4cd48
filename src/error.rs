use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact not found at {0}")]
    NotFound(String),

    #[error("malformed artifact {path}: {message}")]
    Malformed { path: String, message: String },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("prediction failed: {0}")]
    Prediction(String),
}

#[derive(Error, Debug)]
pub enum PingError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {0}")]
    Status(u16),
}
