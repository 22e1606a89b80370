use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("exact alarm permission denied: {0}")]
    PermissionDenied(String),
    #[error("task {0} not found")]
    NotFound(i32),
    #[error("no signed-in user")]
    Unauthenticated,
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, ReminderError>;
