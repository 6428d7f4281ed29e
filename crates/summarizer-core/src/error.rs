use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummarizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<crate::config_manager::ConfigError> for SummarizerError {
    fn from(err: crate::config_manager::ConfigError) -> Self {
        SummarizerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SummarizerError>;
