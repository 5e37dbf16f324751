use thiserror::Error;

#[derive(Debug, Error)]
pub enum TickerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TickerError {
    /// Short machine-readable code, used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            TickerError::Config(_) => "CONFIG_ERROR",
            TickerError::Io(_) => "IO_ERROR",
        }
    }
}

impl From<figment::Error> for TickerError {
    fn from(e: figment::Error) -> Self {
        TickerError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TickerError>;
