use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDeskError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("News provider error: {0}")]
    Provider(String),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Email delivery error: {0}")]
    Email(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
