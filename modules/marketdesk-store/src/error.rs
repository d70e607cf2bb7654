use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for marketdesk_common::MarketDeskError {
    fn from(e: StoreError) -> Self {
        marketdesk_common::MarketDeskError::Database(e.to_string())
    }
}
