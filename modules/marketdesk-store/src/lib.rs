pub mod error;
pub mod market_events;
pub mod posts;
pub mod users;

pub use error::{Result, StoreError};
pub use market_events::{MarketEvent, MarketEventStore};
pub use posts::{NewPost, Post, PostCounts, PostFilter, PostStore};
pub use users::{NewUser, User, UserStore};

use sqlx::PgPool;

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
