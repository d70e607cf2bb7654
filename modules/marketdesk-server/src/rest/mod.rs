//! REST handlers under /api/v1.

pub mod auth;
pub mod market_events;
pub mod posts;
pub mod users;

use serde::Serialize;
use uuid::Uuid;

use marketdesk_store::User;

/// Public view of a user account.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_verified: user.is_verified,
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// Clamp pagination input: page >= 1, 1 <= limit <= 100.
pub(crate) fn clamp_page(page: i64, limit: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);
    (page, limit, (page - 1) * limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(clamp_page(0, 10), (1, 10, 0));
        assert_eq!(clamp_page(3, 500), (3, 100, 200));
        assert_eq!(clamp_page(2, 0), (2, 1, 1));
    }
}
