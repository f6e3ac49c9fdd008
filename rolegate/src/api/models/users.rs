//! API response model for users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db::models::users::User, types::UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
