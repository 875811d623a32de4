use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub email: String,
    pub role: Role,
    pub about_me: String,
    pub last_seen: Option<DateTime<Utc>>,
}

impl User {
    /// Gravatar URL for this user's email, scaled to `size` pixels.
    pub fn avatar(&self, size: u32) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.email.as_bytes());
        format!(
            "http://www.gravatar.com/avatar/{:x}?d=mm&s={}",
            hasher.finalize(),
            size
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SessionData {
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub remember: bool,
}

/// Transient state parked between the login form submission and the
/// identity provider's assertion callback. Consumed exactly once.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PendingLogin {
    pub remember: bool,
    pub next: Option<String>,
}
