use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Utc};
use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::config;
use crate::models::models::{PendingLogin, Post, Role, SessionData, User};

/// Repository interface over the backing store. Handlers never touch the
/// store directly; every query the application makes is named here.
pub trait Repo {
    fn user(&self, id: i64) -> Result<Option<User>>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn user_by_nickname(&self, nickname: &str) -> Result<Option<User>>;
    fn create_user(&self, nickname: &str, email: &str, role: Role) -> Result<User>;
    fn save_user(&self, user: &User) -> Result<()>;

    fn create_post(&self, user_id: i64, body: &str) -> Result<Post>;
    fn posts_by_author(&self, user_id: i64) -> Result<Vec<Post>>;
    /// Posts authored by everyone the user follows (the self-follow edge
    /// makes their own posts part of this), newest first, paginated.
    fn followed_posts(&self, user_id: i64, page: usize, per_page: usize) -> Result<Vec<Post>>;

    /// Add an edge to the follower's adjacency set. `false` when the edge
    /// already existed (no duplicate edges).
    fn follow(&self, follower_id: i64, followed_id: i64) -> Result<bool>;
    /// Remove an edge. `false` when there was nothing to remove.
    fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool>;
    fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool>;
    fn followed_ids(&self, user_id: i64) -> Result<Vec<i64>>;
    fn follower_count(&self, user_id: i64) -> Result<usize>;

    fn create_session(&self, user_id: i64, remember: bool) -> Result<String> {
        self.create_session_at(user_id, remember, Utc::now())
    }
    /// Create a session with an explicit creation time. `create_session`
    /// stamps the current time; expiry is judged against `created_at`.
    fn create_session_at(
        &self,
        user_id: i64,
        remember: bool,
        created_at: DateTime<Utc>,
    ) -> Result<String>;
    fn session(&self, token: &str) -> Result<Option<SessionData>>;
    fn delete_session(&self, token: &str) -> Result<()>;

    fn put_pending_login(&self, state: &str, pending: &PendingLogin) -> Result<()>;
    fn take_pending_login(&self, state: &str) -> Result<Option<PendingLogin>>;

    fn push_flash(&self, token: &str, message: &str) -> Result<()>;
    fn take_flashes(&self, token: &str) -> Result<Vec<String>>;
}

/// The post body column is 140 characters wide; longer submissions are
/// truncated on write (the form layer enforces no upper bound).
fn clip_body(body: &str) -> String {
    body.chars().take(config::MAX_POST_LENGTH).collect()
}

fn page_of(mut posts: Vec<Post>, page: usize, per_page: usize) -> Vec<Post> {
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    let start = (page.max(1) - 1) * per_page;
    posts.into_iter().skip(start).take(per_page).collect()
}

// === Spin key-value store backend ===

fn user_key(id: i64) -> String {
    format!("user:{}", id)
}

fn post_key(id: i64) -> String {
    format!("post:{}", id)
}

fn author_posts_key(user_id: i64) -> String {
    format!("posts:{}", user_id)
}

fn followed_key(user_id: i64) -> String {
    format!("followed:{}", user_id)
}

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

fn pending_key(state: &str) -> String {
    format!("pending:{}", state)
}

fn flash_key(token: &str) -> String {
    format!("flash:{}", token)
}

const USER_IDS_KEY: &str = "user_ids";
const NEXT_USER_ID_KEY: &str = "next_user_id";
const NEXT_POST_ID_KEY: &str = "next_post_id";

pub struct KvRepo {
    store: Store,
}

impl KvRepo {
    pub fn open() -> Result<Self> {
        Ok(Self {
            store: Store::open_default()?,
        })
    }

    fn next_id(&self, counter_key: &str) -> Result<i64> {
        let next = self.store.get_json::<i64>(counter_key)?.unwrap_or(0) + 1;
        self.store.set_json(counter_key, &next)?;
        Ok(next)
    }

    fn user_ids(&self) -> Result<Vec<i64>> {
        Ok(self.store.get_json(USER_IDS_KEY)?.unwrap_or_default())
    }
}

impl Repo for KvRepo {
    fn user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.store.get_json(&user_key(id))?)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        for id in self.user_ids()? {
            if let Some(user) = self.store.get_json::<User>(&user_key(id))? {
                if user.email == email {
                    return Ok(Some(user));
                }
            }
        }
        Ok(None)
    }

    fn user_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        for id in self.user_ids()? {
            if let Some(user) = self.store.get_json::<User>(&user_key(id))? {
                if user.nickname == nickname {
                    return Ok(Some(user));
                }
            }
        }
        Ok(None)
    }

    fn create_user(&self, nickname: &str, email: &str, role: Role) -> Result<User> {
        let id = self.next_id(NEXT_USER_ID_KEY)?;
        let user = User {
            id,
            nickname: nickname.to_string(),
            email: email.to_string(),
            role,
            about_me: String::new(),
            last_seen: None,
        };
        self.store.set_json(&user_key(id), &user)?;

        let mut ids = self.user_ids()?;
        ids.push(id);
        self.store.set_json(USER_IDS_KEY, &ids)?;
        Ok(user)
    }

    fn save_user(&self, user: &User) -> Result<()> {
        self.store.set_json(&user_key(user.id), user)?;
        Ok(())
    }

    fn create_post(&self, user_id: i64, body: &str) -> Result<Post> {
        let id = self.next_id(NEXT_POST_ID_KEY)?;
        let post = Post {
            id,
            user_id,
            body: clip_body(body),
            timestamp: Utc::now(),
        };
        self.store.set_json(&post_key(id), &post)?;

        let mut ids: Vec<i64> = self
            .store
            .get_json(&author_posts_key(user_id))?
            .unwrap_or_default();
        ids.insert(0, id); // newest first
        self.store.set_json(&author_posts_key(user_id), &ids)?;
        Ok(post)
    }

    fn posts_by_author(&self, user_id: i64) -> Result<Vec<Post>> {
        let ids: Vec<i64> = self
            .store
            .get_json(&author_posts_key(user_id))?
            .unwrap_or_default();
        let mut posts = Vec::new();
        for id in ids {
            if let Some(post) = self.store.get_json::<Post>(&post_key(id))? {
                posts.push(post);
            }
        }
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    fn followed_posts(&self, user_id: i64, page: usize, per_page: usize) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        for followed in self.followed_ids(user_id)? {
            posts.extend(self.posts_by_author(followed)?);
        }
        Ok(page_of(posts, page, per_page))
    }

    fn follow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let key = followed_key(follower_id);
        let mut followed: Vec<i64> = self.store.get_json(&key)?.unwrap_or_default();
        if followed.contains(&followed_id) {
            return Ok(false);
        }
        followed.push(followed_id);
        self.store.set_json(&key, &followed)?;
        Ok(true)
    }

    fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let key = followed_key(follower_id);
        let mut followed: Vec<i64> = self.store.get_json(&key)?.unwrap_or_default();
        let before = followed.len();
        followed.retain(|id| *id != followed_id);
        if followed.len() == before {
            return Ok(false);
        }
        self.store.set_json(&key, &followed)?;
        Ok(true)
    }

    fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        Ok(self.followed_ids(follower_id)?.contains(&followed_id))
    }

    fn followed_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        Ok(self
            .store
            .get_json(&followed_key(user_id))?
            .unwrap_or_default())
    }

    fn follower_count(&self, user_id: i64) -> Result<usize> {
        let mut count = 0;
        for id in self.user_ids()? {
            if self.followed_ids(id)?.contains(&user_id) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn create_session_at(
        &self,
        user_id: i64,
        remember: bool,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let data = SessionData {
            user_id,
            created_at,
            remember,
        };
        self.store.set_json(&session_key(&token), &data)?;
        Ok(token)
    }

    fn session(&self, token: &str) -> Result<Option<SessionData>> {
        Ok(self.store.get_json(&session_key(token))?)
    }

    fn delete_session(&self, token: &str) -> Result<()> {
        self.store.delete(&session_key(token))?;
        Ok(())
    }

    fn put_pending_login(&self, state: &str, pending: &PendingLogin) -> Result<()> {
        self.store.set_json(&pending_key(state), pending)?;
        Ok(())
    }

    fn take_pending_login(&self, state: &str) -> Result<Option<PendingLogin>> {
        let key = pending_key(state);
        let pending = self.store.get_json(&key)?;
        if pending.is_some() {
            self.store.delete(&key)?;
        }
        Ok(pending)
    }

    fn push_flash(&self, token: &str, message: &str) -> Result<()> {
        let key = flash_key(token);
        let mut messages: Vec<String> = self.store.get_json(&key)?.unwrap_or_default();
        messages.push(message.to_string());
        self.store.set_json(&key, &messages)?;
        Ok(())
    }

    fn take_flashes(&self, token: &str) -> Result<Vec<String>> {
        let key = flash_key(token);
        let messages: Vec<String> = self.store.get_json(&key)?.unwrap_or_default();
        if !messages.is_empty() {
            self.store.delete(&key)?;
        }
        Ok(messages)
    }
}

// === In-memory backend ===
//
// Backs the native development server and the unit tests, where no Spin
// key-value host is available.

#[derive(Default)]
struct MemState {
    users: Vec<User>,
    posts: Vec<Post>,
    followed: HashMap<i64, Vec<i64>>,
    sessions: HashMap<String, SessionData>,
    pending: HashMap<String, PendingLogin>,
    flashes: HashMap<String, Vec<String>>,
    next_user_id: i64,
    next_post_id: i64,
}

#[derive(Default)]
pub struct MemRepo {
    inner: Mutex<MemState>,
}

impl MemRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemState>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("repository lock poisoned"))
    }
}

impl Repo for MemRepo {
    fn user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    fn user_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|u| u.nickname == nickname)
            .cloned())
    }

    fn create_user(&self, nickname: &str, email: &str, role: Role) -> Result<User> {
        let mut state = self.state()?;
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            nickname: nickname.to_string(),
            email: email.to_string(),
            role,
            about_me: String::new(),
            last_seen: None,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    fn save_user(&self, user: &User) -> Result<()> {
        let mut state = self.state()?;
        match state.users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => *slot = user.clone(),
            None => state.users.push(user.clone()),
        }
        Ok(())
    }

    fn create_post(&self, user_id: i64, body: &str) -> Result<Post> {
        let mut state = self.state()?;
        state.next_post_id += 1;
        let post = Post {
            id: state.next_post_id,
            user_id,
            body: clip_body(body),
            timestamp: Utc::now(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    fn posts_by_author(&self, user_id: i64) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .state()?
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    fn followed_posts(&self, user_id: i64, page: usize, per_page: usize) -> Result<Vec<Post>> {
        let followed = self.followed_ids(user_id)?;
        let posts: Vec<Post> = self
            .state()?
            .posts
            .iter()
            .filter(|p| followed.contains(&p.user_id))
            .cloned()
            .collect();
        Ok(page_of(posts, page, per_page))
    }

    fn follow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let mut state = self.state()?;
        let edges = state.followed.entry(follower_id).or_default();
        if edges.contains(&followed_id) {
            return Ok(false);
        }
        edges.push(followed_id);
        Ok(true)
    }

    fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let mut state = self.state()?;
        let edges = state.followed.entry(follower_id).or_default();
        let before = edges.len();
        edges.retain(|id| *id != followed_id);
        Ok(edges.len() != before)
    }

    fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        Ok(self.followed_ids(follower_id)?.contains(&followed_id))
    }

    fn followed_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        Ok(self
            .state()?
            .followed
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn follower_count(&self, user_id: i64) -> Result<usize> {
        Ok(self
            .state()?
            .followed
            .values()
            .filter(|edges| edges.contains(&user_id))
            .count())
    }

    fn create_session_at(
        &self,
        user_id: i64,
        remember: bool,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let data = SessionData {
            user_id,
            created_at,
            remember,
        };
        self.state()?.sessions.insert(token.clone(), data);
        Ok(token)
    }

    fn session(&self, token: &str) -> Result<Option<SessionData>> {
        Ok(self.state()?.sessions.get(token).cloned())
    }

    fn delete_session(&self, token: &str) -> Result<()> {
        self.state()?.sessions.remove(token);
        Ok(())
    }

    fn put_pending_login(&self, state: &str, pending: &PendingLogin) -> Result<()> {
        self.state()?
            .pending
            .insert(state.to_string(), pending.clone());
        Ok(())
    }

    fn take_pending_login(&self, state: &str) -> Result<Option<PendingLogin>> {
        Ok(self.state()?.pending.remove(state))
    }

    fn push_flash(&self, token: &str, message: &str) -> Result<()> {
        self.state()?
            .flashes
            .entry(token.to_string())
            .or_default()
            .push(message.to_string());
        Ok(())
    }

    fn take_flashes(&self, token: &str) -> Result<Vec<String>> {
        Ok(self.state()?.flashes.remove(token).unwrap_or_default())
    }
}
