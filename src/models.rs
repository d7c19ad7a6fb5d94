use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::humanize;

/// A registered account.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user attached to threads and replies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub id: i64,
    pub name: String,
}

impl From<&User> for Creator {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// Groups threads; addressed by slug.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Raw `threads` row plus the columns joined in by `thread_repository`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ThreadRow {
    pub id: i64,
    pub category_id: i64,
    pub category_slug: String,
    pub user_id: i64,
    pub creator_name: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub best_reply_id: Option<i64>,
    pub replies_count: i64,
    pub favorites_count: i64,
    pub is_favorited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A discussion topic, always loaded with its creator.
#[derive(Debug, Clone)]
pub struct Thread {
    pub id: i64,
    pub category_id: i64,
    pub category_slug: String,
    pub creator: Creator,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub best_reply_id: Option<i64>,
    pub replies_count: i64,
    pub favorites_count: i64,
    pub is_favorited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            category_slug: row.category_slug,
            creator: Creator {
                id: row.user_id,
                name: row.creator_name,
            },
            slug: row.slug,
            title: row.title,
            body: row.body,
            best_reply_id: row.best_reply_id,
            replies_count: row.replies_count,
            favorites_count: row.favorites_count,
            is_favorited: row.is_favorited,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Thread {
    pub fn is_created_by(&self, user: &User) -> bool {
        self.creator.id == user.id
    }

    pub fn ago(&self) -> String {
        humanize::ago(self.created_at, Utc::now())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReplyRow {
    pub id: i64,
    pub thread_id: i64,
    pub user_id: i64,
    pub creator_name: String,
    pub content: String,
    pub favorites_count: i64,
    pub is_favorited: bool,
    pub is_best: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A response to a thread, always loaded with its creator.
#[derive(Debug, Clone)]
pub struct Reply {
    pub id: i64,
    pub thread_id: i64,
    pub creator: Creator,
    pub content: String,
    pub favorites_count: i64,
    pub is_favorited: bool,
    pub is_best: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReplyRow> for Reply {
    fn from(row: ReplyRow) -> Self {
        Self {
            id: row.id,
            thread_id: row.thread_id,
            creator: Creator {
                id: row.user_id,
                name: row.creator_name,
            },
            content: row.content,
            favorites_count: row.favorites_count,
            is_favorited: row.is_favorited,
            is_best: row.is_best,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Reply {
    pub fn is_created_by(&self, user: &User) -> bool {
        self.creator.id == user.id
    }

    pub fn ago(&self) -> String {
        humanize::ago(self.created_at, Utc::now())
    }
}

/// The entity kinds that can be favorited.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FavoritableKind {
    Thread,
    Reply,
}

impl FavoritableKind {
    /// Value stored in `favorites.favoritable_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            FavoritableKind::Thread => "thread",
            FavoritableKind::Reply => "reply",
        }
    }
}

/// Anything a user can favorite. Backed by the single polymorphic `favorites` table.
pub trait Favoritable {
    const KIND: FavoritableKind;

    fn favoritable_id(&self) -> i64;
}

impl Favoritable for Thread {
    const KIND: FavoritableKind = FavoritableKind::Thread;

    fn favoritable_id(&self) -> i64 {
        self.id
    }
}

impl Favoritable for Reply {
    const KIND: FavoritableKind = FavoritableKind::Reply;

    fn favoritable_id(&self) -> i64 {
        self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ThreadResource {
    pub id: i64,
    pub category_id: i64,
    pub category_slug: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub best_reply_id: Option<i64>,
    pub creator: Creator,
    pub replies_count: i64,
    pub favorites_count: i64,
    pub is_favorited: bool,
    pub ago: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Thread> for ThreadResource {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id,
            category_id: thread.category_id,
            category_slug: thread.category_slug.clone(),
            slug: thread.slug.clone(),
            title: thread.title.clone(),
            body: thread.body.clone(),
            best_reply_id: thread.best_reply_id,
            creator: thread.creator.clone(),
            replies_count: thread.replies_count,
            favorites_count: thread.favorites_count,
            is_favorited: thread.is_favorited,
            ago: thread.ago(),
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReplyResource {
    pub id: i64,
    pub thread_id: i64,
    pub content: String,
    pub creator: Creator,
    pub favorites_count: i64,
    pub is_favorited: bool,
    pub is_best: bool,
    pub ago: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Reply> for ReplyResource {
    fn from(reply: &Reply) -> Self {
        Self {
            id: reply.id,
            thread_id: reply.thread_id,
            content: reply.content.clone(),
            creator: reply.creator.clone(),
            favorites_count: reply.favorites_count,
            is_favorited: reply.is_favorited,
            is_best: reply.is_best,
            ago: reply.ago(),
            created_at: reply.created_at,
            updated_at: reply.updated_at,
        }
    }
}

/// Returned by the favorite toggles.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FavoriteStatus {
    pub favorited: bool,
    pub favorites_count: i64,
}

/// Returned by register and login.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_row(user_id: i64) -> ReplyRow {
        let now = Utc::now();
        ReplyRow {
            id: 3,
            thread_id: 9,
            user_id,
            creator_name: "Jane".into(),
            content: "hello".into(),
            favorites_count: 2,
            is_favorited: false,
            is_best: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            name: "Jane".into(),
            email: "jane@example.com".into(),
            password_hash: "secret-hash".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reply_resource_carries_creator_and_ago() {
        let reply = Reply::from(reply_row(5));
        let resource = ReplyResource::from(&reply);
        assert_eq!(resource.creator, Creator { id: 5, name: "Jane".into() });
        assert!(resource.ago.ends_with("ago"));
        assert!(resource.is_best);
    }

    #[test]
    fn ownership_compares_creator_ids() {
        let reply = Reply::from(reply_row(5));
        assert!(reply.is_created_by(&user(5)));
        assert!(!reply.is_created_by(&user(6)));
    }

    #[test]
    fn user_json_hides_password_hash() {
        let json = serde_json::to_value(user(1)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "jane@example.com");
    }

    #[test]
    fn favoritable_kinds_are_distinct() {
        assert_eq!(<Thread as Favoritable>::KIND.as_str(), "thread");
        assert_eq!(<Reply as Favoritable>::KIND.as_str(), "reply");
    }
}
