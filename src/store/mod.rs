//! Forum storage backends.

pub mod memory;
pub mod schema;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{
    Category, CategoryAccessPrivilege, CategoryFlags, CategoryId, Interaction, NewCategory,
    NewPost, NewReply, NewTopic, NewUser, Post, PostId, Reply, ReplyId, Topic, TopicId, User,
    UserId, VoteTarget,
};
use crate::votes::VoteDirection;

/// Trait for forum storage backends.
///
/// Implementations hold the at-most-one-row invariants for privileges
/// `(user, category)` and interactions `(user, target)`. Inserts that would
/// break a unique key report `None` instead of an error. List methods return
/// rows ordered by id.
#[async_trait]
pub trait ForumStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    // ---- users ----

    /// Fetch a user by username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, Self::Error>;

    /// Whether a user with this username or this email already exists.
    async fn user_exists(&self, username: &str, email: &str) -> Result<bool, Self::Error>;

    /// Insert a non-admin user. `None` if username or email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Self::Error>;

    /// Set or clear the admin flag. `None` if the user does not exist.
    async fn set_user_admin(&self, id: UserId, admin: bool) -> Result<Option<User>, Self::Error>;

    // ---- categories ----

    /// All categories.
    async fn list_categories(&self) -> Result<Vec<Category>, Self::Error>;

    /// Fetch a category by id.
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, Self::Error>;

    /// Insert a visible, unlocked category. `None` if the name is taken.
    async fn insert_category(&self, category: NewCategory) -> Result<Option<Category>, Self::Error>;

    /// Update visibility and/or locked flags. `None` if the category does not exist.
    async fn update_category_flags(
        &self,
        id: CategoryId,
        flags: CategoryFlags,
    ) -> Result<Option<Category>, Self::Error>;

    // ---- privileges ----

    /// The unique privilege row for `(user, category)`, if any.
    async fn get_privilege(
        &self,
        user: UserId,
        category: CategoryId,
    ) -> Result<Option<CategoryAccessPrivilege>, Self::Error>;

    /// Every privilege row held by `user`.
    async fn privileges_for_user(&self, user: UserId) -> Result<Vec<CategoryAccessPrivilege>, Self::Error>;

    /// Create or overwrite the privilege row for `(user, category)`.
    async fn upsert_privilege(
        &self,
        user: UserId,
        category: CategoryId,
        permission_type: bool,
    ) -> Result<CategoryAccessPrivilege, Self::Error>;

    /// Delete the privilege row. Returns whether a row existed.
    async fn delete_privilege(&self, user: UserId, category: CategoryId) -> Result<bool, Self::Error>;

    // ---- topics, posts, replies ----

    /// Fetch a topic by id.
    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, Self::Error>;

    /// Topics in a category.
    async fn list_topics(&self, category: CategoryId) -> Result<Vec<Topic>, Self::Error>;

    /// Insert a topic.
    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic, Self::Error>;

    /// Fetch a post by id.
    async fn get_post(&self, id: PostId) -> Result<Option<Post>, Self::Error>;

    /// Posts in a topic.
    async fn list_posts(&self, topic: TopicId) -> Result<Vec<Post>, Self::Error>;

    /// Insert a post.
    async fn insert_post(&self, post: NewPost) -> Result<Post, Self::Error>;

    /// Fetch a reply by id.
    async fn get_reply(&self, id: ReplyId) -> Result<Option<Reply>, Self::Error>;

    /// Replies to a post.
    async fn list_replies(&self, post: PostId) -> Result<Vec<Reply>, Self::Error>;

    /// Insert a reply.
    async fn insert_reply(&self, reply: NewReply) -> Result<Reply, Self::Error>;

    // ---- votes ----

    /// Every interaction row on `target`, ordered by user id.
    async fn list_interactions(&self, target: VoteTarget) -> Result<Vec<Interaction>, Self::Error>;

    /// Apply a vote change atomically and return the target's rows afterwards.
    ///
    /// The read of the actor's current row, the mutation chosen by
    /// [`crate::votes::plan_vote`] and the re-read happen in one unit of work.
    async fn apply_vote(
        &self,
        actor: UserId,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<Vec<Interaction>, Self::Error>;

    // ---- health ----

    /// Whether the backend can serve queries.
    async fn is_healthy(&self) -> bool {
        true
    }

    /// Connection pool statistics, for backends that pool connections.
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

pub use memory::InMemoryForumStore;
pub use schema::FORUM_SCHEMA;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresForumStore};
