//! Topics, posts and replies.

use serde::{Deserialize, Serialize};

use super::ids::{CategoryId, PostId, ReplyId, TopicId, UserId};

/// A discussion thread inside a category.
///
/// A topic has no visibility of its own; it inherits its category's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Row id.
    pub id: TopicId,
    /// Headline, at most 45 characters.
    pub title: String,
    /// Optional longer introduction.
    pub description: Option<String>,
    /// Stored but not enforced.
    pub locked: bool,
    /// Author.
    pub user_id: UserId,
    /// Owning category.
    pub category_id: CategoryId,
}

/// Row to insert into `topics`.
#[derive(Debug, Clone)]
pub struct NewTopic {
    /// Headline.
    pub title: String,
    /// Optional introduction.
    pub description: Option<String>,
    /// Author.
    pub user_id: UserId,
    /// Owning category.
    pub category_id: CategoryId,
}

/// A message posted in a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Row id.
    pub id: PostId,
    /// Optional subject line.
    pub title: Option<String>,
    /// Message body.
    pub content: String,
    /// Author.
    pub user_id: UserId,
    /// Topic the post belongs to.
    pub topic_id: TopicId,
    /// Copied from the topic at insert time.
    pub category_id: CategoryId,
}

/// Row to insert into `posts`.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Optional subject line.
    pub title: Option<String>,
    /// Message body.
    pub content: String,
    /// Author.
    pub user_id: UserId,
    /// Topic the post belongs to.
    pub topic_id: TopicId,
    /// The topic's category.
    pub category_id: CategoryId,
}

/// An answer to a post, optionally threaded under another reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Row id.
    pub id: ReplyId,
    /// Post being answered.
    pub post_id: PostId,
    /// Parent reply on the same post, if threaded.
    pub reply_id: Option<ReplyId>,
    /// Author.
    pub user_id: UserId,
    /// Message body.
    pub content: String,
}

/// Row to insert into `replies`.
#[derive(Debug, Clone)]
pub struct NewReply {
    /// Post being answered.
    pub post_id: PostId,
    /// Parent reply, if threaded.
    pub reply_id: Option<ReplyId>,
    /// Author.
    pub user_id: UserId,
    /// Message body.
    pub content: String,
}
