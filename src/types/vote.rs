//! Vote targets and interaction rows.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{PostId, ReplyId, TopicId, UserId};

/// Anything a user can vote on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VoteTarget {
    /// A topic.
    Topic(TopicId),
    /// A post.
    Post(PostId),
    /// A reply.
    Reply(ReplyId),
}

impl VoteTarget {
    /// Lowercase kind name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Topic(_) => "topic",
            Self::Post(_) => "post",
            Self::Reply(_) => "reply",
        }
    }

    /// Raw row id of the target.
    pub fn raw_id(&self) -> i32 {
        match self {
            Self::Topic(id) => id.get(),
            Self::Post(id) => id.get(),
            Self::Reply(id) => id.get(),
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.raw_id())
    }
}

/// One user's vote on one target.
///
/// At most one row exists per `(user_id, target)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Voter.
    pub user_id: UserId,
    /// What was voted on.
    pub target: VoteTarget,
    /// `true` for an upvote, `false` for a downvote.
    pub vote: bool,
}

impl Interaction {
    /// Create an interaction row.
    pub fn new(user_id: UserId, target: VoteTarget, vote: bool) -> Self {
        Self { user_id, target, vote }
    }
}
