//! Core row types for the forum.

pub mod ids;
pub mod user;
pub mod category;
pub mod content;
pub mod vote;

pub use ids::{UserId, CategoryId, TopicId, PostId, ReplyId};
pub use user::{User, NewUser, Registration, UserProfile, MAX_SHORT_TEXT};
pub use category::{
    Category, NewCategory, CategoryFlags, CategorySummary, CategoryAccessPrivilege,
};
pub use content::{Topic, NewTopic, Post, NewPost, Reply, NewReply};
pub use vote::{VoteTarget, Interaction};
