//! # siso-forum
//!
//! Backend for a small discussion forum.
//!
//! Users register and log in with a password and receive a signed bearer
//! token. Content is organized as categories, topics, posts and threaded
//! replies. Topics, posts and replies carry per-user up/down votes.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (axum) → ForumService → access / votes → ForumStore (Postgres or Memory)
//!                    ↓
//!              TokenIssuer (HS256)
//! ```
//!
//! ## Visibility
//!
//! Admins see everything. Everyone else sees a category iff it is visible
//! and their privilege row, when present, allows it. Topics, posts and
//! replies inherit their category's visibility.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod forum;
pub mod store;
pub mod types;
pub mod votes;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use access::{can_view_category, can_view_topic, filter_visible};
pub use auth::{hash_password, verify_password, TokenError, TokenIssuer};
pub use config::{AuthConfig, ServerConfig};
pub use error::{ForumError, ForumResult};
pub use forum::{AccessToken, ForumService, PostView, ReplyView, TopicView, VoteOutcome};
pub use store::{ForumStore, InMemoryForumStore, PoolStats, FORUM_SCHEMA};
#[cfg(feature = "postgres")]
pub use store::{PostgresConfig, PostgresForumStore};
pub use types::{
    Category, CategoryAccessPrivilege, CategoryFlags, CategoryId, Interaction, Post, PostId,
    Registration, Reply, ReplyId, Topic, TopicId, User, UserId, UserProfile, VoteTarget,
};
pub use votes::{tally, Tally, VoteDirection};
