//! Forum operations.
//!
//! [`ForumService`] wires the credential and token modules, the visibility
//! resolver and the vote aggregator against a [`ForumStore`]. Each method is
//! one request's worth of work and either completes or returns a
//! [`ForumError`].

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::{can_view_topic, category_visible_to, filter_visible};
use crate::auth::{hash_password, verify_password, TokenIssuer};
use crate::error::{ForumError, ForumResult};
use crate::store::ForumStore;
use crate::types::{
    Category, CategoryAccessPrivilege, CategoryFlags, CategoryId, NewCategory, NewPost, NewReply,
    NewTopic, NewUser, Post, PostId, Registration, Reply, ReplyId, Topic, TopicId, User,
    UserProfile, VoteTarget, MAX_SHORT_TEXT,
};
use crate::votes::{tally, Tally, VoteDirection};

/// Bearer token returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Signed session token.
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
}

/// A post with its tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    /// The post row.
    pub post: Post,
    /// Net score.
    pub interactions: i64,
    /// The caller's own vote.
    pub user_vote: Option<bool>,
}

/// A topic with its tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicView {
    /// The topic row.
    pub topic: Topic,
    /// Net score.
    pub score: i64,
    /// The caller's own vote.
    pub user_vote: Option<bool>,
}

/// A reply with its tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyView {
    /// The reply row.
    pub reply: Reply,
    /// Net score.
    pub score: i64,
    /// The caller's own vote.
    pub user_vote: Option<bool>,
}

/// State of a target after a vote change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    /// What was voted on.
    pub target: VoteTarget,
    /// Net score after the change.
    pub score: i64,
    /// The voter's stored vote after the change.
    pub user_vote: Option<bool>,
}

impl VoteOutcome {
    fn new(target: VoteTarget, tally: Tally) -> Self {
        Self {
            target,
            score: tally.score,
            user_vote: tally.caller_vote,
        }
    }
}

/// Forum operations over a storage backend.
pub struct ForumService<S: ForumStore> {
    store: Arc<S>,
    tokens: Arc<TokenIssuer>,
}

impl<S: ForumStore> Clone for ForumService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl<S: ForumStore> ForumService<S> {
    /// Create a service over `store` issuing tokens with `tokens`.
    pub fn new(store: Arc<S>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Register a new non-admin account.
    pub async fn register(&self, registration: Registration) -> ForumResult<User> {
        validate_registration(&registration)?;

        let taken = self
            .store
            .user_exists(&registration.username, &registration.email)
            .await
            .map_err(ForumError::from_store)?;
        if taken {
            return Err(ForumError::Conflict("Invalid credentials".to_string()));
        }

        let new_user = NewUser {
            hashed_password: hash_password(&registration.password),
            username: registration.username,
            email: registration.email,
            age: registration.age,
            nickname: registration.nickname,
            registration_date: Utc::now().date_naive(),
        };

        let user = self
            .store
            .insert_user(new_user)
            .await
            .map_err(ForumError::from_store)?
            .ok_or_else(|| ForumError::Conflict("Invalid credentials".to_string()))?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Check a username/password pair and issue a session token.
    pub async fn login(&self, username: &str, password: &str) -> ForumResult<AccessToken> {
        let user = self
            .store
            .find_user_by_username(username)
            .await
            .map_err(ForumError::from_store)?
            .ok_or(ForumError::InvalidCredentials)?;

        if !verify_password(password, &user.hashed_password) {
            tracing::debug!(username = %username, "Login rejected");
            return Err(ForumError::InvalidCredentials);
        }

        let access_token = self.tokens.issue(&user.username)?;
        Ok(AccessToken {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> ForumResult<User> {
        let username = self.tokens.validate(token)?;
        self.store
            .find_user_by_username(&username)
            .await
            .map_err(ForumError::from_store)?
            .ok_or_else(|| ForumError::Unauthenticated("Invalid credentials".to_string()))
    }

    /// Admin's own profile. Fails with `Forbidden` for non-admins.
    pub fn admin_profile(&self, user: &User) -> ForumResult<UserProfile> {
        require_admin(user)?;
        Ok(user.profile())
    }

    /// Grant or revoke the admin flag of another account.
    pub async fn set_admin(&self, admin: &User, username: &str, flag: bool) -> ForumResult<UserProfile> {
        require_admin(admin)?;
        let target = self.user_by_name(username).await?;
        let updated = self
            .store
            .set_user_admin(target.id, flag)
            .await
            .map_err(ForumError::from_store)?
            .ok_or(ForumError::NotFound("User"))?;
        info!(by = %admin.id, user_id = %updated.id, admin = flag, "Admin flag changed");
        Ok(updated.profile())
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// Categories visible to `user`.
    pub async fn visible_categories(&self, user: &User) -> ForumResult<Vec<Category>> {
        let categories = self.store.list_categories().await.map_err(ForumError::from_store)?;
        if user.admin {
            return Ok(categories);
        }
        let privileges = self
            .store
            .privileges_for_user(user.id)
            .await
            .map_err(ForumError::from_store)?;
        Ok(filter_visible(user, categories, &privileges))
    }

    /// Create a visible, unlocked category. Admin only.
    pub async fn add_category(&self, admin: &User, name: &str, description: &str) -> ForumResult<Category> {
        require_admin(admin)?;
        require_text("name", name, MAX_SHORT_TEXT)?;

        let category = self
            .store
            .insert_category(NewCategory {
                name: name.to_string(),
                description: description.to_string(),
            })
            .await
            .map_err(ForumError::from_store)?
            .ok_or_else(|| ForumError::Conflict(format!("Category with name {name} already exists.")))?;

        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Change a category's visibility or locked flag. Admin only.
    pub async fn update_category(
        &self,
        admin: &User,
        id: CategoryId,
        flags: CategoryFlags,
    ) -> ForumResult<Category> {
        require_admin(admin)?;
        self.store
            .update_category_flags(id, flags)
            .await
            .map_err(ForumError::from_store)?
            .ok_or(ForumError::NotFound("Category"))
    }

    /// Set the privilege override of `username` on a category. Admin only.
    pub async fn set_privilege(
        &self,
        admin: &User,
        category_id: CategoryId,
        username: &str,
        allow: bool,
    ) -> ForumResult<CategoryAccessPrivilege> {
        require_admin(admin)?;
        let category = self.category(category_id).await?;
        let target = self.user_by_name(username).await?;

        let privilege = self
            .store
            .upsert_privilege(target.id, category.id, allow)
            .await
            .map_err(ForumError::from_store)?;
        info!(
            category_id = %category.id,
            user_id = %target.id,
            allow = allow,
            "Category privilege set"
        );
        Ok(privilege)
    }

    /// Remove the privilege override of `username` on a category. Admin only.
    pub async fn clear_privilege(&self, admin: &User, category_id: CategoryId, username: &str) -> ForumResult<()> {
        require_admin(admin)?;
        let target = self.user_by_name(username).await?;
        let removed = self
            .store
            .delete_privilege(target.id, category_id)
            .await
            .map_err(ForumError::from_store)?;
        if !removed {
            return Err(ForumError::NotFound("Privilege"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Topics
    // ------------------------------------------------------------------

    /// Topics in a category the user can see.
    pub async fn list_topics(&self, user: &User, category_id: CategoryId) -> ForumResult<Vec<Topic>> {
        self.visible_category(user, category_id).await?;
        self.store.list_topics(category_id).await.map_err(ForumError::from_store)
    }

    /// Open a topic in a category the user can see.
    pub async fn create_topic(
        &self,
        user: &User,
        category_id: CategoryId,
        title: &str,
        description: Option<String>,
    ) -> ForumResult<Topic> {
        require_text("title", title, MAX_SHORT_TEXT)?;
        let category = self.visible_category(user, category_id).await?;

        let topic = self
            .store
            .insert_topic(NewTopic {
                title: title.to_string(),
                description,
                user_id: user.id,
                category_id: category.id,
            })
            .await
            .map_err(ForumError::from_store)?;
        info!(topic_id = %topic.id, category_id = %category.id, user_id = %user.id, "Topic created");
        Ok(topic)
    }

    /// A topic with its tally.
    pub async fn view_topic(&self, user: &User, topic_id: TopicId) -> ForumResult<TopicView> {
        let (topic, _) = can_view_topic(self.store.as_ref(), user, topic_id).await?;
        let t = self.tally_for(user, VoteTarget::Topic(topic.id)).await?;
        Ok(TopicView {
            topic,
            score: t.score,
            user_vote: t.caller_vote,
        })
    }

    /// Posts in a topic.
    pub async fn topic_posts(&self, user: &User, topic_id: TopicId) -> ForumResult<Vec<Post>> {
        let (topic, _) = can_view_topic(self.store.as_ref(), user, topic_id).await?;
        self.store.list_posts(topic.id).await.map_err(ForumError::from_store)
    }

    // ------------------------------------------------------------------
    // Posts and replies
    // ------------------------------------------------------------------

    /// Add a post to a topic.
    pub async fn add_post(
        &self,
        user: &User,
        topic_id: TopicId,
        content: &str,
        title: Option<String>,
    ) -> ForumResult<Post> {
        require_text("content", content, usize::MAX)?;
        let (topic, _) = can_view_topic(self.store.as_ref(), user, topic_id).await?;

        let post = self
            .store
            .insert_post(NewPost {
                title,
                content: content.to_string(),
                user_id: user.id,
                topic_id: topic.id,
                category_id: topic.category_id,
            })
            .await
            .map_err(ForumError::from_store)?;
        info!(post_id = %post.id, topic_id = %topic.id, user_id = %user.id, "Post created");
        Ok(post)
    }

    /// A post with its tally.
    pub async fn view_post(&self, user: &User, post_id: PostId) -> ForumResult<PostView> {
        let post = self.visible_post(user, post_id).await?;
        let t = self.tally_for(user, VoteTarget::Post(post.id)).await?;
        Ok(PostView {
            post,
            interactions: t.score,
            user_vote: t.caller_vote,
        })
    }

    /// Reply to a post, optionally under another reply on the same post.
    pub async fn add_reply(
        &self,
        user: &User,
        post_id: PostId,
        parent: Option<ReplyId>,
        content: &str,
    ) -> ForumResult<Reply> {
        require_text("content", content, usize::MAX)?;
        let post = self.visible_post(user, post_id).await?;

        if let Some(parent_id) = parent {
            let parent_reply = self
                .store
                .get_reply(parent_id)
                .await
                .map_err(ForumError::from_store)?
                .ok_or(ForumError::NotFound("Reply"))?;
            if parent_reply.post_id != post.id {
                return Err(ForumError::InvalidInput(format!(
                    "reply {parent_id} belongs to another post"
                )));
            }
        }

        let reply = self
            .store
            .insert_reply(NewReply {
                post_id: post.id,
                reply_id: parent,
                user_id: user.id,
                content: content.to_string(),
            })
            .await
            .map_err(ForumError::from_store)?;
        info!(reply_id = %reply.id, post_id = %post.id, user_id = %user.id, "Reply created");
        Ok(reply)
    }

    /// Replies to a post, each with its tally.
    pub async fn post_replies(&self, user: &User, post_id: PostId) -> ForumResult<Vec<ReplyView>> {
        let post = self.visible_post(user, post_id).await?;
        let replies = self.store.list_replies(post.id).await.map_err(ForumError::from_store)?;

        let mut views = Vec::with_capacity(replies.len());
        for reply in replies {
            let t = self.tally_for(user, VoteTarget::Reply(reply.id)).await?;
            views.push(ReplyView {
                reply,
                score: t.score,
                user_vote: t.caller_vote,
            });
        }
        Ok(views)
    }

    // ------------------------------------------------------------------
    // Votes
    // ------------------------------------------------------------------

    /// Set or clear the user's vote on a target and return the new tally.
    ///
    /// `requested` must be `-1`, `0` or `1`.
    pub async fn vote(&self, user: &User, target: VoteTarget, requested: i64) -> ForumResult<VoteOutcome> {
        let direction = VoteDirection::try_from(requested)?;
        self.ensure_target_visible(user, target).await?;

        let rows = self
            .store
            .apply_vote(user.id, target, direction)
            .await
            .map_err(ForumError::from_store)?;
        let outcome = VoteOutcome::new(target, tally(target, &rows, user.id));

        info!(
            user_id = %user.id,
            target = %target,
            direction = ?direction,
            score = outcome.score,
            "Vote recorded"
        );
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn tally_for(&self, user: &User, target: VoteTarget) -> ForumResult<Tally> {
        let rows = self
            .store
            .list_interactions(target)
            .await
            .map_err(ForumError::from_store)?;
        Ok(tally(target, &rows, user.id))
    }

    async fn ensure_target_visible(&self, user: &User, target: VoteTarget) -> ForumResult<()> {
        match target {
            VoteTarget::Topic(id) => {
                can_view_topic(self.store.as_ref(), user, id).await?;
            }
            VoteTarget::Post(id) => {
                self.visible_post(user, id).await?;
            }
            VoteTarget::Reply(id) => {
                let reply = self
                    .store
                    .get_reply(id)
                    .await
                    .map_err(ForumError::from_store)?
                    .ok_or(ForumError::NotFound("Reply"))?;
                self.visible_post(user, reply.post_id).await?;
            }
        }
        Ok(())
    }

    async fn visible_post(&self, user: &User, post_id: PostId) -> ForumResult<Post> {
        let post = self
            .store
            .get_post(post_id)
            .await
            .map_err(ForumError::from_store)?
            .ok_or(ForumError::NotFound("Post"))?;
        can_view_topic(self.store.as_ref(), user, post.topic_id).await?;
        Ok(post)
    }

    async fn category(&self, id: CategoryId) -> ForumResult<Category> {
        self.store
            .get_category(id)
            .await
            .map_err(ForumError::from_store)?
            .ok_or(ForumError::NotFound("Category"))
    }

    async fn visible_category(&self, user: &User, id: CategoryId) -> ForumResult<Category> {
        let category = self.category(id).await?;
        if !category_visible_to(self.store.as_ref(), user, &category).await? {
            return Err(ForumError::access_denied());
        }
        Ok(category)
    }

    async fn user_by_name(&self, username: &str) -> ForumResult<User> {
        self.store
            .find_user_by_username(username)
            .await
            .map_err(ForumError::from_store)?
            .ok_or(ForumError::NotFound("User"))
    }
}

/// Fail with `Forbidden` unless `user` is an admin.
pub fn require_admin(user: &User) -> ForumResult<()> {
    if user.admin {
        Ok(())
    } else {
        Err(ForumError::Forbidden(
            "You do not have permission to access this page.".to_string(),
        ))
    }
}

fn require_text(field: &str, value: &str, max_len: usize) -> ForumResult<()> {
    if value.trim().is_empty() {
        return Err(ForumError::InvalidInput(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(ForumError::InvalidInput(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(())
}

fn validate_registration(registration: &Registration) -> ForumResult<()> {
    require_text("username", &registration.username, MAX_SHORT_TEXT)?;
    require_text("email", &registration.email, MAX_SHORT_TEXT)?;
    // Hashed verbatim, so whitespace is significant.
    if registration.password.is_empty() {
        return Err(ForumError::InvalidInput("password must not be empty".to_string()));
    }
    if let Some(nickname) = &registration.nickname {
        require_text("nickname", nickname, MAX_SHORT_TEXT)?;
    }
    if registration.age < 0 {
        return Err(ForumError::InvalidInput("age must not be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryForumStore;

    fn service() -> ForumService<InMemoryForumStore> {
        ForumService::new(
            Arc::new(InMemoryForumStore::new()),
            Arc::new(TokenIssuer::with_default_ttl(b"unit_test_secret")),
        )
    }

    fn registration(name: &str) -> Registration {
        Registration {
            username: name.to_string(),
            password: "pw".to_string(),
            email: format!("{name}@example.com"),
            age: 21,
            nickname: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let forum = service();
        let user = forum.register(registration("alice")).await.unwrap();
        assert!(!user.admin);
        assert_ne!(user.hashed_password, "pw");

        let token = forum.login("alice", "pw").await.unwrap();
        assert_eq!(token.token_type, "bearer");

        let authed = forum.authenticate(&token.access_token).await.unwrap();
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let forum = service();
        forum.register(registration("alice")).await.unwrap();
        let err = forum.register(registration("alice")).await.unwrap_err();
        assert!(matches!(err, ForumError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_bad_login() {
        let forum = service();
        forum.register(registration("alice")).await.unwrap();
        assert!(matches!(
            forum.login("alice", "wrong").await,
            Err(ForumError::InvalidCredentials)
        ));
        assert!(matches!(
            forum.login("nobody", "pw").await,
            Err(ForumError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let forum = service();
        let mut bad = registration("alice");
        bad.username = "x".repeat(MAX_SHORT_TEXT + 1);
        assert!(matches!(forum.register(bad).await, Err(ForumError::InvalidInput(_))));

        let mut bad = registration("bob");
        bad.password = String::new();
        assert!(matches!(forum.register(bad).await, Err(ForumError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_whitespace_password_is_kept_verbatim() {
        let forum = service();
        let mut spaced = registration("carol");
        spaced.password = "   ".to_string();
        forum.register(spaced).await.unwrap();

        assert!(forum.login("carol", "   ").await.is_ok());
        assert!(matches!(
            forum.login("carol", "").await,
            Err(ForumError::InvalidCredentials)
        ));
        assert!(matches!(
            forum.login("carol", " ").await,
            Err(ForumError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_add_category() {
        let forum = service();
        let user = forum.register(registration("alice")).await.unwrap();
        let err = forum.add_category(&user, "General", "d").await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
