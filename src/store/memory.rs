//! In-memory forum store for testing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::ForumStore;
use crate::types::{
    Category, CategoryAccessPrivilege, CategoryFlags, CategoryId, Interaction, NewCategory,
    NewPost, NewReply, NewTopic, NewUser, Post, PostId, Reply, ReplyId, Topic, TopicId, User,
    UserId, VoteTarget,
};
use crate::votes::{apply_mutation, plan_vote, VoteDirection};

/// Error type for in-memory store.
///
/// Raised when an insert references a parent row that does not exist, the
/// case a foreign key would reject in PostgreSQL.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Referenced row is missing.
    #[error("Row not found: {0}")]
    RowNotFound(String),
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    privileges: BTreeMap<(UserId, CategoryId), CategoryAccessPrivilege>,
    topics: BTreeMap<TopicId, Topic>,
    posts: BTreeMap<PostId, Post>,
    replies: BTreeMap<ReplyId, Reply>,
    interactions: Vec<Interaction>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory forum store for testing.
///
/// A single mutex guards every table, so each trait call is atomic.
/// Ids come from one shared counter starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryForumStore {
    tables: Mutex<Tables>,
}

impl InMemoryForumStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of interaction rows across all targets.
    pub fn num_interactions(&self) -> usize {
        self.tables.lock().interactions.len()
    }

    /// Number of privilege rows.
    pub fn num_privileges(&self) -> usize {
        self.tables.lock().privileges.len()
    }
}

#[async_trait]
impl ForumStore for InMemoryForumStore {
    type Error = InMemoryError;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, Self::Error> {
        let tables = self.tables.lock();
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_exists(&self, username: &str, email: &str) -> Result<bool, Self::Error> {
        let tables = self.tables.lock();
        Ok(tables
            .users
            .values()
            .any(|u| u.username == username || u.email == email))
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Self::Error> {
        let mut tables = self.tables.lock();
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Ok(None);
        }
        let id = UserId::new(tables.next_id());
        let row = User {
            id,
            username: user.username,
            hashed_password: user.hashed_password,
            email: user.email,
            age: user.age,
            nickname: user.nickname,
            registration_date: user.registration_date,
            admin: false,
        };
        tables.users.insert(id, row.clone());
        Ok(Some(row))
    }

    async fn set_user_admin(&self, id: UserId, admin: bool) -> Result<Option<User>, Self::Error> {
        let mut tables = self.tables.lock();
        Ok(tables.users.get_mut(&id).map(|u| {
            u.admin = admin;
            u.clone()
        }))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, Self::Error> {
        Ok(self.tables.lock().categories.values().cloned().collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, Self::Error> {
        Ok(self.tables.lock().categories.get(&id).cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Option<Category>, Self::Error> {
        let mut tables = self.tables.lock();
        if tables.categories.values().any(|c| c.name == category.name) {
            return Ok(None);
        }
        let id = CategoryId::new(tables.next_id());
        let row = Category {
            id,
            name: category.name,
            description: category.description,
            visibility: true,
            locked: false,
        };
        tables.categories.insert(id, row.clone());
        Ok(Some(row))
    }

    async fn update_category_flags(
        &self,
        id: CategoryId,
        flags: CategoryFlags,
    ) -> Result<Option<Category>, Self::Error> {
        let mut tables = self.tables.lock();
        Ok(tables.categories.get_mut(&id).map(|c| {
            if let Some(visibility) = flags.visibility {
                c.visibility = visibility;
            }
            if let Some(locked) = flags.locked {
                c.locked = locked;
            }
            c.clone()
        }))
    }

    async fn get_privilege(
        &self,
        user: UserId,
        category: CategoryId,
    ) -> Result<Option<CategoryAccessPrivilege>, Self::Error> {
        Ok(self.tables.lock().privileges.get(&(user, category)).copied())
    }

    async fn privileges_for_user(&self, user: UserId) -> Result<Vec<CategoryAccessPrivilege>, Self::Error> {
        let tables = self.tables.lock();
        Ok(tables
            .privileges
            .values()
            .filter(|p| p.user_id == user)
            .copied()
            .collect())
    }

    async fn upsert_privilege(
        &self,
        user: UserId,
        category: CategoryId,
        permission_type: bool,
    ) -> Result<CategoryAccessPrivilege, Self::Error> {
        let row = CategoryAccessPrivilege {
            user_id: user,
            category_id: category,
            permission_type,
        };
        self.tables.lock().privileges.insert((user, category), row);
        Ok(row)
    }

    async fn delete_privilege(&self, user: UserId, category: CategoryId) -> Result<bool, Self::Error> {
        Ok(self.tables.lock().privileges.remove(&(user, category)).is_some())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, Self::Error> {
        Ok(self.tables.lock().topics.get(&id).cloned())
    }

    async fn list_topics(&self, category: CategoryId) -> Result<Vec<Topic>, Self::Error> {
        let tables = self.tables.lock();
        Ok(tables
            .topics
            .values()
            .filter(|t| t.category_id == category)
            .cloned()
            .collect())
    }

    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic, Self::Error> {
        let mut tables = self.tables.lock();
        if !tables.categories.contains_key(&topic.category_id) {
            return Err(InMemoryError::RowNotFound(format!("category {}", topic.category_id)));
        }
        let id = TopicId::new(tables.next_id());
        let row = Topic {
            id,
            title: topic.title,
            description: topic.description,
            locked: false,
            user_id: topic.user_id,
            category_id: topic.category_id,
        };
        tables.topics.insert(id, row.clone());
        Ok(row)
    }

    async fn get_post(&self, id: PostId) -> Result<Option<Post>, Self::Error> {
        Ok(self.tables.lock().posts.get(&id).cloned())
    }

    async fn list_posts(&self, topic: TopicId) -> Result<Vec<Post>, Self::Error> {
        let tables = self.tables.lock();
        Ok(tables
            .posts
            .values()
            .filter(|p| p.topic_id == topic)
            .cloned()
            .collect())
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, Self::Error> {
        let mut tables = self.tables.lock();
        if !tables.topics.contains_key(&post.topic_id) {
            return Err(InMemoryError::RowNotFound(format!("topic {}", post.topic_id)));
        }
        let id = PostId::new(tables.next_id());
        let row = Post {
            id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            topic_id: post.topic_id,
            category_id: post.category_id,
        };
        tables.posts.insert(id, row.clone());
        Ok(row)
    }

    async fn get_reply(&self, id: ReplyId) -> Result<Option<Reply>, Self::Error> {
        Ok(self.tables.lock().replies.get(&id).cloned())
    }

    async fn list_replies(&self, post: PostId) -> Result<Vec<Reply>, Self::Error> {
        let tables = self.tables.lock();
        Ok(tables
            .replies
            .values()
            .filter(|r| r.post_id == post)
            .cloned()
            .collect())
    }

    async fn insert_reply(&self, reply: NewReply) -> Result<Reply, Self::Error> {
        let mut tables = self.tables.lock();
        if !tables.posts.contains_key(&reply.post_id) {
            return Err(InMemoryError::RowNotFound(format!("post {}", reply.post_id)));
        }
        let id = ReplyId::new(tables.next_id());
        let row = Reply {
            id,
            post_id: reply.post_id,
            reply_id: reply.reply_id,
            user_id: reply.user_id,
            content: reply.content,
        };
        tables.replies.insert(id, row.clone());
        Ok(row)
    }

    async fn list_interactions(&self, target: VoteTarget) -> Result<Vec<Interaction>, Self::Error> {
        let tables = self.tables.lock();
        let mut rows: Vec<Interaction> = tables
            .interactions
            .iter()
            .filter(|i| i.target == target)
            .copied()
            .collect();
        rows.sort_by_key(|i| i.user_id);
        Ok(rows)
    }

    async fn apply_vote(
        &self,
        actor: UserId,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<Vec<Interaction>, Self::Error> {
        let mut tables = self.tables.lock();
        let existing = tables
            .interactions
            .iter()
            .find(|i| i.user_id == actor && i.target == target)
            .map(|i| i.vote);

        let mutation = plan_vote(existing, direction);
        apply_mutation(&mut tables.interactions, actor, target, mutation);

        let mut rows: Vec<Interaction> = tables
            .interactions
            .iter()
            .filter(|i| i.target == target)
            .copied()
            .collect();
        rows.sort_by_key(|i| i.user_id);
        Ok(rows)
    }
}
