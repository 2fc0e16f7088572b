//! PostgreSQL forum store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string. When unset, the URL is
//!   assembled from `SISO_FORUM_DB_USER`, `SISO_FORUM_DB_PASSWORD`,
//!   `SISO_FORUM_DB_HOST`, `SISO_FORUM_DB_PORT` and `SISO_FORUM_DB_NAME`.
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

use super::schema::FORUM_SCHEMA;
use super::{ForumStore, PoolStats};
use crate::types::{
    Category, CategoryAccessPrivilege, CategoryFlags, CategoryId, Interaction, NewCategory,
    NewPost, NewReply, NewTopic, NewUser, Post, PostId, Reply, ReplyId, Topic, TopicId, User,
    UserId, VoteTarget,
};
use crate::votes::{plan_vote, VoteDirection, VoteMutation};

const USER_COLUMNS: &str =
    "id, username, hashed_password, email, age, nickname, registration_date, admin";
const CATEGORY_COLUMNS: &str = "id, name, description, visibility, locked";
const TOPIC_COLUMNS: &str = "id, title, description, locked, user_id, category_id";
const POST_COLUMNS: &str = "id, title, content, user_id, topic_id, category_id";
const REPLY_COLUMNS: &str = "id, post_id, reply_id, user_id, content";

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or_else(|_| database_url_from_parts()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn database_url_from_parts() -> String {
    let part = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
    format!(
        "postgresql://{}:{}@{}:{}/{}",
        part("SISO_FORUM_DB_USER", "postgres"),
        part("SISO_FORUM_DB_PASSWORD", ""),
        part("SISO_FORUM_DB_HOST", "localhost"),
        part("SISO_FORUM_DB_PORT", "5432"),
        part("SISO_FORUM_DB_NAME", "siso_forum"),
    )
}

/// Table and target column holding votes for a target kind.
fn interaction_table(target: VoteTarget) -> (&'static str, &'static str) {
    match target {
        VoteTarget::Topic(_) => ("topic_interactions", "topic_id"),
        VoteTarget::Post(_) => ("post_interactions", "post_id"),
        VoteTarget::Reply(_) => ("replies_interactions", "reply_id"),
    }
}

/// PostgreSQL forum store.
///
/// Uses connection pooling with production-tuned settings.
pub struct PostgresForumStore {
    pool: PgPool,
}

impl PostgresForumStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Apply [`FORUM_SCHEMA`] inside one transaction.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for statement in FORUM_SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        tracing::info!(statements = FORUM_SCHEMA.len(), "Forum schema applied");
        Ok(())
    }

    fn parse_user(row: &PgRow) -> Result<User, sqlx::Error> {
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            username: row.try_get("username")?,
            hashed_password: row.try_get("hashed_password")?,
            email: row.try_get("email")?,
            age: row.try_get("age")?,
            nickname: row.try_get("nickname")?,
            registration_date: row.try_get("registration_date")?,
            admin: row.try_get::<Option<bool>, _>("admin")?.unwrap_or(false),
        })
    }

    fn parse_category(row: &PgRow) -> Result<Category, sqlx::Error> {
        Ok(Category {
            id: CategoryId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            visibility: row.try_get::<Option<bool>, _>("visibility")?.unwrap_or(true),
            locked: row.try_get::<Option<bool>, _>("locked")?.unwrap_or(false),
        })
    }

    fn parse_privilege(row: &PgRow) -> Result<CategoryAccessPrivilege, sqlx::Error> {
        Ok(CategoryAccessPrivilege {
            user_id: UserId::new(row.try_get("user_id")?),
            category_id: CategoryId::new(row.try_get("category_id")?),
            // NULL permission reads as deny
            permission_type: row.try_get::<Option<bool>, _>("permission_type")?.unwrap_or(false),
        })
    }

    fn parse_topic(row: &PgRow) -> Result<Topic, sqlx::Error> {
        Ok(Topic {
            id: TopicId::new(row.try_get("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            locked: row.try_get::<Option<bool>, _>("locked")?.unwrap_or(false),
            user_id: UserId::new(row.try_get("user_id")?),
            category_id: CategoryId::new(row.try_get("category_id")?),
        })
    }

    fn parse_post(row: &PgRow) -> Result<Post, sqlx::Error> {
        Ok(Post {
            id: PostId::new(row.try_get("id")?),
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            user_id: UserId::new(row.try_get("user_id")?),
            topic_id: TopicId::new(row.try_get("topic_id")?),
            category_id: CategoryId::new(row.try_get("category_id")?),
        })
    }

    fn parse_reply(row: &PgRow) -> Result<Reply, sqlx::Error> {
        Ok(Reply {
            id: ReplyId::new(row.try_get("id")?),
            post_id: PostId::new(row.try_get("post_id")?),
            reply_id: row.try_get::<Option<i32>, _>("reply_id")?.map(ReplyId::new),
            user_id: UserId::new(row.try_get("user_id")?),
            content: row.try_get("content")?,
        })
    }

    fn parse_interaction(row: &PgRow, target: VoteTarget) -> Result<Interaction, sqlx::Error> {
        Ok(Interaction::new(
            UserId::new(row.try_get("user_id")?),
            target,
            row.try_get("vote")?,
        ))
    }
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
impl ForumStore for PostgresForumStore {
    type Error = PostgresError;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, Self::Error> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::parse_user).transpose()?)
    }

    async fn user_exists(&self, username: &str, email: &str) -> Result<bool, Self::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Self::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (username, hashed_password, email, age, nickname, registration_date, admin)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            ON CONFLICT DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(&user.email)
        .bind(user.age)
        .bind(&user.nickname)
        .bind(user.registration_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::parse_user).transpose()?)
    }

    async fn set_user_admin(&self, id: UserId, admin: bool) -> Result<Option<User>, Self::Error> {
        let row = sqlx::query(&format!(
            "UPDATE users SET admin = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.get())
        .bind(admin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::parse_user).transpose()?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, Self::Error> {
        let rows = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::parse_category).collect::<Result<Vec<_>, _>>()?)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, Self::Error> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::parse_category).transpose()?)
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Option<Category>, Self::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO categories (name, description, visibility, locked)
            VALUES ($1, $2, TRUE, FALSE)
            ON CONFLICT (name) DO NOTHING
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(&category.name)
        .bind(&category.description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::parse_category).transpose()?)
    }

    async fn update_category_flags(
        &self,
        id: CategoryId,
        flags: CategoryFlags,
    ) -> Result<Option<Category>, Self::Error> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE categories
            SET visibility = COALESCE($2, visibility),
                locked = COALESCE($3, locked)
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(flags.visibility)
        .bind(flags.locked)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::parse_category).transpose()?)
    }

    async fn get_privilege(
        &self,
        user: UserId,
        category: CategoryId,
    ) -> Result<Option<CategoryAccessPrivilege>, Self::Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, category_id, permission_type
            FROM category_access_privileges
            WHERE user_id = $1 AND category_id = $2
            "#,
        )
        .bind(user.get())
        .bind(category.get())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::parse_privilege).transpose()?)
    }

    async fn privileges_for_user(&self, user: UserId) -> Result<Vec<CategoryAccessPrivilege>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, category_id, permission_type
            FROM category_access_privileges
            WHERE user_id = $1
            ORDER BY category_id
            "#,
        )
        .bind(user.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::parse_privilege).collect::<Result<Vec<_>, _>>()?)
    }

    async fn upsert_privilege(
        &self,
        user: UserId,
        category: CategoryId,
        permission_type: bool,
    ) -> Result<CategoryAccessPrivilege, Self::Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO category_access_privileges (user_id, category_id, permission_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, category_id)
            DO UPDATE SET permission_type = EXCLUDED.permission_type
            RETURNING user_id, category_id, permission_type
            "#,
        )
        .bind(user.get())
        .bind(category.get())
        .bind(permission_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(Self::parse_privilege(&row)?)
    }

    async fn delete_privilege(&self, user: UserId, category: CategoryId) -> Result<bool, Self::Error> {
        let result = sqlx::query(
            "DELETE FROM category_access_privileges WHERE user_id = $1 AND category_id = $2",
        )
        .bind(user.get())
        .bind(category.get())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, Self::Error> {
        let row = sqlx::query(&format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::parse_topic).transpose()?)
    }

    async fn list_topics(&self, category: CategoryId) -> Result<Vec<Topic>, Self::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {TOPIC_COLUMNS} FROM topics WHERE category_id = $1 ORDER BY id"
        ))
        .bind(category.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::parse_topic).collect::<Result<Vec<_>, _>>()?)
    }

    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic, Self::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO topics (title, description, locked, user_id, category_id)
            VALUES ($1, $2, FALSE, $3, $4)
            RETURNING {TOPIC_COLUMNS}
            "#
        ))
        .bind(&topic.title)
        .bind(&topic.description)
        .bind(topic.user_id.get())
        .bind(topic.category_id.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(Self::parse_topic(&row)?)
    }

    async fn get_post(&self, id: PostId) -> Result<Option<Post>, Self::Error> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::parse_post).transpose()?)
    }

    async fn list_posts(&self, topic: TopicId) -> Result<Vec<Post>, Self::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE topic_id = $1 ORDER BY id"
        ))
        .bind(topic.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::parse_post).collect::<Result<Vec<_>, _>>()?)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, Self::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO posts (title, content, user_id, topic_id, category_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.user_id.get())
        .bind(post.topic_id.get())
        .bind(post.category_id.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(Self::parse_post(&row)?)
    }

    async fn get_reply(&self, id: ReplyId) -> Result<Option<Reply>, Self::Error> {
        let row = sqlx::query(&format!("SELECT {REPLY_COLUMNS} FROM replies WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::parse_reply).transpose()?)
    }

    async fn list_replies(&self, post: PostId) -> Result<Vec<Reply>, Self::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {REPLY_COLUMNS} FROM replies WHERE post_id = $1 ORDER BY id"
        ))
        .bind(post.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::parse_reply).collect::<Result<Vec<_>, _>>()?)
    }

    async fn insert_reply(&self, reply: NewReply) -> Result<Reply, Self::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO replies (post_id, reply_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {REPLY_COLUMNS}
            "#
        ))
        .bind(reply.post_id.get())
        .bind(reply.reply_id.map(ReplyId::get))
        .bind(reply.user_id.get())
        .bind(&reply.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(Self::parse_reply(&row)?)
    }

    async fn list_interactions(&self, target: VoteTarget) -> Result<Vec<Interaction>, Self::Error> {
        let (table, column) = interaction_table(target);
        let rows = sqlx::query(&format!(
            "SELECT user_id, vote FROM {table} WHERE {column} = $1 ORDER BY user_id"
        ))
        .bind(target.raw_id())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| Self::parse_interaction(r, target))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn apply_vote(
        &self,
        actor: UserId,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<Vec<Interaction>, Self::Error> {
        let (table, column) = interaction_table(target);
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(&format!(
            "SELECT id, vote FROM {table} WHERE {column} = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(target.raw_id())
        .bind(actor.get())
        .fetch_optional(&mut *tx)
        .await?;

        let (row_id, current) = match existing {
            Some(ref row) => (Some(row.try_get::<i32, _>("id")?), Some(row.try_get::<bool, _>("vote")?)),
            None => (None, None),
        };

        let mutation = plan_vote(current, direction);
        match (mutation, row_id) {
            (VoteMutation::Insert(flag), _) => {
                sqlx::query(&format!(
                    r#"
                    INSERT INTO {table} (vote, {column}, user_id)
                    VALUES ($1, $2, $3)
                    ON CONFLICT ({column}, user_id) DO UPDATE SET vote = EXCLUDED.vote
                    "#
                ))
                .bind(flag)
                .bind(target.raw_id())
                .bind(actor.get())
                .execute(&mut *tx)
                .await?;
            }
            (VoteMutation::Update(flag), Some(id)) => {
                sqlx::query(&format!("UPDATE {table} SET vote = $2 WHERE id = $1"))
                    .bind(id)
                    .bind(flag)
                    .execute(&mut *tx)
                    .await?;
            }
            (VoteMutation::Delete, Some(id)) => {
                sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            _ => {}
        }

        let rows = sqlx::query(&format!(
            "SELECT user_id, vote FROM {table} WHERE {column} = $1 ORDER BY user_id"
        ))
        .bind(target.raw_id())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            user_id = %actor,
            target = %target,
            mutation = ?mutation,
            "Vote applied"
        );

        Ok(rows
            .iter()
            .map(|r| Self::parse_interaction(r, target))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        Some(PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        })
    }
}
