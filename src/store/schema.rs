//! SQL schema for the PostgreSQL backend.
//!
//! Statements are idempotent and applied in order at startup. The unique
//! indexes carry the one-row-per-key invariants for privileges and votes.

/// DDL statements, in application order.
pub const FORUM_SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    username VARCHAR(45) NOT NULL UNIQUE,
    hashed_password VARCHAR(64) NOT NULL,
    email VARCHAR(45) NOT NULL UNIQUE,
    age INTEGER NOT NULL,
    nickname VARCHAR(45),
    registration_date DATE NOT NULL DEFAULT CURRENT_DATE,
    admin BOOLEAN NOT NULL DEFAULT FALSE
)"#,
    r#"
CREATE TABLE IF NOT EXISTS categories (
    id SERIAL PRIMARY KEY,
    name VARCHAR(45) NOT NULL UNIQUE,
    description VARCHAR(255) NOT NULL,
    visibility BOOLEAN NOT NULL DEFAULT TRUE,
    locked BOOLEAN NOT NULL DEFAULT FALSE
)"#,
    r#"
CREATE TABLE IF NOT EXISTS category_access_privileges (
    id SERIAL PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    category_id INTEGER NOT NULL REFERENCES categories(id),
    permission_type BOOLEAN DEFAULT FALSE,
    CONSTRAINT category_access_privileges_user_category_key UNIQUE (user_id, category_id)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS topics (
    id SERIAL PRIMARY KEY,
    title VARCHAR(45) NOT NULL,
    description VARCHAR(255),
    locked BOOLEAN NOT NULL DEFAULT FALSE,
    user_id INTEGER NOT NULL REFERENCES users(id),
    category_id INTEGER NOT NULL REFERENCES categories(id)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS posts (
    id SERIAL PRIMARY KEY,
    title VARCHAR(45),
    content TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id),
    topic_id INTEGER NOT NULL REFERENCES topics(id),
    category_id INTEGER NOT NULL REFERENCES categories(id)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS replies (
    id SERIAL PRIMARY KEY,
    post_id INTEGER NOT NULL REFERENCES posts(id),
    reply_id INTEGER REFERENCES replies(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    content TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS topic_interactions (
    id SERIAL PRIMARY KEY,
    vote BOOLEAN NOT NULL DEFAULT TRUE,
    topic_id INTEGER NOT NULL REFERENCES topics(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    CONSTRAINT topic_interactions_target_user_key UNIQUE (topic_id, user_id)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS post_interactions (
    id SERIAL PRIMARY KEY,
    vote BOOLEAN NOT NULL DEFAULT TRUE,
    post_id INTEGER NOT NULL REFERENCES posts(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    CONSTRAINT post_interactions_target_user_key UNIQUE (post_id, user_id)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS replies_interactions (
    id SERIAL PRIMARY KEY,
    vote BOOLEAN NOT NULL DEFAULT TRUE,
    reply_id INTEGER NOT NULL REFERENCES replies(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    CONSTRAINT replies_interactions_target_user_key UNIQUE (reply_id, user_id)
)"#,
    "CREATE INDEX IF NOT EXISTS idx_topics_category ON topics(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_posts_topic ON posts(topic_id)",
    "CREATE INDEX IF NOT EXISTS idx_replies_post ON replies(post_id)",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_interaction_table_has_unique_key() {
        for table in ["topic_interactions", "post_interactions", "replies_interactions"] {
            let ddl = FORUM_SCHEMA
                .iter()
                .find(|s| s.contains(&format!("TABLE IF NOT EXISTS {table} ")))
                .unwrap();
            assert!(ddl.contains("UNIQUE ("), "{table} lacks a unique key");
        }
    }

    #[test]
    fn test_privileges_unique_per_user_category() {
        assert!(FORUM_SCHEMA
            .iter()
            .any(|s| s.contains("UNIQUE (user_id, category_id)")));
    }
}
