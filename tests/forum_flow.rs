//! End-to-end forum scenarios against the in-memory store.
//!
//! These tests drive `ForumService` the way the HTTP layer does: register,
//! log in, resolve the token, then act as that user.

use std::sync::Arc;

use chrono::{Duration, Utc};
use siso_forum::store::InMemoryForumStore;
use siso_forum::{
    CategoryFlags, ForumError, ForumService, ForumStore, Registration, TokenIssuer, User,
    VoteTarget,
};

const TEST_SECRET: &[u8] = b"test_secret_for_forum_flow";

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

struct Fixture {
    forum: ForumService<InMemoryForumStore>,
    admin: User,
    alice: User,
    bob: User,
}

fn registration(name: &str) -> Registration {
    Registration {
        username: name.to_string(),
        password: format!("{name}-password"),
        email: format!("{name}@example.com"),
        age: 30,
        nickname: Some(name.to_uppercase()),
    }
}

async fn login_as(forum: &ForumService<InMemoryForumStore>, name: &str) -> User {
    let token = forum
        .login(name, &format!("{name}-password"))
        .await
        .unwrap();
    forum.authenticate(&token.access_token).await.unwrap()
}

async fn fixture() -> Fixture {
    let forum = ForumService::new(
        Arc::new(InMemoryForumStore::new()),
        Arc::new(TokenIssuer::with_default_ttl(TEST_SECRET)),
    );

    for name in ["root", "alice", "bob"] {
        forum.register(registration(name)).await.unwrap();
    }
    let root = forum
        .store()
        .find_user_by_username("root")
        .await
        .unwrap()
        .unwrap();
    forum.store().set_user_admin(root.id, true).await.unwrap();

    Fixture {
        admin: login_as(&forum, "root").await,
        alice: login_as(&forum, "alice").await,
        bob: login_as(&forum, "bob").await,
        forum,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts and tokens
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_registered_user_is_not_admin_and_password_is_hashed() {
    let f = fixture().await;
    assert!(!f.alice.admin);
    assert_ne!(f.alice.hashed_password, "alice-password");
    assert_eq!(f.alice.hashed_password.len(), 64);
    assert_eq!(f.alice.registration_date, Utc::now().date_naive());
}

#[tokio::test]
async fn test_registration_conflicts_on_username_or_email() {
    let f = fixture().await;

    let same_name = registration("alice");
    assert!(matches!(
        f.forum.register(same_name).await,
        Err(ForumError::Conflict(_))
    ));

    let mut same_email = registration("carol");
    same_email.email = "alice@example.com".to_string();
    assert!(matches!(
        f.forum.register(same_email).await,
        Err(ForumError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let store = Arc::new(InMemoryForumStore::new());
    let issuer = Arc::new(TokenIssuer::with_default_ttl(TEST_SECRET));
    let forum = ForumService::new(Arc::clone(&store), Arc::clone(&issuer));
    forum.register(registration("alice")).await.unwrap();

    let stale = issuer
        .issue_at("alice", Utc::now() - Duration::hours(9))
        .unwrap();
    let err = forum.authenticate(&stale).await.unwrap_err();
    assert_eq!(err.status_code(), 401);
    assert_eq!(err.to_string(), "Token has expired");
}

#[tokio::test]
async fn test_foreign_or_orphan_token_is_rejected() {
    let f = fixture().await;

    let foreign = TokenIssuer::with_default_ttl(b"some_other_secret")
        .issue("alice")
        .unwrap();
    let err = f.forum.authenticate(&foreign).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");

    let orphan = TokenIssuer::with_default_ttl(TEST_SECRET)
        .issue("ghost")
        .unwrap();
    assert!(matches!(
        f.forum.authenticate(&orphan).await,
        Err(ForumError::Unauthenticated(_))
    ));

    assert!(matches!(
        f.forum.authenticate("not-a-token").await,
        Err(ForumError::Unauthenticated(_))
    ));
}

#[tokio::test]
async fn test_admin_promotion() {
    let f = fixture().await;

    assert!(matches!(
        f.forum.set_admin(&f.alice, "bob", true).await,
        Err(ForumError::Forbidden(_))
    ));
    assert!(matches!(
        f.forum.admin_profile(&f.alice),
        Err(ForumError::Forbidden(_))
    ));

    let profile = f.forum.set_admin(&f.admin, "alice", true).await.unwrap();
    assert!(profile.admin);
    let alice = login_as(&f.forum, "alice").await;
    assert_eq!(f.forum.admin_profile(&alice).unwrap().username, "alice");

    assert!(matches!(
        f.forum.set_admin(&f.admin, "nobody", true).await,
        Err(ForumError::NotFound(_))
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Categories and visibility
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_duplicate_category_name_conflicts() {
    let f = fixture().await;
    f.forum.add_category(&f.admin, "General", "talk").await.unwrap();
    let err = f
        .forum
        .add_category(&f.admin, "General", "again")
        .await
        .unwrap_err();
    assert!(matches!(err, ForumError::Conflict(_)));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_hidden_category_blocks_non_admin() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "Staff", "internal").await.unwrap();
    let topic = f
        .forum
        .create_topic(&f.admin, category.id, "Roadmap", None)
        .await
        .unwrap();
    let post = f
        .forum
        .add_post(&f.admin, topic.id, "Plans", None)
        .await
        .unwrap();

    f.forum
        .update_category(
            &f.admin,
            category.id,
            CategoryFlags {
                visibility: Some(false),
                locked: None,
            },
        )
        .await
        .unwrap();

    let visible = f.forum.visible_categories(&f.alice).await.unwrap();
    assert!(visible.iter().all(|c| c.id != category.id));
    assert_eq!(f.forum.visible_categories(&f.admin).await.unwrap().len(), 1);

    assert_eq!(
        f.forum.topic_posts(&f.alice, topic.id).await.unwrap_err().status_code(),
        403
    );
    assert_eq!(
        f.forum.view_post(&f.alice, post.id).await.unwrap_err().status_code(),
        403
    );
    assert_eq!(
        f.forum
            .vote(&f.alice, VoteTarget::Post(post.id), 1)
            .await
            .unwrap_err()
            .status_code(),
        403
    );
    assert_eq!(f.forum.store().num_interactions(), 0);

    // Admin still reads everything.
    assert_eq!(f.forum.topic_posts(&f.admin, topic.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deny_privilege_narrows_and_revoke_restores() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "General", "talk").await.unwrap();

    f.forum
        .set_privilege(&f.admin, category.id, "alice", false)
        .await
        .unwrap();
    assert!(f.forum.visible_categories(&f.alice).await.unwrap().is_empty());
    assert_eq!(f.forum.visible_categories(&f.bob).await.unwrap().len(), 1);
    assert!(matches!(
        f.forum.list_topics(&f.alice, category.id).await,
        Err(ForumError::Forbidden(_))
    ));

    // Upsert keeps a single row.
    f.forum
        .set_privilege(&f.admin, category.id, "alice", true)
        .await
        .unwrap();
    f.forum
        .set_privilege(&f.admin, category.id, "alice", false)
        .await
        .unwrap();
    assert_eq!(f.forum.store().num_privileges(), 1);

    f.forum
        .clear_privilege(&f.admin, category.id, "alice")
        .await
        .unwrap();
    assert_eq!(f.forum.visible_categories(&f.alice).await.unwrap().len(), 1);
    assert!(matches!(
        f.forum.clear_privilege(&f.admin, category.id, "alice").await,
        Err(ForumError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_allow_privilege_does_not_reveal_hidden_category() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "Staff", "internal").await.unwrap();
    f.forum
        .update_category(
            &f.admin,
            category.id,
            CategoryFlags {
                visibility: Some(false),
                locked: None,
            },
        )
        .await
        .unwrap();
    f.forum
        .set_privilege(&f.admin, category.id, "alice", true)
        .await
        .unwrap();

    assert!(f.forum.visible_categories(&f.alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_admin_cannot_manage_categories() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "General", "talk").await.unwrap();

    assert!(matches!(
        f.forum.add_category(&f.alice, "Mine", "d").await,
        Err(ForumError::Forbidden(_))
    ));
    assert!(matches!(
        f.forum
            .update_category(&f.alice, category.id, CategoryFlags::default())
            .await,
        Err(ForumError::Forbidden(_))
    ));
    assert!(matches!(
        f.forum.set_privilege(&f.alice, category.id, "bob", false).await,
        Err(ForumError::Forbidden(_))
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Content
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_content_is_not_found() {
    let f = fixture().await;
    use siso_forum::{PostId, TopicId};

    assert!(matches!(
        f.forum.topic_posts(&f.alice, TopicId::new(999)).await,
        Err(ForumError::NotFound("Topic"))
    ));
    assert!(matches!(
        f.forum.view_post(&f.alice, PostId::new(999)).await,
        Err(ForumError::NotFound("Post"))
    ));
    assert!(matches!(
        f.forum.vote(&f.alice, VoteTarget::Post(PostId::new(999)), 1).await,
        Err(ForumError::NotFound("Post"))
    ));
}

#[tokio::test]
async fn test_posts_listed_in_insertion_order() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "General", "talk").await.unwrap();
    let topic = f
        .forum
        .create_topic(&f.alice, category.id, "Hello", Some("intro".to_string()))
        .await
        .unwrap();
    assert_eq!(topic.user_id, f.alice.id);

    for body in ["first", "second", "third"] {
        f.forum.add_post(&f.bob, topic.id, body, None).await.unwrap();
    }

    let posts = f.forum.topic_posts(&f.alice, topic.id).await.unwrap();
    let bodies: Vec<&str> = posts.iter().map(|p| p.content.as_str()).collect();
    assert_eq!(bodies, vec!["first", "second", "third"]);
    assert!(posts.iter().all(|p| p.category_id == category.id));

    assert!(matches!(
        f.forum.add_post(&f.bob, topic.id, "  ", None).await,
        Err(ForumError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_reply_threading_stays_on_one_post() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "General", "talk").await.unwrap();
    let topic = f
        .forum
        .create_topic(&f.alice, category.id, "Hello", None)
        .await
        .unwrap();
    let first = f.forum.add_post(&f.alice, topic.id, "one", None).await.unwrap();
    let second = f.forum.add_post(&f.alice, topic.id, "two", None).await.unwrap();

    let root = f.forum.add_reply(&f.bob, first.id, None, "agree").await.unwrap();
    let nested = f
        .forum
        .add_reply(&f.alice, first.id, Some(root.id), "thanks")
        .await
        .unwrap();
    assert_eq!(nested.reply_id, Some(root.id));

    assert!(matches!(
        f.forum.add_reply(&f.bob, second.id, Some(root.id), "wrong").await,
        Err(ForumError::InvalidInput(_))
    ));

    f.forum
        .vote(&f.alice, VoteTarget::Reply(root.id), 1)
        .await
        .unwrap();
    let replies = f.forum.post_replies(&f.bob, first.id).await.unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].score, 1);
    assert_eq!(replies[0].user_vote, None);
    assert_eq!(replies[1].score, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Votes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_vote_lifecycle_on_post() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "General", "talk").await.unwrap();
    let topic = f
        .forum
        .create_topic(&f.alice, category.id, "Hello", None)
        .await
        .unwrap();
    let post = f.forum.add_post(&f.alice, topic.id, "body", None).await.unwrap();
    let target = VoteTarget::Post(post.id);

    let up = f.forum.vote(&f.alice, target, 1).await.unwrap();
    assert_eq!((up.score, up.user_vote), (1, Some(true)));

    // Repeating the same vote is a no-op.
    let again = f.forum.vote(&f.alice, target, 1).await.unwrap();
    assert_eq!(again, up);
    assert_eq!(f.forum.store().num_interactions(), 1);

    // Flipping moves the score by two.
    let down = f.forum.vote(&f.alice, target, -1).await.unwrap();
    assert_eq!((down.score, down.user_vote), (-1, Some(false)));

    f.forum.vote(&f.bob, target, 1).await.unwrap();
    let view = f.forum.view_post(&f.bob, post.id).await.unwrap();
    assert_eq!(view.interactions, 0);
    assert_eq!(view.user_vote, Some(true));

    let cleared = f.forum.vote(&f.alice, target, 0).await.unwrap();
    assert_eq!((cleared.score, cleared.user_vote), (1, None));
    assert_eq!(f.forum.store().num_interactions(), 1);
}

#[tokio::test]
async fn test_out_of_range_vote_writes_nothing() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "General", "talk").await.unwrap();
    let topic = f
        .forum
        .create_topic(&f.alice, category.id, "Hello", None)
        .await
        .unwrap();

    for value in [2, -2, 100] {
        let err = f
            .forum
            .vote(&f.bob, VoteTarget::Topic(topic.id), value)
            .await
            .unwrap_err();
        assert!(matches!(err, ForumError::InvalidInput(_)));
    }
    assert_eq!(f.forum.store().num_interactions(), 0);

    let view = f.forum.view_topic(&f.bob, topic.id).await.unwrap();
    assert_eq!((view.score, view.user_vote), (0, None));
}

#[tokio::test]
async fn test_votes_on_different_targets_are_independent() {
    let f = fixture().await;
    let category = f.forum.add_category(&f.admin, "General", "talk").await.unwrap();
    let topic = f
        .forum
        .create_topic(&f.alice, category.id, "Hello", None)
        .await
        .unwrap();
    let post = f.forum.add_post(&f.alice, topic.id, "body", None).await.unwrap();

    f.forum
        .vote(&f.bob, VoteTarget::Topic(topic.id), -1)
        .await
        .unwrap();
    f.forum
        .vote(&f.bob, VoteTarget::Post(post.id), 1)
        .await
        .unwrap();

    let topic_view = f.forum.view_topic(&f.bob, topic.id).await.unwrap();
    let post_view = f.forum.view_post(&f.bob, post.id).await.unwrap();
    assert_eq!(topic_view.score, -1);
    assert_eq!(post_view.interactions, 1);
}
