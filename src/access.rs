//! Category visibility.
//!
//! ## Rules
//!
//! 1. Admins see every category.
//! 2. Without a privilege row, a user sees the category iff it is visible.
//! 3. With a privilege row, a user sees the category iff it is visible **and**
//!    the privilege allows. A privilege narrows access; it never reveals a
//!    hidden category.
//!
//! Topics, posts and replies have no visibility of their own and resolve
//! through their category.

use crate::error::{ForumError, ForumResult};
use crate::store::ForumStore;
use crate::types::{Category, CategoryAccessPrivilege, Topic, TopicId, User};

/// Decide whether `user` may read `category`.
///
/// `privilege` must be the unique row for `(user.id, category.id)`, if any.
pub fn can_view_category(
    user: &User,
    category: &Category,
    privilege: Option<&CategoryAccessPrivilege>,
) -> bool {
    if user.admin {
        return true;
    }
    match privilege {
        None => category.visibility,
        Some(p) => category.visibility && p.permission_type,
    }
}

/// Load `category`'s privilege for `user` and resolve visibility.
///
/// Skips the privilege lookup for admins.
pub async fn category_visible_to<S: ForumStore>(
    store: &S,
    user: &User,
    category: &Category,
) -> ForumResult<bool> {
    if user.admin {
        return Ok(true);
    }
    let privilege = store
        .get_privilege(user.id, category.id)
        .await
        .map_err(ForumError::from_store)?;
    Ok(can_view_category(user, category, privilege.as_ref()))
}

/// Load a topic and check that `user` may read it.
///
/// Fails with `NotFound` if the topic or its category is missing and with
/// `Forbidden` if the category is not visible to the user.
pub async fn can_view_topic<S: ForumStore>(
    store: &S,
    user: &User,
    topic_id: TopicId,
) -> ForumResult<(Topic, Category)> {
    let topic = store
        .get_topic(topic_id)
        .await
        .map_err(ForumError::from_store)?
        .ok_or(ForumError::NotFound("Topic"))?;

    let category = store
        .get_category(topic.category_id)
        .await
        .map_err(ForumError::from_store)?
        .ok_or(ForumError::NotFound("Category"))?;

    if !category_visible_to(store, user, &category).await? {
        tracing::debug!(
            user_id = %user.id,
            topic_id = %topic.id,
            category_id = %category.id,
            "Topic hidden by category visibility"
        );
        return Err(ForumError::access_denied());
    }

    Ok((topic, category))
}

/// Keep only the categories `user` may read.
pub fn filter_visible(
    user: &User,
    categories: Vec<Category>,
    privileges: &[CategoryAccessPrivilege],
) -> Vec<Category> {
    categories
        .into_iter()
        .filter(|c| {
            let privilege = privileges
                .iter()
                .find(|p| p.user_id == user.id && p.category_id == c.id);
            can_view_category(user, c, privilege)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryId, UserId};
    use chrono::NaiveDate;

    fn user(admin: bool) -> User {
        User {
            id: UserId::new(7),
            username: "u".to_string(),
            hashed_password: String::new(),
            email: "u@example.com".to_string(),
            age: 30,
            nickname: None,
            registration_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            admin,
        }
    }

    fn category(id: i32, visibility: bool) -> Category {
        Category {
            id: CategoryId::new(id),
            name: format!("c{id}"),
            description: String::new(),
            visibility,
            locked: false,
        }
    }

    fn privilege(category: i32, allow: bool) -> CategoryAccessPrivilege {
        CategoryAccessPrivilege {
            user_id: UserId::new(7),
            category_id: CategoryId::new(category),
            permission_type: allow,
        }
    }

    #[test]
    fn test_default_visibility() {
        assert!(can_view_category(&user(false), &category(1, true), None));
        assert!(!can_view_category(&user(false), &category(1, false), None));
    }

    #[test]
    fn test_admin_bypass() {
        assert!(can_view_category(&user(true), &category(1, false), None));
        assert!(can_view_category(&user(true), &category(1, false), Some(&privilege(1, false))));
    }

    #[test]
    fn test_deny_narrows_visible_category() {
        assert!(!can_view_category(&user(false), &category(1, true), Some(&privilege(1, false))));
        assert!(can_view_category(&user(false), &category(1, true), Some(&privilege(1, true))));
    }

    #[test]
    fn test_allow_does_not_widen_hidden_category() {
        assert!(!can_view_category(&user(false), &category(1, false), Some(&privilege(1, true))));
    }

    #[test]
    fn test_filter_visible() {
        let categories = vec![category(1, true), category(2, true), category(3, false)];
        let privileges = vec![privilege(2, false), privilege(3, true)];

        let visible = filter_visible(&user(false), categories.clone(), &privileges);
        let ids: Vec<i32> = visible.iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, vec![1]);

        assert_eq!(filter_visible(&user(true), categories, &privileges).len(), 3);
    }
}
