//! Categories and per-user access privileges.

use serde::{Deserialize, Serialize};

use super::ids::{CategoryId, UserId};

/// A top-level forum section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Row id.
    pub id: CategoryId,
    /// Unique display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Default visibility for non-admin users without a privilege row.
    pub visibility: bool,
    /// Stored but not consulted by the visibility resolver.
    pub locked: bool,
}

impl Category {
    /// Compact listing form returned by the category endpoints.
    pub fn summary(&self) -> CategorySummary {
        CategorySummary {
            id: self.id,
            name: self.name.clone(),
            desc: self.description.clone(),
        }
    }
}

/// Row to insert into `categories`.
///
/// New categories are always visible and unlocked.
#[derive(Debug, Clone)]
pub struct NewCategory {
    /// Unique display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// Partial update of a category's flags. `None` leaves the flag unchanged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryFlags {
    /// New default visibility.
    #[serde(default)]
    pub visibility: Option<bool>,
    /// New locked flag.
    #[serde(default)]
    pub locked: Option<bool>,
}

/// Listing form of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Row id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Description.
    pub desc: String,
}

/// Per-user override of a category's default visibility.
///
/// At most one row exists per `(user_id, category_id)`. The absence of a row
/// is the third state of the override: the category default applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAccessPrivilege {
    /// User the override applies to.
    pub user_id: UserId,
    /// Category the override applies to.
    pub category_id: CategoryId,
    /// `true` allows, `false` denies. A NULL column is read as deny.
    pub permission_type: bool,
}
