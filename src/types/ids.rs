//! Integer row identifiers.
//!
//! Every table uses a `SERIAL` primary key; the newtypes keep a post id from
//! being passed where a topic id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw row id.
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw row id.
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Primary key of a `users` row.
    UserId
);
row_id!(
    /// Primary key of a `categories` row.
    CategoryId
);
row_id!(
    /// Primary key of a `topics` row.
    TopicId
);
row_id!(
    /// Primary key of a `posts` row.
    PostId
);
row_id!(
    /// Primary key of a `replies` row.
    ReplyId
);
