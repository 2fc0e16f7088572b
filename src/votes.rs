//! Vote aggregation.
//!
//! A target's score is upvotes minus downvotes with no weighting. The caller's
//! own vote is reported as a tri-state: `Some(true)`, `Some(false)` or `None`
//! when the caller has no row.

use serde::{Deserialize, Serialize};

use crate::error::ForumError;
use crate::types::{Interaction, UserId, VoteTarget};

/// Net score of a target plus the requesting user's own vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Upvotes minus downvotes.
    pub score: i64,
    /// The caller's stored vote, `None` if the caller never voted.
    pub caller_vote: Option<bool>,
}

/// Tally the rows that belong to `target`.
///
/// Rows for other targets are ignored.
pub fn tally(target: VoteTarget, interactions: &[Interaction], caller: UserId) -> Tally {
    let mut score = 0i64;
    let mut caller_vote = None;

    for interaction in interactions.iter().filter(|i| i.target == target) {
        score += if interaction.vote { 1 } else { -1 };
        if interaction.user_id == caller {
            caller_vote = Some(interaction.vote);
        }
    }

    Tally { score, caller_vote }
}

/// Requested change to a user's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteDirection {
    /// `+1`
    Up,
    /// `-1`
    Down,
    /// `0`: retract.
    Clear,
}

impl VoteDirection {
    /// Stored flag for this direction, `None` for a retraction.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            Self::Up => Some(true),
            Self::Down => Some(false),
            Self::Clear => None,
        }
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = ForumError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            0 => Ok(Self::Clear),
            other => Err(ForumError::InvalidInput(format!(
                "vote must be -1, 0 or 1, got {other}"
            ))),
        }
    }
}

/// Storage mutation needed to move from the current row to the requested vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteMutation {
    /// No row yet; create one with this flag.
    Insert(bool),
    /// Row exists with the other flag; overwrite it.
    Update(bool),
    /// Row exists and the vote is retracted.
    Delete,
    /// Nothing to do.
    Unchanged,
}

/// Decide how to apply `direction` given the actor's current row flag.
pub fn plan_vote(existing: Option<bool>, direction: VoteDirection) -> VoteMutation {
    match (existing, direction.as_flag()) {
        (None, Some(flag)) => VoteMutation::Insert(flag),
        (Some(current), Some(flag)) if current != flag => VoteMutation::Update(flag),
        (Some(_), Some(_)) => VoteMutation::Unchanged,
        (Some(_), None) => VoteMutation::Delete,
        (None, None) => VoteMutation::Unchanged,
    }
}

/// Apply a planned mutation to an in-memory row set for `(actor, target)`.
///
/// Used by backends that keep interactions in process memory.
pub fn apply_mutation(
    rows: &mut Vec<Interaction>,
    actor: UserId,
    target: VoteTarget,
    mutation: VoteMutation,
) {
    let position = rows
        .iter()
        .position(|i| i.user_id == actor && i.target == target);

    match (mutation, position) {
        (VoteMutation::Insert(flag), None) => rows.push(Interaction::new(actor, target, flag)),
        (VoteMutation::Insert(flag), Some(idx)) | (VoteMutation::Update(flag), Some(idx)) => {
            rows[idx].vote = flag;
        }
        (VoteMutation::Delete, Some(idx)) => {
            rows.remove(idx);
        }
        _ => {}
    }
}
