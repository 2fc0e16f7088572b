//! Property-based tests for visibility resolution and vote aggregation.

use chrono::NaiveDate;
use proptest::prelude::*;
use siso_forum::votes::{apply_mutation, plan_vote};
use siso_forum::{
    can_view_category, tally, Category, CategoryAccessPrivilege, CategoryId, Interaction, PostId,
    User, UserId, VoteDirection, VoteTarget,
};

const PROPTEST_CASES: u32 = 512;

fn user(id: i32, admin: bool) -> User {
    User {
        id: UserId::new(id),
        username: format!("user{id}"),
        hashed_password: String::new(),
        email: format!("user{id}@example.com"),
        age: 20,
        nickname: None,
        registration_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        admin,
    }
}

fn category(visibility: bool) -> Category {
    Category {
        id: CategoryId::new(1),
        name: "c".to_string(),
        description: String::new(),
        visibility,
        locked: false,
    }
}

fn direction() -> impl Strategy<Value = VoteDirection> {
    prop_oneof![
        Just(VoteDirection::Up),
        Just(VoteDirection::Down),
        Just(VoteDirection::Clear),
    ]
}

/// Existing votes on one post by users 1..=n, each up or down.
fn ballots() -> impl Strategy<Value = Vec<Interaction>> {
    prop::collection::vec(any::<bool>(), 0..40).prop_map(|votes| {
        votes
            .into_iter()
            .enumerate()
            .map(|(i, vote)| Interaction::new(UserId::new(i as i32 + 1), target(), vote))
            .collect()
    })
}

fn target() -> VoteTarget {
    VoteTarget::Post(PostId::new(1))
}

fn cast(rows: &mut Vec<Interaction>, actor: UserId, direction: VoteDirection) {
    let existing = rows
        .iter()
        .find(|i| i.user_id == actor && i.target == target())
        .map(|i| i.vote);
    apply_mutation(rows, actor, target(), plan_vote(existing, direction));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        ..ProptestConfig::default()
    })]

    #[test]
    fn admin_sees_every_category(visibility: bool, privilege: Option<bool>) {
        let admin = user(1, true);
        let row = privilege.map(|allow| CategoryAccessPrivilege {
            user_id: admin.id,
            category_id: CategoryId::new(1),
            permission_type: allow,
        });
        prop_assert!(can_view_category(&admin, &category(visibility), row.as_ref()));
    }

    #[test]
    fn non_admin_visibility_is_conjunction(visibility: bool, privilege: Option<bool>) {
        let member = user(2, false);
        let row = privilege.map(|allow| CategoryAccessPrivilege {
            user_id: member.id,
            category_id: CategoryId::new(1),
            permission_type: allow,
        });
        let expected = visibility && privilege.unwrap_or(true);
        prop_assert_eq!(can_view_category(&member, &category(visibility), row.as_ref()), expected);
    }

    #[test]
    fn score_is_ups_minus_downs(rows in ballots()) {
        let ups = rows.iter().filter(|i| i.vote).count() as i64;
        let downs = rows.len() as i64 - ups;
        prop_assert_eq!(tally(target(), &rows, UserId::new(0)).score, ups - downs);
    }

    #[test]
    fn repeated_vote_is_idempotent(rows in ballots(), direction in direction()) {
        let actor = UserId::new(1000);
        let mut once = rows.clone();
        cast(&mut once, actor, direction);
        let mut twice = once.clone();
        cast(&mut twice, actor, direction);
        prop_assert_eq!(tally(target(), &once, actor), tally(target(), &twice, actor));
        prop_assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn vote_then_clear_restores_tally(rows in ballots(), up: bool) {
        let actor = UserId::new(1000);
        let before = tally(target(), &rows, actor);

        let mut after = rows.clone();
        cast(&mut after, actor, if up { VoteDirection::Up } else { VoteDirection::Down });
        cast(&mut after, actor, VoteDirection::Clear);

        prop_assert_eq!(tally(target(), &after, actor), before);
    }

    #[test]
    fn flipping_moves_score_by_two(rows in ballots()) {
        let actor = UserId::new(1000);
        let mut state = rows.clone();
        cast(&mut state, actor, VoteDirection::Up);
        let up = tally(target(), &state, actor);
        cast(&mut state, actor, VoteDirection::Down);
        let down = tally(target(), &state, actor);

        prop_assert_eq!(up.score - down.score, 2);
        prop_assert_eq!(up.caller_vote, Some(true));
        prop_assert_eq!(down.caller_vote, Some(false));
    }

    #[test]
    fn at_most_one_row_per_voter(steps in prop::collection::vec((1..5i32, direction()), 0..60)) {
        let mut rows = Vec::new();
        for (voter, direction) in steps {
            cast(&mut rows, UserId::new(voter), direction);
        }
        for voter in 1..5 {
            let count = rows.iter().filter(|i| i.user_id == UserId::new(voter)).count();
            prop_assert!(count <= 1);
        }
    }

    #[test]
    fn only_unit_votes_are_accepted(value in any::<i64>()) {
        let parsed = VoteDirection::try_from(value);
        prop_assert_eq!(parsed.is_ok(), (-1..=1).contains(&value));
    }
}
