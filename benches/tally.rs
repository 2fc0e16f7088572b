//! Benchmarks for the per-request hot paths.
//!
//! Run with: `cargo bench --bench tally`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::NaiveDate;
use siso_forum::{
    filter_visible, hash_password, tally, Category, CategoryAccessPrivilege, CategoryId,
    Interaction, PostId, TokenIssuer, User, UserId, VoteTarget,
};

const BENCH_SECRET: &[u8] = b"bench_secret";

/// Votes by `n` users on post 1, mixed with votes on post 2.
fn make_rows(n: usize) -> Vec<Interaction> {
    (0..n)
        .map(|i| {
            let post = if i % 4 == 0 { 2 } else { 1 };
            Interaction::new(
                UserId::new(i as i32),
                VoteTarget::Post(PostId::new(post)),
                i % 3 != 0,
            )
        })
        .collect()
}

fn bench_tally(c: &mut Criterion) {
    let mut group = c.benchmark_group("tally");
    let target = VoteTarget::Post(PostId::new(1));

    for size in [10, 100, 1_000, 10_000] {
        let rows = make_rows(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| tally(black_box(target), black_box(rows), UserId::new(7)))
        });
    }

    group.finish();
}

fn bench_visibility(c: &mut Criterion) {
    let member = User {
        id: UserId::new(1),
        username: "member".to_string(),
        hashed_password: hash_password("pw"),
        email: "member@example.com".to_string(),
        age: 30,
        nickname: None,
        registration_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        admin: false,
    };

    let mut group = c.benchmark_group("filter_visible");
    for size in [10, 100, 1_000] {
        let categories: Vec<Category> = (0..size)
            .map(|i| Category {
                id: CategoryId::new(i),
                name: format!("category_{i}"),
                description: String::new(),
                visibility: i % 5 != 0,
                locked: false,
            })
            .collect();
        // Deny every seventh category.
        let privileges: Vec<CategoryAccessPrivilege> = (0..size)
            .step_by(7)
            .map(|i| CategoryAccessPrivilege {
                user_id: member.id,
                category_id: CategoryId::new(i),
                permission_type: false,
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &(categories, privileges),
            |b, (categories, privileges)| {
                b.iter(|| filter_visible(&member, black_box(categories.clone()), black_box(privileges)))
            },
        );
    }
    group.finish();
}

fn bench_token_round_trip(c: &mut Criterion) {
    let issuer = TokenIssuer::with_default_ttl(BENCH_SECRET);
    let token = issuer.issue("bench_user").unwrap();

    c.bench_function("token_issue", |b| b.iter(|| issuer.issue(black_box("bench_user"))));
    c.bench_function("token_validate", |b| b.iter(|| issuer.validate(black_box(&token))));
}

fn bench_password_hash(c: &mut Criterion) {
    c.bench_function("password_hash", |b| b.iter(|| hash_password(black_box("correct horse"))));
}

criterion_group!(
    benches,
    bench_tally,
    bench_visibility,
    bench_token_round_trip,
    bench_password_hash,
);
criterion_main!(benches);
