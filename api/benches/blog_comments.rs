use blog_api::blog::comment::{Comment, UserMetadata, tree::build_tree};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("blog_comments");
    for p in [(10, 1), (100, 3), (1000, 10), (10000, 30), (100000, 100)].iter() {
        let comments = generate_comments(p.0, p.1);
        group.bench_function(BenchmarkId::new("build_tree", p.0), |b| {
            b.iter(|| build_tree(black_box(comments.clone())))
        });
    }
    group.finish();
}

/// Generates `n` comments in creation order where roughly one in `fan_out + 1`
/// is a root and the rest reply to a random earlier comment
fn generate_comments(n: usize, fan_out: usize) -> Vec<Comment> {
    let start = chrono::offset::Local::now().naive_local();
    let mut rng = StdRng::seed_from_u64(42);
    let mut comments = Vec::with_capacity(n);

    for i in 0..n {
        let id = i as i32 + 1;
        let parent_id = if i == 0 || rng.gen_range(0..fan_out + 1) == 0 {
            None
        } else {
            Some(rng.gen_range(1..=i) as i32)
        };

        comments.push(Comment {
            id,
            post_id: 1,
            content: "content".to_string(),
            created_at: start + chrono::Duration::seconds(i as i64),
            user_id: 1,
            user_metadata: UserMetadata {
                name: Some("author".to_string()),
                avatar_url: None,
            },
            parent_id,
            is_pinned: rng.gen_bool(0.01),
        });
    }

    comments
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
