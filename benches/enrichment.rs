use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use clipfeed::{
    model::{Post, User},
    persist::{memory::MemoryStore, paths},
    service::{Services, Session},
};

fn seeded_store(posts: u64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for u in 0..50u64 {
        let uid = format!("u{u}");
        store
            .seed(paths::USERS, &uid, &User::new(uid.as_str(), "name", "mail", "Full Name"))
            .expect("seed user");
    }
    for i in 0..posts {
        let post = Post::new(format!("p{i}"), format!("u{}", i % 50), i);
        store.seed(paths::POSTS, &post.id, &post).expect("seed post");
    }
    store
}

fn bench_feed_enrichment(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let services = Services::new(seeded_store(2_000), Session::anonymous());

    let mut group = c.benchmark_group("feed_enrichment_2k");
    for bound in [1usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(bound), &bound, |b, &bound| {
            b.iter(|| {
                let out = rt
                    .block_on(services.feed().fetch_posts(bound))
                    .expect("fetch");
                assert_eq!(out.len(), 2_000);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_feed_enrichment);
criterion_main!(benches);
