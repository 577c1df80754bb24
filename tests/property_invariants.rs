mod common;

use std::{collections::BTreeSet, sync::Arc};

use proptest::prelude::*;

use clipfeed::{
    core::{
        list::ListState,
        optimistic::{MutationOutcome, begin, settle},
    },
    model::Post,
    op::{EdgeState, Toggle},
    persist::{memory::MemoryStore, paths},
};

use common::{post, seed_post, seed_user, services};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

proptest! {
    #[test]
    fn feed_enrichment_preserves_fetch_order(
        timestamps in prop::collection::btree_set(0u64..10_000, 1..40),
        failing in prop::collection::btree_set(0usize..8, 0..4),
        bound in 1usize..8,
    ) {
        let store = Arc::new(MemoryStore::new());
        for owner in 0..8usize {
            seed_user(&store, &format!("u{owner}"));
        }
        for owner in &failing {
            store.fail_get(paths::USERS, &format!("u{owner}"));
        }
        for (i, ts) in timestamps.iter().enumerate() {
            seed_post(&store, &post(&format!("p{ts}"), &format!("u{}", i % 8), *ts, 0));
        }

        let out = runtime()
            .block_on(services(&store, None).feed().fetch_posts(bound))
            .expect("fetch");

        let expected: Vec<_> = timestamps.iter().rev().map(|ts| format!("p{ts}")).collect();
        let ids: Vec<_> = out.records.iter().map(|p| p.id.clone()).collect();
        prop_assert_eq!(ids, expected);

        for p in &out.records {
            let owner: usize = p.owner_uid[1..].parse().expect("owner index");
            prop_assert_eq!(p.user.is_some(), !failing.contains(&owner));
        }
        let missed: BTreeSet<_> = out.misses.iter().map(|m| m.record_id.clone()).collect();
        prop_assert_eq!(missed.len(), out.records.iter().filter(|p| p.user.is_none()).count());
    }

    #[test]
    fn like_cycles_never_drift_the_counter(
        start in 0u64..1_000,
        steps in prop::collection::vec(any::<bool>(), 1..64),
    ) {
        let mut p = Post::new("p1", "u1", 1);
        p.likes = start;
        let (mut liked, mut likes) = (false, start);

        for succeeded in steps {
            let toggle = if liked { Toggle::Off } else { Toggle::On };
            let pending = begin(&mut p, toggle, 0).expect("begin");
            prop_assert!(p.like.is_pending());
            prop_assert_eq!(p.did_like(), !liked);

            let outcome = settle(&mut p, &pending, succeeded);
            if succeeded {
                prop_assert_eq!(outcome, MutationOutcome::Confirmed);
                liked = !liked;
                likes = if liked { likes + 1 } else { likes.saturating_sub(1) };
            } else {
                prop_assert_eq!(outcome, MutationOutcome::RolledBack);
            }
            prop_assert_eq!(p.likes, likes);
            prop_assert_eq!(p.like, EdgeState::from_exists(liked));
        }
    }

    #[test]
    fn install_keeps_first_of_each_id(ids in prop::collection::vec(0u8..16, 0..48)) {
        let records: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| post(&format!("p{id}"), "u1", i as u64, 0))
            .collect();

        let mut state = ListState::new();
        let generation = state.begin_load();
        let dropped = state.install(generation, records).expect("current generation");

        let mut seen = BTreeSet::new();
        let expected: Vec<_> = ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(|id| format!("p{id}"))
            .collect();
        prop_assert_eq!(state.ordered_ids(), expected.as_slice());
        prop_assert_eq!(dropped, ids.len() - expected.len());
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                continue;
            }
            let kept = state.get(&format!("p{id}")).expect("kept");
            prop_assert_eq!(kept.timestamp, i as u64);
        }
    }
}
