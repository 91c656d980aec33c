//! Property tests for the optimizer on random lineages.
//!
//! Every run starts from a seeded, collision-free layout and must end with:
//! the lane index consistent with the chains, no collisions, and a total
//! cost that never rose from one pass to the next.

use lineage_core::{
    Chain, ChainIdx, Event, EventKind, LayoutConfig, Phase, Relations, Strategy as LayoutStrategy,
    build_families,
};
use lineage_layout::{LayoutState, PassScore, RunHooks, run_schedule, seed_lanes};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn arb_lineage() -> impl Strategy<Value = (Vec<Chain>, Vec<Event>)> {
    (1usize..10).prop_flat_map(|n| {
        let spans = prop::collection::vec((1980i32..2010, 0i32..12), n);
        let links = prop::collection::vec((0..n, 0..n), 0..n * 2);
        (spans, links).prop_map(|(spans, links)| {
            let chains: Vec<Chain> = spans
                .iter()
                .enumerate()
                .map(|(i, &(start, len))| Chain {
                    id: format!("c{i}"),
                    members: vec![format!("c{i}")],
                    start,
                    end: start + len,
                    lane: 0,
                })
                .collect();
            let events = links
                .iter()
                .map(|&(a, b)| Event::new(format!("c{a}"), format!("c{b}"), 2000, EventKind::Merge))
                .collect();
            (chains, events)
        })
    })
}

fn short_schedule() -> Vec<Phase> {
    vec![
        Phase::new("sort", &[LayoutStrategy::Parents, LayoutStrategy::Children], 4),
        Phase::new("hubs", &[LayoutStrategy::Hubs], 2),
        Phase::new("hybrid", &[LayoutStrategy::Hybrid], 1),
    ]
}

fn config() -> LayoutConfig {
    let mut config = LayoutConfig::default();
    config.groupwise.anneal_iterations = 30;
    config.schedule = short_schedule();
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn schedule_keeps_layout_valid_and_never_worse(
        (mut chains, events) in arb_lineage(),
        seed in any::<u64>(),
    ) {
        let relations = Relations::from_chains(&chains, &events);
        let families = build_families(&chains, &events);
        let all: Vec<ChainIdx> = (0..chains.len()).map(ChainIdx).collect();
        seed_lanes(&mut chains, &relations, &families, &all);

        let config = config();
        let mut state = LayoutState::new(&mut chains, &relations, &config);
        for idx in &all {
            prop_assert!(!state.collides(*idx, state.lane_of(*idx)), "seeding collided");
        }

        let mut costs = Vec::new();
        let mut observer = |s: &PassScore| costs.push(s.total_cost);
        let mut rng = StdRng::seed_from_u64(seed);
        let report = run_schedule(
            &mut state,
            &families,
            &config.schedule,
            &mut rng,
            RunHooks { observer: Some(&mut observer), cancel: None },
        );

        prop_assert!(state.board().is_consistent());
        for idx in &all {
            prop_assert!(!state.collides(*idx, state.lane_of(*idx)));
            prop_assert!(state.lane_of(*idx) >= 0);
        }
        prop_assert!(report.final_cost <= report.initial_cost + 1e-6);
        let mut previous = report.initial_cost;
        for cost in costs {
            prop_assert!(cost <= previous + 1e-6, "cost rose from {} to {}", previous, cost);
            previous = cost;
        }
    }

    #[test]
    fn runs_are_reproducible(
        (chains, events) in arb_lineage(),
        seed in any::<u64>(),
    ) {
        let relations = Relations::from_chains(&chains, &events);
        let families = build_families(&chains, &events);
        let all: Vec<ChainIdx> = (0..chains.len()).map(ChainIdx).collect();
        let config = config();

        let run = || {
            let mut chains = chains.clone();
            seed_lanes(&mut chains, &relations, &families, &all);
            {
                let mut state = LayoutState::new(&mut chains, &relations, &config);
                let mut rng = StdRng::seed_from_u64(seed);
                run_schedule(&mut state, &families, &config.schedule, &mut rng, RunHooks::default());
            }
            chains.into_iter().map(|c| c.lane).collect::<Vec<_>>()
        };
        prop_assert_eq!(run(), run());
    }
}
