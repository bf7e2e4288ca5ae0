//! Property tests over randomly generated DAGs

use crate::application::service::CompositionService;
use crate::domain::entities::{CompositionId, CompositionPatch, DependencyInput, NewComposition};
use crate::domain::errors::CompositionError;
use crate::domain::graph::CompositionGraph;
use crate::domain::invariants;
use crate::domain::quantity::Quantity;
use crate::ports::inbound::CompositionApi;
use proptest::prelude::*;

#[derive(Clone, Debug)]
struct NodeSpec {
    cost: f64,
    unit: f64,
    autoupdate: bool,
    /// (index of an earlier node, amount)
    deps: Vec<(usize, f64)>,
}

fn node_id(i: usize) -> CompositionId {
    CompositionId::new(format!("n{i:02}"))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap_or_else(|e| panic!("runtime: {e}"))
}

fn dag_strategy() -> impl Strategy<Value = Vec<NodeSpec>> {
    let node = (
        0u32..1000,
        1u32..5,
        prop::bool::weighted(0.8),
        prop::collection::vec((0usize..16, 1u32..6), 0..4),
    );
    prop::collection::vec(node, 1..12).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (cost, unit, autoupdate, edges))| {
                let mut deps: Vec<(usize, f64)> = Vec::new();
                if i > 0 {
                    for (target, amount) in edges {
                        let target = target % i;
                        if deps.iter().all(|(t, _)| *t != target) {
                            deps.push((target, amount as f64 / 2.0));
                        }
                    }
                }
                NodeSpec {
                    cost: cost as f64 / 4.0,
                    unit: unit as f64,
                    autoupdate,
                    deps,
                }
            })
            .collect()
    })
}

async fn build(specs: &[NodeSpec]) -> CompositionService {
    let service = CompositionService::in_memory();
    for (i, spec) in specs.iter().enumerate() {
        let mut request = NewComposition::new(Quantity::new(spec.unit, "u"))
            .with_id(node_id(i))
            .with_cost(spec.cost)
            .with_autoupdate_cost(spec.autoupdate);
        for (target, amount) in &spec.deps {
            request = request.with_dependency(node_id(*target), Quantity::new(*amount, "u"));
        }
        service
            .create(request)
            .await
            .unwrap_or_else(|e| panic!("create n{i}: {e}"));
    }
    service
}

fn consistent(service: &CompositionService) -> bool {
    invariants::check_all(&CompositionGraph::from_nodes(service.snapshot()))
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]

    #[test]
    fn costs_stay_consistent_across_updates(
        specs in dag_strategy(),
        updates in prop::collection::vec((0usize..16, 0u32..1000), 1..8),
    ) {
        runtime().block_on(async {
            let service = build(&specs).await;
            prop_assert!(consistent(&service));

            for (target, cost) in updates {
                let id = node_id(target % specs.len());
                service
                    .update(&id, CompositionPatch::default().with_cost(cost as f64 / 8.0))
                    .await
                    .unwrap_or_else(|e| panic!("update {id}: {e}"));
                prop_assert!(consistent(&service));
            }
            Ok(())
        })?;
    }

    #[test]
    fn closing_a_cycle_is_rejected_and_changes_nothing(specs in dag_strategy()) {
        runtime().block_on(async {
            let service = build(&specs).await;
            let Some((i, spec)) = specs.iter().enumerate().find(|(_, s)| !s.deps.is_empty()) else {
                return Ok(());
            };
            let (target, _) = spec.deps[0];
            let before = serde_json::to_string(&service.snapshot()).unwrap();

            let err = service
                .upsert_dependency(
                    &node_id(target),
                    DependencyInput::new(node_id(i), Quantity::new(1.0, "u")),
                )
                .await
                .unwrap_err();

            prop_assert!(matches!(err, CompositionError::CycleDetected { .. }), "got {err:?}");
            prop_assert_eq!(serde_json::to_string(&service.snapshot()).unwrap(), before);
            Ok(())
        })?;
    }

    #[test]
    fn referenced_nodes_cannot_be_deleted(specs in dag_strategy()) {
        runtime().block_on(async {
            let service = build(&specs).await;
            for i in 0..specs.len() {
                let id = node_id(i);
                if service.uses(&id).await.unwrap().is_empty() {
                    continue;
                }
                let err = service.delete(&id).await.unwrap_err();
                let is_referenced = matches!(err, CompositionError::ReferencedByOthers { .. });
                prop_assert!(is_referenced);
                prop_assert!(service.get(&id).await.is_ok());
            }
            Ok(())
        })?;
    }

    #[test]
    fn recalculation_is_idempotent(specs in dag_strategy()) {
        runtime().block_on(async {
            let service = build(&specs).await;
            let before = service.snapshot();
            for i in 0..specs.len() {
                let changed = service.recalculate(&node_id(i)).await.unwrap();
                prop_assert!(changed.is_empty());
            }
            prop_assert_eq!(service.snapshot(), before);
            Ok(())
        })?;
    }
}
