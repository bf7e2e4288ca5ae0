//! # Valuation Flows
//!
//! A small bakery bill of materials driven through the engine API with a
//! broadcast publisher attached:
//!
//! ```text
//! cake ──→ dough ──→ flour
//!   │        └─────→ sugar
//!   └────→ eggs
//! ```
//!
//! Every mutation is checked for its committed values and for the events
//! subscribers observe.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tokio::time::timeout;

    use cs_01_composition_engine::adapters::{
        BroadcastEventPublisher, InMemoryRepository, SystemClock,
    };
    use cs_01_composition_engine::{
        CompositionApi, CompositionError, CompositionEvent, CompositionId, CompositionPatch,
        CompositionService, DependencyInput, EngineConfig, NewComposition, OperationStatus,
        Quantity,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn id(s: &str) -> CompositionId {
        CompositionId::new(s)
    }

    fn kg(amount: f64) -> Quantity {
        Quantity::new(amount, "kg")
    }

    fn units(amount: f64) -> Quantity {
        Quantity::new(amount, "u")
    }

    fn service_with_events() -> (CompositionService, broadcast::Receiver<CompositionEvent>) {
        let publisher = Arc::new(BroadcastEventPublisher::new());
        let events = publisher.subscribe();
        let service = CompositionService::new(
            EngineConfig::default(),
            Arc::new(InMemoryRepository::new()),
            publisher,
            Arc::new(SystemClock),
        );
        (service, events)
    }

    async fn seed_bakery(service: &CompositionService) {
        let requests = [
            NewComposition::new(kg(1.0)).with_id("flour").with_cost(2.0),
            NewComposition::new(kg(1.0)).with_id("sugar").with_cost(3.0),
            NewComposition::new(units(12.0)).with_id("eggs").with_cost(6.0),
            NewComposition::new(kg(2.0))
                .with_id("dough")
                .with_dependency("flour", kg(1.5))
                .with_dependency("sugar", kg(0.5)),
            NewComposition::new(units(1.0))
                .with_id("cake")
                .with_name("Sponge cake")
                .with_dependency("dough", kg(1.0))
                .with_dependency("eggs", units(3.0)),
        ];
        for request in requests {
            service.create(request).await.unwrap();
        }
    }

    async fn next_event(events: &mut broadcast::Receiver<CompositionEvent>) -> CompositionEvent {
        timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("event not published")
            .unwrap()
    }

    fn drain(events: &mut broadcast::Receiver<CompositionEvent>) {
        while events.try_recv().is_ok() {}
    }

    // =============================================================================
    // TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_bakery_valuation() {
        let (service, _events) = service_with_events();
        seed_bakery(&service).await;

        let dough = service.get(&id("dough")).await.unwrap();
        assert_eq!(dough.cost, 4.5);
        assert_eq!(dough.dependencies[0].subvalue, 3.0);
        assert_eq!(dough.dependencies[1].subvalue, 1.5);

        let cake = service.get(&id("cake")).await.unwrap();
        assert_eq!(cake.cost, 3.75);
        assert!(cake.validated);
    }

    #[tokio::test]
    async fn test_leaf_update_reaches_every_ancestor() {
        let (service, mut events) = service_with_events();
        seed_bakery(&service).await;
        drain(&mut events);

        let committed = service
            .update(&id("flour"), CompositionPatch::default().with_cost(4.0))
            .await
            .unwrap();
        assert_eq!(committed.status, OperationStatus::Updated);

        let mut recomputed = committed.recomputed.clone();
        recomputed.sort();
        assert_eq!(recomputed, vec![id("cake"), id("dough")]);

        assert_eq!(service.get(&id("dough")).await.unwrap().cost, 7.5);
        assert_eq!(service.get(&id("cake")).await.unwrap().cost, 5.25);

        match next_event(&mut events).await {
            CompositionEvent::UpdatedManually { composition } => {
                assert_eq!(composition.id, id("flour"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match next_event(&mut events).await {
            CompositionEvent::UpdatedAutomatically { compositions } => {
                let mut ids: Vec<_> = compositions.into_iter().map(|c| c.id).collect();
                ids.sort();
                assert_eq!(ids, vec![id("cake"), id("dough")]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unrelated_branch_untouched() {
        let (service, _events) = service_with_events();
        seed_bakery(&service).await;
        service
            .create(NewComposition::new(kg(1.0)).with_id("salt").with_cost(1.0))
            .await
            .unwrap();

        let before = service.get(&id("cake")).await.unwrap();
        let committed = service
            .update(&id("salt"), CompositionPatch::default().with_cost(9.0))
            .await
            .unwrap();

        assert!(committed.recomputed.is_empty());
        assert_eq!(service.get(&id("cake")).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_swapping_dependency_rewires_reverse_edges() {
        let (service, _events) = service_with_events();
        seed_bakery(&service).await;

        service
            .update(
                &id("dough"),
                CompositionPatch::default()
                    .with_dependencies(vec![DependencyInput::new("flour", kg(2.0))]),
            )
            .await
            .unwrap();

        assert!(service.uses(&id("sugar")).await.unwrap().is_empty());
        assert_eq!(service.get(&id("dough")).await.unwrap().cost, 4.0);
        assert_eq!(service.get(&id("cake")).await.unwrap().cost, 3.5);

        let status = service.delete(&id("sugar")).await.unwrap();
        assert_eq!(status, OperationStatus::Deleted);
    }

    #[tokio::test]
    async fn test_indirect_cycle_rejected() {
        let (service, mut events) = service_with_events();
        seed_bakery(&service).await;
        drain(&mut events);
        let before = service.snapshot();

        let err = service
            .upsert_dependency(&id("flour"), DependencyInput::new("cake", units(1.0)))
            .await
            .unwrap_err();

        match err {
            CompositionError::CycleDetected { path } => {
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&id("dough")));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(service.snapshot(), before);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_teardown_in_dependency_order() {
        let (service, mut events) = service_with_events();
        seed_bakery(&service).await;
        drain(&mut events);

        let err = service.delete(&id("dough")).await.unwrap_err();
        assert!(matches!(err, CompositionError::ReferencedByOthers { .. }));

        for name in ["cake", "dough", "eggs", "flour", "sugar"] {
            service.delete(&id(name)).await.unwrap();
            match next_event(&mut events).await {
                CompositionEvent::Deleted { id: deleted } => assert_eq!(deleted, id(name)),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(service.is_empty());
    }
}
