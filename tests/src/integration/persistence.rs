//! # Persistence Flows
//!
//! Restarting the service over a JSON snapshot: committed valuations come
//! back unchanged, and nodes whose stored subgraph no longer validates are
//! flagged instead of dropped.

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use cs_01_composition_engine::adapters::{
        JsonFileRepository, NoopEventPublisher, SystemClock,
    };
    use cs_01_composition_engine::{
        CompositionApi, CompositionError, CompositionId, CompositionPatch,
        CompositionRepository, CompositionService, DependencyInput, EngineConfig,
        NewComposition, Quantity,
    };

    fn id(s: &str) -> CompositionId {
        CompositionId::new(s)
    }

    fn open(dir: &Path) -> (Arc<JsonFileRepository>, CompositionService) {
        let repository = Arc::new(JsonFileRepository::open(dir).unwrap());
        let service = CompositionService::restore(
            EngineConfig::default(),
            repository.clone(),
            Arc::new(NoopEventPublisher::default()),
            Arc::new(SystemClock),
        )
        .unwrap();
        (repository, service)
    }

    async fn seed(service: &CompositionService) {
        let kg = |amount| Quantity::new(amount, "kg");
        service
            .create(NewComposition::new(kg(1.0)).with_id("flour").with_cost(2.0))
            .await
            .unwrap();
        service
            .create(NewComposition::new(kg(1.0)).with_id("sugar").with_cost(3.0))
            .await
            .unwrap();
        service
            .create(
                NewComposition::new(kg(2.0))
                    .with_id("dough")
                    .with_dependency("flour", kg(1.5))
                    .with_dependency("sugar", kg(0.5)),
            )
            .await
            .unwrap();
        service
            .create(
                NewComposition::new(kg(1.0))
                    .with_id("bread")
                    .with_dependency("dough", kg(1.0)),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_restart_restores_valuations() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (_, service) = open(dir.path());
            seed(&service).await;
            service
                .update(&id("sugar"), CompositionPatch::default().with_cost(5.0))
                .await
                .unwrap();
        }

        let (_, service) = open(dir.path());
        assert_eq!(service.len(), 4);
        assert_eq!(service.get(&id("dough")).await.unwrap().cost, 5.5);
        assert_eq!(service.get(&id("bread")).await.unwrap().cost, 2.75);
        assert!(service.snapshot().iter().all(|c| c.validated));

        let uses = service.uses(&id("dough")).await.unwrap();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].id, id("bread"));
    }

    #[tokio::test]
    async fn test_deletes_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (_, service) = open(dir.path());
            seed(&service).await;
            service.delete(&id("bread")).await.unwrap();
        }

        let (repository, service) = open(dir.path());
        assert_eq!(repository.load_all().unwrap().len(), 3);
        assert!(service.get(&id("bread")).await.is_err());
        assert!(service.uses(&id("dough")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_cost_never_reaches_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (_, service) = open(dir.path());
            seed(&service).await;
            service
                .update(&id("flour"), CompositionPatch::default().with_cost(1e308))
                .await
                .unwrap();

            let err = service
                .update(
                    &id("bread"),
                    CompositionPatch::default().with_dependencies(vec![DependencyInput::new(
                        "dough",
                        Quantity::new(1e10, "kg"),
                    )]),
                )
                .await
                .unwrap_err();
            assert_eq!(err, CompositionError::CostOverflow { id: id("bread") });
        }

        let (repository, service) = open(dir.path());
        assert_eq!(repository.load_all().unwrap().len(), 4);
        assert!(service.snapshot().iter().all(|c| c.cost.is_finite()));
        let bread = service.get(&id("bread")).await.unwrap();
        assert_eq!(bread.dependencies[0].quantity, Quantity::new(1.0, "kg"));
    }

    #[tokio::test]
    async fn test_broken_snapshot_flags_affected_nodes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (repository, service) = open(dir.path());
            seed(&service).await;

            let mut dough = repository
                .load_all()
                .unwrap()
                .into_iter()
                .find(|c| c.id == id("dough"))
                .unwrap();
            dough.dependencies[1].of = id("ghost");
            repository.save(&[dough]).unwrap();
        }

        let (_, service) = open(dir.path());
        let validated = |name: &str| {
            service
                .snapshot()
                .into_iter()
                .find(|c| c.id == id(name))
                .map(|c| c.validated)
                .unwrap()
        };

        assert!(!validated("dough"));
        assert!(!validated("bread"));
        assert!(validated("flour"));
        assert!(validated("sugar"));
    }
}
