//! # HTTP API Flows
//!
//! Drives the gateway router in-process against a service with a live event
//! channel, checking that what clients see over HTTP matches what the engine
//! committed and what subscribers were told.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    use cs_01_composition_engine::adapters::{
        BroadcastEventPublisher, InMemoryRepository, SystemClock,
    };
    use cs_01_composition_engine::{CompositionEvent, CompositionService, EngineConfig};
    use cs_02_api_gateway::{ApiGatewayService, GatewayConfig};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Harness {
        router: Router,
        service: Arc<CompositionService>,
        events: broadcast::Receiver<CompositionEvent>,
    }

    fn harness_with(engine: EngineConfig) -> Harness {
        let publisher = Arc::new(BroadcastEventPublisher::new());
        let events = publisher.subscribe();
        let service = Arc::new(CompositionService::new(
            engine,
            Arc::new(InMemoryRepository::new()),
            publisher,
            Arc::new(SystemClock),
        ));
        let gateway = ApiGatewayService::new(GatewayConfig::default(), service.clone()).unwrap();
        Harness {
            router: gateway.router(),
            service,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(EngineConfig::default())
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn qty(amount: f64, unit: &str) -> Value {
        json!({"quantity": amount, "unit": unit})
    }

    fn dep(of: &str, amount: f64, unit: &str) -> Value {
        json!({"of": of, "quantity": qty(amount, unit)})
    }

    async fn create(router: &Router, composition: Value) -> Value {
        let (status, body) = send(
            router,
            Method::POST,
            "/v1/composition",
            Some(json!({ "composition": composition })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    /// Two-level recipe: sauce (2 l) from tomato and oil, pizza from sauce and dough
    async fn seed_pizza(router: &Router) {
        create(router, json!({"id": "tomato", "cost": 4.0, "unit": qty(1.0, "kg")})).await;
        create(router, json!({"id": "oil", "cost": 10.0, "unit": qty(1.0, "l")})).await;
        create(router, json!({"id": "dough", "cost": 1.5, "unit": qty(1.0, "u")})).await;
        create(
            router,
            json!({
                "id": "sauce",
                "unit": qty(2.0, "l"),
                "dependencies": [dep("tomato", 1.5, "kg"), dep("oil", 0.1, "l")]
            }),
        )
        .await;
        create(
            router,
            json!({
                "id": "pizza",
                "name": "Margherita",
                "unit": qty(1.0, "u"),
                "dependencies": [dep("sauce", 0.5, "l"), dep("dough", 1.0, "u")]
            }),
        )
        .await;
    }

    fn error_code(body: &Value) -> &str {
        body["error"]["code"].as_str().unwrap_or_default()
    }

    fn drain(events: &mut broadcast::Receiver<CompositionEvent>) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.kind());
        }
        kinds
    }

    // =============================================================================
    // TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_created_graph_is_valued() {
        let mut h = harness();
        seed_pizza(&h.router).await;

        let (status, body) = send(&h.router, Method::GET, "/v1/composition/sauce", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["composition"]["cost"], 7.0);

        let (_, body) = send(&h.router, Method::GET, "/v1/composition/pizza", None).await;
        assert_eq!(body["composition"]["cost"], 3.25);
        assert_eq!(body["composition"]["name"], "Margherita");
        assert_eq!(body["composition"]["validated"], true);

        assert_eq!(drain(&mut h.events), vec!["created"; 5]);
        assert_eq!(h.service.len(), 5);
    }

    #[tokio::test]
    async fn test_price_change_over_http_propagates() {
        let mut h = harness();
        seed_pizza(&h.router).await;
        drain(&mut h.events);

        let (status, body) = send(
            &h.router,
            Method::PUT,
            "/v1/composition/tomato",
            Some(json!({"composition": {"cost": 6.0}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], "UPDATED");
        assert_eq!(body["recomputed"], json!(["sauce", "pizza"]));

        let (_, body) = send(&h.router, Method::GET, "/v1/composition/pizza", None).await;
        assert_eq!(body["composition"]["cost"], 4.0);

        assert_eq!(
            drain(&mut h.events),
            vec!["updated_manually", "updated_automatically"]
        );
    }

    #[tokio::test]
    async fn test_uses_lists_direct_dependents() {
        let h = harness();
        seed_pizza(&h.router).await;

        let (status, body) = send(&h.router, Method::GET, "/v1/composition/sauce/uses", None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body["compositions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["pizza"]);

        let (_, body) = send(&h.router, Method::GET, "/v1/composition/pizza/uses", None).await;
        assert_eq!(body["compositions"], json!([]));
    }

    #[tokio::test]
    async fn test_rejected_mutation_publishes_nothing() {
        let mut h = harness();
        seed_pizza(&h.router).await;
        drain(&mut h.events);
        let before = h.service.snapshot();

        let (status, body) = send(
            &h.router,
            Method::PUT,
            "/v1/composition/tomato/dependencies",
            Some(json!({"dependency": dep("pizza", 1.0, "u")})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "CYCLE_DETECTED");
        assert_eq!(
            body["error"]["data"]["path"],
            json!(["tomato", "pizza", "sauce", "tomato"])
        );

        let (status, body) = send(
            &h.router,
            Method::PUT,
            "/v1/composition/sauce/dependencies",
            Some(json!({"dependency": dep("tomato", 1.0, "l")})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "UNIT_MISMATCH");

        assert!(drain(&mut h.events).is_empty());
        assert_eq!(h.service.snapshot(), before);
    }

    #[tokio::test]
    async fn test_dependency_limit_enforced() {
        let h = harness_with(EngineConfig {
            max_dependencies_per_composition: 1,
            ..EngineConfig::default()
        });
        create(&h.router, json!({"id": "a", "cost": 1.0, "unit": qty(1.0, "u")})).await;
        create(&h.router, json!({"id": "b", "cost": 1.0, "unit": qty(1.0, "u")})).await;

        let (status, body) = send(
            &h.router,
            Method::POST,
            "/v1/composition",
            Some(json!({"composition": {
                "id": "c",
                "unit": qty(1.0, "u"),
                "dependencies": [dep("a", 1.0, "u"), dep("b", 1.0, "u")]
            }})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "TOO_MANY_DEPENDENCIES");
        assert_eq!(body["error"]["data"], json!({"count": 2, "max": 1}));
    }

    #[tokio::test]
    async fn test_teardown_over_http() {
        let mut h = harness();
        seed_pizza(&h.router).await;
        drain(&mut h.events);

        let (status, body) = send(&h.router, Method::DELETE, "/v1/composition/sauce", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["data"]["dependents"], json!(["pizza"]));

        for id in ["pizza", "sauce", "tomato", "oil", "dough"] {
            let uri = format!("/v1/composition/{id}");
            let (status, body) = send(&h.router, Method::DELETE, &uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "DELETED");
        }

        let (_, body) = send(&h.router, Method::GET, "/v1/composition", None).await;
        assert_eq!(body["compositions"], json!([]));
        assert_eq!(drain(&mut h.events), vec!["deleted"; 5]);
    }
}
