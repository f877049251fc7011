//! End-to-end scenarios for the allocation engine, exercised through the
//! public service facade and the HTTP router so the state machine, the
//! eligibility policy, and inventory reconciliation are validated together.

mod common {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime};

    use bto_engine::allocation::{
        Applicant, ApplicantId, AllocationEngine, Clock, EntityStore, FlatType, ManagerId,
        MaritalStatus, MemoryStore, Project, ProjectId, SequenceIds, UnitType,
    };

    pub(super) struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    pub(super) fn build_engine() -> (Arc<MemoryStore>, Arc<AllocationEngine<MemoryStore>>) {
        let store = Arc::new(MemoryStore::default());
        let clock = FixedClock(date(2025, 1, 10).and_hms_opt(9, 0, 0).expect("valid time"));
        let engine = Arc::new(AllocationEngine::new(
            store.clone(),
            Arc::new(clock),
            Arc::new(SequenceIds::default()),
        ));
        (store, engine)
    }

    pub(super) fn acacia() -> Project {
        let mut unit_types = BTreeMap::new();
        unit_types.insert(
            FlatType::TwoRoom,
            UnitType {
                total: 2,
                available: 2,
                price: 120_000,
            },
        );

        Project {
            id: ProjectId("Acacia".to_string()),
            name: "Acacia".to_string(),
            neighborhood: "Yishun".to_string(),
            unit_types,
            open_date: date(2025, 1, 1),
            close_date: date(2025, 1, 31),
            manager: ManagerId("M0000001C".to_string()),
            officer_slots: 2,
            assigned_officers: Vec::new(),
            visible: true,
        }
    }

    pub(super) fn seed(store: &MemoryStore, project: Project) -> ProjectId {
        let id = project.id.clone();
        store.insert_project(project).expect("project inserted");
        id
    }

    pub(super) fn applicant() -> Applicant {
        Applicant {
            id: ApplicantId("S1234567A".to_string()),
            age: 36,
            marital_status: MaritalStatus::Single,
        }
    }

    pub(super) fn available(store: &MemoryStore, project: &ProjectId) -> u32 {
        store
            .find_project(project)
            .expect("store reachable")
            .expect("project present")
            .unit_types
            .get(&FlatType::TwoRoom)
            .expect("two-room offered")
            .available
    }
}

mod lifecycle {
    use super::common::*;
    use bto_engine::allocation::{
        ApplicationError, ApplicationStatus, FlatType, InventoryError, OfficerId,
    };

    #[test]
    fn booked_then_withdrawn_restores_availability() {
        let (store, engine) = build_engine();
        let project = seed(&store, acacia());

        let application = engine
            .applications()
            .submit(&applicant(), &project, FlatType::TwoRoom)
            .expect("submission succeeds");
        assert_eq!(application.status, ApplicationStatus::Pending);

        engine
            .applications()
            .approve(&application.id)
            .expect("application approved");
        engine
            .applications()
            .book(
                &application.id,
                "05-201".to_string(),
                OfficerId("T7654321B".to_string()),
            )
            .expect("booking succeeds");
        assert_eq!(available(&store, &project), 1);

        let receipt = engine
            .applications()
            .generate_receipt(&application.id)
            .expect("receipt generated");
        assert_eq!(receipt.selling_price, 120_000);

        let request = engine
            .withdrawals()
            .request(&application.id, None)
            .expect("withdrawal filed");
        engine
            .withdrawals()
            .approve(&request.id)
            .expect("withdrawal approved");

        assert_eq!(available(&store, &project), 2);
        let stored = engine
            .applications()
            .get(&application.id)
            .expect("application retained for audit");
        assert_eq!(stored.status, ApplicationStatus::Withdrawn);
    }

    #[test]
    fn two_units_allow_exactly_two_bookings() {
        let (store, engine) = build_engine();
        let project = seed(&store, acacia());

        for (nric, unit) in [("S1111111A", "01-101"), ("S2222222B", "01-102")] {
            let mut person = applicant();
            person.id = bto_engine::allocation::ApplicantId(nric.to_string());
            let application = engine
                .applications()
                .submit(&person, &project, FlatType::TwoRoom)
                .expect("submission succeeds");
            engine
                .applications()
                .approve(&application.id)
                .expect("application approved");
            engine
                .applications()
                .book(
                    &application.id,
                    unit.to_string(),
                    OfficerId("T7654321B".to_string()),
                )
                .expect("booking succeeds");
        }
        assert_eq!(available(&store, &project), 0);

        let mut person = applicant();
        person.id = bto_engine::allocation::ApplicantId("S3333333C".to_string());
        let application = engine
            .applications()
            .submit(&person, &project, FlatType::TwoRoom)
            .expect("submission succeeds");
        engine
            .applications()
            .approve(&application.id)
            .expect("application approved");

        match engine.applications().book(
            &application.id,
            "01-103".to_string(),
            OfficerId("T7654321B".to_string()),
        ) {
            Err(ApplicationError::Inventory(InventoryError::InsufficientInventory {
                ..
            })) => {}
            other => panic!("expected insufficient inventory, got {other:?}"),
        }
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use bto_engine::allocation::allocation_router;

    async fn read_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn submit_request() -> Request<Body> {
        let payload = json!({
            "applicant": { "id": "S1234567A", "age": 36, "marital_status": "single" },
            "project": "Acacia",
            "flat_type": "two_room",
        });
        Request::builder()
            .method("POST")
            .uri("/api/v1/applications")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn submission_returns_created_with_pending_status() {
        let (store, engine) = build_engine();
        seed(&store, acacia());
        let router = allocation_router(engine);

        let response = router
            .clone()
            .oneshot(submit_request())
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::CREATED);

        let payload = read_json(response).await;
        assert_eq!(payload.get("status"), Some(&json!("pending")));
        assert!(payload.get("application_id").is_some());
    }

    #[tokio::test]
    async fn duplicate_submission_conflicts() {
        let (store, engine) = build_engine();
        seed(&store, acacia());
        let router = allocation_router(engine);

        let first = router
            .clone()
            .oneshot(submit_request())
            .await
            .expect("router dispatch");
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = router
            .clone()
            .oneshot(submit_request())
            .await
            .expect("router dispatch");
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let payload = read_json(second).await;
        assert!(payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .contains("live application"));
    }

    #[tokio::test]
    async fn ineligible_submission_is_unprocessable() {
        let (store, engine) = build_engine();
        seed(&store, acacia());
        let router = allocation_router(engine);

        let payload = json!({
            "applicant": { "id": "S2222222B", "age": 30, "marital_status": "single" },
            "project": "Acacia",
            "flat_type": "two_room",
        });
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/applications")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request");

        let response = router.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn booking_and_receipt_round_trip() {
        let (store, engine) = build_engine();
        seed(&store, acacia());
        let router = allocation_router(engine);

        let submitted = router
            .clone()
            .oneshot(submit_request())
            .await
            .expect("router dispatch");
        let submitted = read_json(submitted).await;
        let id = submitted
            .get("application_id")
            .and_then(Value::as_str)
            .expect("application id")
            .to_string();

        let approved = router
            .clone()
            .oneshot(post(&format!("/api/v1/applications/{id}/approve")))
            .await
            .expect("router dispatch");
        assert_eq!(approved.status(), StatusCode::OK);

        let book_payload = json!({
            "assigned_unit": "05-201",
            "assigned_officer": "T7654321B",
        });
        let book = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/applications/{id}/book"))
            .header("content-type", "application/json")
            .body(Body::from(book_payload.to_string()))
            .expect("request");
        let booked = router.clone().oneshot(book).await.expect("router dispatch");
        assert_eq!(booked.status(), StatusCode::OK);
        let booked = read_json(booked).await;
        assert_eq!(booked.get("status"), Some(&json!("booked")));

        let receipt = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/v1/applications/{id}/receipt"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(receipt.status(), StatusCode::OK);
        let receipt = read_json(receipt).await;
        assert_eq!(receipt.get("selling_price"), Some(&json!(120_000)));
        assert_eq!(receipt.get("assigned_unit"), Some(&json!("05-201")));
    }

    #[tokio::test]
    async fn double_booking_conflicts() {
        let (store, engine) = build_engine();
        seed(&store, acacia());
        let router = allocation_router(engine);

        let submitted = router
            .clone()
            .oneshot(submit_request())
            .await
            .expect("router dispatch");
        let submitted = read_json(submitted).await;
        let id = submitted
            .get("application_id")
            .and_then(Value::as_str)
            .expect("application id")
            .to_string();

        router
            .clone()
            .oneshot(post(&format!("/api/v1/applications/{id}/approve")))
            .await
            .expect("router dispatch");

        let book_payload = json!({
            "assigned_unit": "05-201",
            "assigned_officer": "T7654321B",
        });
        for expected in [StatusCode::OK, StatusCode::CONFLICT] {
            let book = Request::builder()
                .method("POST")
                .uri(format!("/api/v1/applications/{id}/book"))
                .header("content-type", "application/json")
                .body(Body::from(book_payload.to_string()))
                .expect("request");
            let response = router.clone().oneshot(book).await.expect("router dispatch");
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let (store, engine) = build_engine();
        seed(&store, acacia());
        let router = allocation_router(engine);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/applications/app-999999")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overlapping_officer_registration_conflicts() {
        let (store, engine) = build_engine();
        seed(&store, acacia());
        let mut overlapping = acacia();
        overlapping.id = bto_engine::allocation::ProjectId("Birch".to_string());
        overlapping.name = "Birch".to_string();
        overlapping.open_date = date(2025, 1, 15);
        overlapping.close_date = date(2025, 2, 15);
        seed(&store, overlapping);
        let router = allocation_router(engine);

        let register = |project: &str| {
            let payload = json!({ "officer": "T7654321B", "project": project });
            Request::builder()
                .method("POST")
                .uri("/api/v1/registrations")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request")
        };

        let first = router
            .clone()
            .oneshot(register("Acacia"))
            .await
            .expect("router dispatch");
        assert_eq!(first.status(), StatusCode::CREATED);
        let first = read_json(first).await;
        let registration_id = first
            .get("id")
            .and_then(Value::as_str)
            .expect("registration id")
            .to_string();

        let approved = router
            .clone()
            .oneshot(post(&format!(
                "/api/v1/registrations/{registration_id}/approve"
            )))
            .await
            .expect("router dispatch");
        assert_eq!(approved.status(), StatusCode::OK);

        let second = router
            .clone()
            .oneshot(register("Birch"))
            .await
            .expect("router dispatch");
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn withdrawal_round_trip_over_http() {
        let (store, engine) = build_engine();
        let project = seed(&store, acacia());
        let router = allocation_router(engine);

        let submitted = router
            .clone()
            .oneshot(submit_request())
            .await
            .expect("router dispatch");
        let submitted = read_json(submitted).await;
        let id = submitted
            .get("application_id")
            .and_then(Value::as_str)
            .expect("application id")
            .to_string();

        let payload = json!({ "application": id, "remarks": "found private housing" });
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/withdrawals")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request");
        let filed = router.clone().oneshot(request).await.expect("router dispatch");
        assert_eq!(filed.status(), StatusCode::CREATED);
        let filed = read_json(filed).await;
        let withdrawal_id = filed
            .get("id")
            .and_then(Value::as_str)
            .expect("withdrawal id")
            .to_string();

        let approved = router
            .clone()
            .oneshot(post(&format!(
                "/api/v1/withdrawals/{withdrawal_id}/approve"
            )))
            .await
            .expect("router dispatch");
        assert_eq!(approved.status(), StatusCode::OK);
        let approved = read_json(approved).await;
        assert_eq!(approved.get("status"), Some(&json!("approved")));

        let application = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/v1/applications/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        let application = read_json(application).await;
        assert_eq!(application.get("status"), Some(&json!("withdrawn")));

        assert_eq!(available(&store, &project), 2);
    }
}
