//! Integration tests for end-to-end sync runs
//!
//! A mock custom EMR serves canonical records over HTTP and the in-memory
//! store stands in for PostgreSQL.

use hms_sync::adapters::database::Stores;
use hms_sync::adapters::memory::MemoryStore;
use hms_sync::config::{secret_string, DatabaseTarget, HmsCredentials, SyncConfig};
use hms_sync::core::sync::{SyncCoordinator, SyncRequest};
use hms_sync::domain::{ConsentGrant, ConsentType, DataType, PatientId, SyncError};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;

fn patient(id: &str) -> PatientId {
    PatientId::new(id).unwrap()
}

fn fast_config() -> SyncConfig {
    let mut config = SyncConfig::new(DatabaseTarget::Memory);
    config.hms.retry.max_retries = 1;
    config.hms.retry.initial_delay_ms = 1;
    config.hms.retry.max_delay_ms = 5;
    config
}

fn credentials(server: &mockito::ServerGuard) -> HmsCredentials {
    HmsCredentials::new("custom", server.url())
        .with_login("sync", secret_string("pw".to_string()))
}

async fn mock_login(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/api/auth/login")
        .with_status(200)
        .with_body(json!({"token": "emr-token"}).to_string())
        .create_async()
        .await
}

async fn coordinator_with_consent(
    store: &Arc<MemoryStore>,
    consenting: &[&str],
) -> (SyncCoordinator, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let coordinator =
        SyncCoordinator::with_stores(fast_config(), Stores::shared(store.clone()), shutdown_rx);

    for id in consenting {
        coordinator
            .consent_gate()
            .log(&patient(id), ConsentType::DataSync, ConsentGrant::new("nurse.wanjiku"))
            .await
            .unwrap();
    }

    (coordinator, shutdown_tx)
}

#[tokio::test]
async fn test_full_sync_against_custom_emr() {
    let mut server = mockito::Server::new_async().await;
    let login = mock_login(&mut server).await;

    server
        .mock("GET", "/api/patients/EMR-1/vitals")
        .match_header("authorization", "Bearer emr-token")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(
            json!([
                {
                    "timestamp": "2024-05-01T08:00:00Z",
                    "systolic_bp": 118.0,
                    "diastolic_bp": 76.0,
                    "heart_rate": 72.0,
                    "recorded_by": "nurse.wanjiku"
                },
                {
                    "timestamp": "2024-05-02T08:00:00Z",
                    "systolic_bp": 192.0,
                    "diastolic_bp": 110.0,
                    "heart_rate": 88.0,
                    "weight": 70.0,
                    "height": 175.0,
                    "recorded_by": "nurse.wanjiku"
                }
            ])
            .to_string(),
        )
        .create_async()
        .await;

    server
        .mock("GET", "/api/patients/EMR-1/lab-results")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    server
        .mock("GET", "/api/patients/EMR-1/prescriptions")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(
            json!([
                {
                    "medication_name": "Amlodipine",
                    "dosage": "5mg",
                    "frequency": "OD",
                    "prescribed_date": "2024-05-02T09:00:00Z",
                    "prescribed_by": "dr.otieno"
                },
                {
                    "medication_name": "Hydrochlorothiazide",
                    "dosage": "12.5mg",
                    "frequency": "OD",
                    "prescribed_date": "2024-05-02T09:05:00Z",
                    "prescribed_by": "dr.otieno"
                }
            ])
            .to_string(),
        )
        .create_async()
        .await;

    server
        .mock("GET", "/api/patients/EMR-1/diagnoses")
        .match_query(mockito::Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.register_patient(&patient("EMR-1")).await;
    store.register_patient(&patient("EMR-2")).await;
    let (coordinator, _shutdown_tx) = coordinator_with_consent(&store, &["EMR-1"]).await;

    let request = SyncRequest::new(credentials(&server), vec![patient("EMR-1"), patient("EMR-2")]);
    let summary = coordinator.sync(request).await.unwrap();

    login.assert_async().await;
    assert_eq!(summary.system, "custom");
    assert_eq!(summary.patients_requested, 2);
    assert_eq!(summary.patients_synced, 1);
    assert_eq!(summary.denied_patients, vec![patient("EMR-2")]);

    let vitals = summary.type_summary(DataType::Vitals).unwrap();
    assert_eq!(vitals.fetched, 2);
    assert_eq!(vitals.stored, 2);
    assert!(vitals.error.is_none());

    let labs = summary.type_summary(DataType::LabResults).unwrap();
    assert_eq!(labs.fetched, 0);
    assert!(labs.error.is_none());

    let prescriptions = summary.type_summary(DataType::Prescriptions).unwrap();
    assert_eq!(prescriptions.stored, 2);

    let diagnoses = summary.type_summary(DataType::Diagnoses).unwrap();
    assert_eq!(diagnoses.stored, 0);
    assert_eq!(diagnoses.error.as_ref().unwrap().kind, "transient_network");
    assert!(!summary.is_successful());

    // One active queue row, decided by the newest reading
    let queue = store.queue_rows().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].priority, "urgent");
    assert_eq!(queue[0].triage_data["sync_source"], "hms_integration");

    assert_eq!(store.prescriptions().await.len(), 2);
    assert!(store.consultations().await.is_empty());
}

#[tokio::test]
async fn test_date_window_and_type_selection() {
    let mut server = mockito::Server::new_async().await;
    mock_login(&mut server).await;

    let labs = server
        .mock("GET", "/api/patients/EMR-1/lab-results")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("date_from".into(), "2024-03-01T00:00:00Z".into()),
            mockito::Matcher::UrlEncoded("date_to".into(), "2024-03-31T23:59:59Z".into()),
        ]))
        .with_status(200)
        .with_body(
            json!([
                {"test_name": "Hemoglobin", "ordered_date": "2024-03-10", "result_value": "11.2", "units": "g/dL"},
                {"test_name": "Hemoglobin", "ordered_date": "2024-02-10", "result_value": "10.8", "units": "g/dL"}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.register_patient(&patient("EMR-1")).await;
    let (coordinator, _shutdown_tx) = coordinator_with_consent(&store, &["EMR-1"]).await;

    let range = hms_sync::domain::DateRange::new(
        Some(hms_sync::domain::parse_timestamp("2024-03-01").unwrap()),
        Some(hms_sync::domain::parse_range_end("2024-03-31").unwrap()),
    )
    .unwrap();
    let request = SyncRequest::new(credentials(&server), vec![patient("EMR-1")])
        .with_date_range(range)
        .only(&[DataType::LabResults]);

    let summary = coordinator.sync(request).await.unwrap();

    labs.assert_async().await;
    assert_eq!(summary.types.len(), 1);
    let lab_summary = summary.type_summary(DataType::LabResults).unwrap();
    assert_eq!(lab_summary.stored, 1);
    assert_eq!(lab_summary.out_of_range, 1);
    assert!(summary.is_successful());
}

#[tokio::test]
async fn test_rejected_credentials_fail_the_request() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth/login")
        .with_status(401)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.register_patient(&patient("EMR-1")).await;
    let (coordinator, _shutdown_tx) = coordinator_with_consent(&store, &["EMR-1"]).await;

    let request = SyncRequest::new(credentials(&server), vec![patient("EMR-1")]);
    let result = coordinator.sync(request).await;

    assert!(matches!(result, Err(SyncError::Authentication { .. })));
    assert!(store.queue_rows().await.is_empty());
}

#[tokio::test]
async fn test_no_consenting_patients_skips_the_hms() {
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("POST", "/api/auth/login")
        .expect(0)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    let (coordinator, _shutdown_tx) = coordinator_with_consent(&store, &[]).await;

    let request = SyncRequest::new(credentials(&server), vec![patient("EMR-7")]);
    let summary = coordinator.sync(request).await.unwrap();

    login.assert_async().await;
    assert_eq!(summary.denied_patients, vec![patient("EMR-7")]);
    assert_eq!(summary.types.len(), 4);
    assert_eq!(summary.total_stored(), 0);
}

#[tokio::test]
async fn test_failing_patient_does_not_discard_the_others() {
    let mut server = mockito::Server::new_async().await;
    mock_login(&mut server).await;

    server
        .mock("GET", "/api/patients/P-1/vitals")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(
            json!([{
                "timestamp": "2024-05-01T08:00:00Z",
                "systolic_bp": 124.0,
                "diastolic_bp": 80.0,
                "heart_rate": 70.0,
                "recorded_by": "nurse.wanjiku"
            }])
            .to_string(),
        )
        .create_async()
        .await;

    server
        .mock("GET", "/api/patients/P-2/vitals")
        .match_query(mockito::Matcher::Any)
        .with_status(400)
        .with_body("unknown patient")
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.register_patient(&patient("P-1")).await;
    store.register_patient(&patient("P-2")).await;
    let (coordinator, _shutdown_tx) = coordinator_with_consent(&store, &["P-1", "P-2"]).await;

    let request = SyncRequest::new(credentials(&server), vec![patient("P-1"), patient("P-2")])
        .only(&[DataType::Vitals]);
    let summary = coordinator.sync(request).await.unwrap();

    let vitals = summary.type_summary(DataType::Vitals).unwrap();
    assert!(vitals.error.is_none());
    assert_eq!(vitals.fetched, 1);
    assert_eq!(vitals.stored, 1);
    assert_eq!(vitals.failed_patients.len(), 1);
    assert_eq!(vitals.failed_patients[0].patient_id, patient("P-2"));
    assert_eq!(vitals.failed_patients[0].kind, "hms");
    assert!(!summary.is_successful());

    let queue = store.queue_rows().await;
    assert_eq!(queue.len(), 1);
}
