//! REST data source and mock fallback against a wiremock backend.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use shopfloor_ops::{
    config::{AppConfig, DataSourceKind},
    datasource::{self, fetch_snapshot, DataSource, FallbackDataSource, MockDataSource, RestDataSource},
    errors::ServiceError,
    models::{MachineStatus, ShippingStatus, UpdateMachineStatusRequest},
    services::machines::MachineService,
};
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn machine_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Machine {id}"),
        "kind": "cnc",
        "location": "Bay A",
        "status": status
    })
}

fn rest(server: &MockServer) -> RestDataSource {
    RestDataSource::new(&server.uri(), Duration::from_secs(2)).expect("client builds")
}

#[tokio::test]
async fn reads_collections_from_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            machine_json("X-1", "running"),
            machine_json("X-2", "down"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let machines = rest(&server).machines().await.unwrap();
    assert_eq!(machines.len(), 2);
    assert_eq!(machines[1].status, MachineStatus::Down);
}

#[tokio::test]
async fn non_success_status_is_external_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/work-orders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
        .mount(&server)
        .await;

    let err = rest(&server).work_orders().await.unwrap_err();
    assert_matches!(err, ServiceError::ExternalServiceError(msg) => {
        assert!(msg.contains("503"));
        assert!(msg.contains("maintenance window"));
    });
}

#[tokio::test]
async fn status_writes_patch_the_record() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/machines/X-2"))
        .and(body_json(json!({ "status": "maintenance" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(machine_json("X-2", "maintenance")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/shipping-orders/SO-1"))
        .and(body_json(json!({ "status": "shipped" })))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such order"))
        .expect(1)
        .mount(&server)
        .await;

    let source = rest(&server);
    let machine = source
        .set_machine_status("X-2", MachineStatus::Maintenance)
        .await
        .unwrap();
    assert_eq!(machine.status, MachineStatus::Maintenance);

    let err = source
        .update_shipping_status("SO-1", ShippingStatus::Shipped)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ExternalServiceError(_));
}

#[tokio::test]
async fn record_ids_cannot_escape_their_resource() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(machine_json("U-1", "down")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([machine_json("X-1", "running")])))
        .mount(&server)
        .await;

    let source = rest(&server);
    let err = source
        .set_machine_status("../users/U-1", MachineStatus::Down)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    let err = source
        .update_shipping_status("..", ShippingStatus::Shipped)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // The service resolves the record first, so unknown ids never reach a write
    let service = MachineService::new(Arc::new(source));
    let request = UpdateMachineStatusRequest {
        status: MachineStatus::Down,
        note: None,
    };
    assert_matches!(
        service.set_status("../users/U-1", request, "U-4").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn record_ids_are_sent_as_one_encoded_segment() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/machines/M%20101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(machine_json("M 101", "idle")))
        .expect(1)
        .mount(&server)
        .await;

    let machine = rest(&server)
        .set_machine_status("M 101", MachineStatus::Idle)
        .await
        .unwrap();
    assert_eq!(machine.id, "M 101");
}

#[tokio::test]
async fn fallback_serves_mock_when_live_read_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = FallbackDataSource::new(
        Arc::new(rest(&server)),
        Arc::new(MockDataSource::seeded()),
    );

    let machines = source.machines().await.unwrap();
    assert_eq!(machines.len(), 8);

    // Snapshot assembly goes through the same fallback
    let snapshot = fetch_snapshot(&source).await.unwrap();
    assert_eq!(snapshot.machines.len(), 8);
    assert!(!snapshot.events.is_empty());
}

#[tokio::test]
async fn fallback_prefers_live_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/machines"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([machine_json("LIVE-1", "idle")])),
        )
        .mount(&server)
        .await;

    let source = FallbackDataSource::new(
        Arc::new(rest(&server)),
        Arc::new(MockDataSource::seeded()),
    );
    let machines = source.machines().await.unwrap();
    assert_eq!(machines.len(), 1);
    assert_eq!(machines[0].id, "LIVE-1");
}

#[tokio::test]
async fn fallback_does_not_write_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mock = Arc::new(MockDataSource::seeded());
    let source = FallbackDataSource::new(Arc::new(rest(&server)), mock.clone());

    let result = source
        .set_machine_status("M-102", MachineStatus::Running)
        .await;
    assert_matches!(result, Err(ServiceError::ExternalServiceError(_)));

    let m102 = mock
        .machines()
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.id == "M-102")
        .unwrap();
    assert_eq!(m102.status, MachineStatus::Down);
}

#[tokio::test]
async fn config_selects_the_source() {
    let source = datasource::from_config(&AppConfig::default()).unwrap();
    assert_eq!(source.name(), "mock");

    let server = MockServer::start().await;
    let cfg = AppConfig {
        data_source: DataSourceKind::Rest,
        rest_base_url: Some(server.uri()),
        fallback_to_mock: false,
        ..AppConfig::default()
    };
    assert_eq!(datasource::from_config(&cfg).unwrap().name(), "rest");

    let cfg = AppConfig {
        fallback_to_mock: true,
        ..cfg
    };
    assert_eq!(
        datasource::from_config(&cfg).unwrap().name(),
        "rest+mock-fallback"
    );
}
