//! HttpMetadataClient against a local metadata server.

use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use netdra_cloud::gce::{ATTR_BLOCK, ATTR_NETWORK_NAME};
use netdra_cloud::{
    fetch_gce_instance, CloudInstance, DeviceIdentifiers, FetchPolicy, HttpMetadataClient,
    MetadataClient, QualifiedName,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

fn require_flavor(headers: &HeaderMap) -> Result<(), StatusCode> {
    match headers.get("Metadata-Flavor").and_then(|v| v.to_str().ok()) {
        Some("Google") => Ok(()),
        _ => Err(StatusCode::FORBIDDEN),
    }
}

async fn serve(with_physical_host: bool) -> SocketAddr {
    let mut app = Router::new()
        .route(
            "/computeMetadata/v1/instance/name",
            get(|headers: HeaderMap| async move {
                require_flavor(&headers).map(|_| "gpu-node-1")
            }),
        )
        .route(
            "/computeMetadata/v1/instance/machine-type",
            get(|headers: HeaderMap| async move {
                require_flavor(&headers).map(|_| "projects/12345/machineTypes/a3-ultragpu-8g")
            }),
        )
        .route(
            "/computeMetadata/v1/instance/network-interfaces/",
            get(|headers: HeaderMap| async move {
                require_flavor(&headers).map(|_| {
                    r#"[{"ip":"10.0.0.2","mac":"42:01:0a:00:00:02","mtu":8896,
                        "network":"projects/12345/networks/gpu-net-1"}]"#
                })
            }),
        );
    if with_physical_host {
        app = app.route(
            "/computeMetadata/v1/instance/attributes/physical_host",
            get(|headers: HeaderMap| async move {
                require_flavor(&headers).map(|_| "/cluster-a/sub-b/host-c")
            }),
        );
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> HttpMetadataClient {
    HttpMetadataClient::new(
        format!("http://{}/computeMetadata/v1/", addr),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn test_http_get_sends_flavor_header() {
    let addr = serve(false).await;
    let body = client(addr).get("instance/name").await.unwrap();
    assert_eq!(body, "gpu-node-1");
}

#[tokio::test]
async fn test_http_get_not_found() {
    let addr = serve(false).await;
    let err = client(addr)
        .get("instance/attributes/physical_host")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("physical_host"));
}

#[tokio::test]
async fn test_fetch_over_http() {
    let addr = serve(true).await;
    let instance = fetch_gce_instance(&client(addr), &FetchPolicy::default())
        .await
        .unwrap();
    assert_eq!(instance.name, "gpu-node-1");
    assert_eq!(instance.machine_type, "a3-ultragpu-8g");
    assert_eq!(instance.topology.as_deref(), Some("/cluster-a/sub-b/host-c"));

    let attrs = instance
        .device_attributes(&DeviceIdentifiers::with_mac("42:01:0a:00:00:02"))
        .unwrap();
    assert_eq!(
        attrs
            .get(&QualifiedName::from(ATTR_NETWORK_NAME))
            .and_then(|a| a.as_str()),
        Some("gpu-net-1")
    );
    assert_eq!(
        attrs
            .get(&QualifiedName::from(ATTR_BLOCK))
            .and_then(|a| a.as_str()),
        Some("cluster-a")
    );
}

#[tokio::test]
async fn test_fetch_over_http_without_topology() {
    let addr = serve(false).await;
    let instance = fetch_gce_instance(&client(addr), &FetchPolicy::default())
        .await
        .unwrap();
    assert_eq!(instance.topology, None);
}
