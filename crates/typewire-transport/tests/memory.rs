//! Routing tests for the in-memory transport.

use std::time::Duration;

use bytes::Bytes;
use typewire_transport::{
    DimensionId, Destination, EndpointId, MemoryClient, MemoryServer, Placement,
    SenderContext, Side, TargetPoint, Transport, TransportError,
};

const OVERWORLD: DimensionId = DimensionId::new(0);
const NETHER: DimensionId = DimensionId::new(1);

/// Receives one frame or fails after a short timeout.
async fn recv_one(client: &MemoryClient) -> Bytes {
    tokio::time::timeout(Duration::from_secs(1), client.recv())
        .await
        .expect("timed out")
        .unwrap()
        .expect("transport closed")
        .data
}

/// Asserts nothing arrives within a short window.
async fn assert_silent(client: &MemoryClient) {
    let result = tokio::time::timeout(Duration::from_millis(50), client.recv()).await;
    assert!(result.is_err(), "client {} received a frame", client.id());
}

#[tokio::test]
async fn test_client_to_server_carries_sender() {
    let server = MemoryServer::new();
    let client = server.connect(Placement::default()).await;
    assert_eq!(client.side(), Side::Client);
    assert_eq!(server.side(), Side::Server);

    client
        .send(Bytes::from_static(b"\x00\x01"), &Destination::Server)
        .await
        .unwrap();

    let inbound = server.recv().await.unwrap().unwrap();
    assert_eq!(&inbound.data[..], b"\x00\x01");
    assert_eq!(inbound.sender, SenderContext::Endpoint(client.id()));
}

#[tokio::test]
async fn test_client_cannot_address_other_clients() {
    let server = MemoryServer::new();
    let client = server.connect(Placement::default()).await;
    let err = client
        .send(Bytes::new(), &Destination::All)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransportError::Unroutable {
            from: Side::Client,
            destination: "all"
        }
    ));
}

#[tokio::test]
async fn test_endpoint_destination_reaches_only_that_client() {
    let server = MemoryServer::new();
    let a = server.connect(Placement::default()).await;
    let b = server.connect(Placement::default()).await;

    server
        .send(Bytes::from_static(b"a"), &Destination::Endpoint(a.id()))
        .await
        .unwrap();

    assert_eq!(&recv_one(&a).await[..], b"a");
    assert_silent(&b).await;
}

#[tokio::test]
async fn test_unknown_endpoint_is_an_error() {
    let server = MemoryServer::new();
    let err = server
        .send(Bytes::new(), &Destination::Endpoint(EndpointId::new(42)))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::UnknownEndpoint(id) if id == EndpointId::new(42)));
}

#[tokio::test]
async fn test_all_reaches_every_client() {
    let server = MemoryServer::new();
    let a = server.connect(Placement::default()).await;
    let b = server.connect(Placement::new(NETHER, 5.0, 5.0, 5.0)).await;

    server
        .send(Bytes::from_static(b"hi"), &Destination::All)
        .await
        .unwrap();

    assert_eq!(&recv_one(&a).await[..], b"hi");
    assert_eq!(&recv_one(&b).await[..], b"hi");
}

#[tokio::test]
async fn test_all_around_filters_by_distance_and_dimension() {
    let server = MemoryServer::new();
    let near = server.connect(Placement::new(OVERWORLD, 3.0, 0.0, 4.0)).await;
    let far = server.connect(Placement::new(OVERWORLD, 30.0, 0.0, 40.0)).await;
    let elsewhere = server.connect(Placement::new(NETHER, 0.0, 0.0, 0.0)).await;

    let point = TargetPoint {
        dimension: OVERWORLD,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        range: 5.0,
    };
    server
        .send(Bytes::from_static(b"boom"), &Destination::AllAround(point))
        .await
        .unwrap();

    assert_eq!(&recv_one(&near).await[..], b"boom");
    assert_silent(&far).await;
    assert_silent(&elsewhere).await;
}

#[tokio::test]
async fn test_dimension_destination_and_relocation() {
    let server = MemoryServer::new();
    let a = server.connect(Placement::new(OVERWORLD, 0.0, 0.0, 0.0)).await;
    let b = server.connect(Placement::new(OVERWORLD, 0.0, 0.0, 0.0)).await;

    server
        .relocate(b.id(), Placement::new(NETHER, 0.0, 0.0, 0.0))
        .await
        .unwrap();
    server
        .send(Bytes::from_static(b"n"), &Destination::Dimension(NETHER))
        .await
        .unwrap();

    assert_eq!(&recv_one(&b).await[..], b"n");
    assert_silent(&a).await;
}

#[tokio::test]
async fn test_disconnect_ends_client_stream() {
    let server = MemoryServer::new();
    let client = server.connect(Placement::default()).await;
    server.disconnect(client.id()).await.unwrap();
    assert!(client.recv().await.unwrap().is_none());
    assert!(server.endpoints().await.is_empty());
}

#[tokio::test]
async fn test_server_close_wakes_pending_recv() {
    let server = std::sync::Arc::new(MemoryServer::new());
    let client = server.connect(Placement::default()).await;

    let pending = tokio::spawn({
        let server = std::sync::Arc::clone(&server);
        async move { server.recv().await }
    });
    tokio::task::yield_now().await;
    server.close().await.unwrap();

    assert!(pending.await.unwrap().unwrap().is_none());
    assert!(client.recv().await.unwrap().is_none());
    assert!(matches!(
        client.send(Bytes::new(), &Destination::Server).await,
        Err(TransportError::Shutdown)
    ));
}
