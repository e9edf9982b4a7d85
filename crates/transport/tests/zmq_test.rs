//! Integration tests for the ROUTER/DEALER hub and spoke transport.
//!
//! Tests verify route learning, tag/source matching across processes'
//! worth of sockets, and per-sender FIFO ordering.

use std::time::Duration;

use tokio::time::timeout;

use tessera_transport::{Address, Endpoint, Message, Source, Tag, Transport, ZmqHub, ZmqSpoke};

const SETTLE: Duration = Duration::from_millis(200);
const TIMEOUT: Duration = Duration::from_secs(5);

const REQUEST: Tag = Tag(1);
const REPLY: Tag = Tag(2);
const RESULT: Tag = Tag(3);

#[tokio::test]
async fn spoke_request_hub_reply() {
    let endpoint = Endpoint::tcp("127.0.0.1", 16700);
    let hub = ZmqHub::bind(&endpoint).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let spoke = ZmqSpoke::connect(&endpoint, Address::worker(0)).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    spoke
        .send(Address::COORDINATOR, Message::new(REQUEST, &"ping").unwrap())
        .await
        .unwrap();

    let request = timeout(TIMEOUT, hub.recv(Source::Any, REQUEST))
        .await
        .expect("request should arrive")
        .unwrap();
    assert_eq!(request.source, Address::worker(0));
    assert_eq!(request.message.decode::<String>().unwrap(), "ping");
    assert_eq!(hub.known_peers(), vec![Address::worker(0)]);

    let reply = Message::with_correlation(REPLY, &"pong", request.message.correlation_id).unwrap();
    hub.send(request.source, reply).await.unwrap();

    let reply = timeout(TIMEOUT, spoke.recv(Source::Exact(Address::COORDINATOR), REPLY))
        .await
        .expect("reply should arrive")
        .unwrap();
    assert_eq!(reply.message.correlation_id, request.message.correlation_id);
    assert_eq!(reply.message.decode::<String>().unwrap(), "pong");

    spoke.shutdown().await;
    hub.shutdown().await;
}

#[tokio::test]
async fn hub_cannot_reach_silent_worker() {
    let endpoint = Endpoint::tcp("127.0.0.1", 16710);
    let hub = ZmqHub::bind(&endpoint).await.unwrap();

    let err = hub
        .send(Address::worker(3), Message::new(REPLY, &0u8).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        tessera_transport::TransportError::UnknownAddress(a) if a == Address::worker(3)
    ));
    hub.shutdown().await;
}

#[tokio::test]
async fn spoke_only_routes_to_coordinator() {
    let endpoint = Endpoint::tcp("127.0.0.1", 16720);
    let hub = ZmqHub::bind(&endpoint).await.unwrap();
    tokio::time::sleep(SETTLE).await;
    let spoke = ZmqSpoke::connect(&endpoint, Address::worker(1)).await.unwrap();

    let err = spoke
        .send(Address::worker(0), Message::new(RESULT, &1u8).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, tessera_transport::TransportError::UnknownAddress(_)));

    spoke.shutdown().await;
    hub.shutdown().await;
}

#[tokio::test]
async fn per_sender_order_is_preserved_and_tags_are_separate() {
    let endpoint = Endpoint::tcp("127.0.0.1", 16730);
    let hub = ZmqHub::bind(&endpoint).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let a = ZmqSpoke::connect(&endpoint, Address::worker(0)).await.unwrap();
    let b = ZmqSpoke::connect(&endpoint, Address::worker(1)).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    for i in 0..10u32 {
        a.send(Address::COORDINATOR, Message::new(RESULT, &i).unwrap())
            .await
            .unwrap();
        b.send(Address::COORDINATOR, Message::new(RESULT, &(100 + i)).unwrap())
            .await
            .unwrap();
    }
    a.send(Address::COORDINATOR, Message::new(REQUEST, &()).unwrap())
        .await
        .unwrap();

    // The request tag is matched independently of the queued results.
    let who = timeout(TIMEOUT, hub.probe(Source::Any, REQUEST))
        .await
        .expect("request should arrive")
        .unwrap();
    assert_eq!(who, Address::worker(0));

    for i in 0..10u32 {
        let env = timeout(TIMEOUT, hub.recv(Source::Exact(Address::worker(1)), RESULT))
            .await
            .expect("result from b")
            .unwrap();
        assert_eq!(env.message.decode::<u32>().unwrap(), 100 + i);
    }
    for i in 0..10u32 {
        let env = timeout(TIMEOUT, hub.recv(Source::Exact(Address::worker(0)), RESULT))
            .await
            .expect("result from a")
            .unwrap();
        assert_eq!(env.message.decode::<u32>().unwrap(), i);
    }
    assert!(hub.try_recv(Source::Any, RESULT).unwrap().is_none());
    assert!(hub.try_recv(Source::Any, REQUEST).unwrap().is_some());

    a.shutdown().await;
    b.shutdown().await;
    hub.shutdown().await;
}
