//! Integration: start the relay on a free port, then drive the full path —
//! health probe, the raw service endpoints, and the client core end to end.
//! Relay tasks are left running when the tests end.

use async_trait::async_trait;
use lib::addr::ChatAddress;
use lib::client::{HttpTransport, MessageHandler, Receiver, SendOutcome, Sender, Transport};
use lib::config::Config;
use lib::wire::ChatMessage;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Spawn a relay with the given hold timeout; returns (base URL, port) once
/// it answers the health probe.
async fn start_relay(hold_ms: u64) -> (String, u16) {
    let port = free_port();
    let mut config = Config::default();
    config.relay.port = port;
    config.relay.bind = "127.0.0.1".to_string();
    config.relay.hold_ms = hold_ms;

    tokio::spawn(async move {
        let _ = lib::relay::run_relay(config).await;
    });

    let url = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return (url, port);
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("relay did not come up at {} within 5s", url);
}

#[derive(Default)]
struct CollectingHandler {
    seen: Mutex<Vec<ChatMessage>>,
}

impl CollectingHandler {
    fn msgs(&self) -> Vec<ChatMessage> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageHandler for CollectingHandler {
    async fn on_message(&self, msg: ChatMessage) {
        self.seen.lock().unwrap().push(msg);
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool, what: &str) {
    for _ in 0..300 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

#[tokio::test]
async fn relay_health_responds_with_running() {
    let (url, port) = start_relay(1_000).await;
    let json: serde_json::Value = reqwest::get(&url)
        .await
        .expect("GET /")
        .json()
        .await
        .expect("parse JSON");
    assert_eq!(json.get("runtime").and_then(|v| v.as_str()), Some("running"));
    assert_eq!(json.get("protocol").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(json.get("port").and_then(|v| v.as_u64()), Some(port as u64));
}

#[tokio::test]
async fn send_then_longpoll_delivers_in_order() {
    let (url, _) = start_relay(5_000).await;
    let client = reqwest::Client::new();
    let poll_url = format!("{}/service/room1/receiveMessages/alice", url);

    for (round, text) in [("first round", "A"), ("second round", "B")] {
        let poll = tokio::spawn({
            let client = client.clone();
            let poll_url = poll_url.clone();
            async move {
                client
                    .get(&poll_url)
                    .send()
                    .await
                    .expect("poll request")
                    .text()
                    .await
                    .expect("poll body")
            }
        });
        // Let the poller park before publishing.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let res = client
            .post(format!("{}/service/room1/addMessage/bob", url))
            .header("content-type", "text/plain")
            .body(text)
            .send()
            .await
            .expect("POST addMessage");
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.text().await.expect("POST body"), "OK");

        let body = poll.await.expect("join poll");
        let msgs = lib::wire::decode_body("room1", &body);
        assert_eq!(msgs.len(), 1, "{}", round);
        assert_eq!(msgs[0].user, "bob", "{}", round);
        assert_eq!(msgs[0].text, text, "{}", round);
    }
}

#[tokio::test]
async fn message_without_parked_poller_is_dropped() {
    let (url, _) = start_relay(300).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/service/quiet/addMessage/bob", url))
        .body("lost")
        .send()
        .await
        .expect("POST addMessage");
    assert_eq!(res.status().as_u16(), 200);

    // The next poll finds nothing: the relay stores no messages.
    let body = client
        .get(format!("{}/service/quiet/receiveMessages/alice", url))
        .send()
        .await
        .expect("poll request")
        .text()
        .await
        .expect("poll body");
    assert!(lib::wire::decode_body("quiet", &body).is_empty());
}

#[tokio::test]
async fn client_core_roundtrip() {
    let (url, _) = start_relay(10_000).await;

    let poll_transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&url, None).expect("poll transport"));
    let handler = Arc::new(CollectingHandler::default());
    let dyn_handler: Arc<dyn MessageHandler> = handler.clone();
    let receiver = Arc::new(Receiver::new(
        ChatAddress::new("lobby", "alice").expect("address"),
        poll_transport,
    ));
    let task = receiver.clone().start(dyn_handler).expect("first start");
    // Let the first poll park on the relay.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let send_transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&url, None).expect("send transport"));
    let sender = Sender::new(
        ChatAddress::new("lobby", "bob").expect("address"),
        send_transport,
    );

    assert_eq!(sender.send("first").await.expect("send"), SendOutcome::Sent);
    wait_until(|| handler.msgs().len() >= 1, "first message").await;
    // Give the receiver time to park its next poll before the second send.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sender.send("second").await.expect("send"), SendOutcome::Sent);
    wait_until(|| handler.msgs().len() >= 2, "second message").await;

    let msgs = handler.msgs();
    assert_eq!(msgs[0].render(), "[bob] first");
    assert_eq!(msgs[1].render(), "[bob] second");
    assert!(msgs.iter().all(|m| m.channel == "lobby"));

    receiver.stop();
    task.abort();
}
