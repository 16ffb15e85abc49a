use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use biliopen_api::{AnchorInfo, ApiError, SessionBootstrap, SessionInfo};
use biliopen_frame::{decode_frame, Frame, Operation};
use biliopen_live::{channel, Client, ClientError, LiveError, LiveEvent, SessionOptions};
use biliopen_transport::{MemoryDialer, MemoryPeer, PeerMessage, TransportError};
use tokio::sync::mpsc;

const ENDPOINT: &str = "wss://example.invalid/sub";

#[derive(Default)]
struct Calls {
    starts: AtomicUsize,
    ends: AtomicUsize,
    heartbeats: AtomicUsize,
}

#[derive(Default)]
struct FakeBootstrap {
    fail_start: bool,
    fail_end: bool,
    no_endpoint: bool,
    calls: Arc<Calls>,
}

impl FakeBootstrap {
    fn session(&self) -> SessionInfo {
        SessionInfo {
            game_id: "game-1".to_string(),
            auth_body: r#"{"key":"v"}"#.to_string(),
            wss_links: if self.no_endpoint {
                Vec::new()
            } else {
                vec![ENDPOINT.to_string(), "wss://backup.invalid/sub".to_string()]
            },
            anchor: AnchorInfo {
                room_id: 100,
                uname: "host".to_string(),
                uface: String::new(),
                uid: 7,
            },
        }
    }
}

impl SessionBootstrap for FakeBootstrap {
    async fn start(&self, code: &str) -> biliopen_api::Result<SessionInfo> {
        assert_eq!(code, "live-code");
        self.calls.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(ApiError::Status(500));
        }
        Ok(self.session())
    }

    async fn end(&self, _session: &SessionInfo) -> biliopen_api::Result<()> {
        self.calls.ends.fetch_add(1, Ordering::SeqCst);
        if self.fail_end {
            return Err(ApiError::Status(502));
        }
        Ok(())
    }

    async fn heartbeat(&self, _session: &SessionInfo) -> biliopen_api::Result<()> {
        self.calls.heartbeats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    client: Client<FakeBootstrap, MemoryDialer>,
    calls: Arc<Calls>,
    peers: mpsc::UnboundedReceiver<(String, MemoryPeer)>,
    events: mpsc::Receiver<LiveEvent>,
    closes: mpsc::UnboundedReceiver<LiveError>,
}

fn harness(bootstrap: FakeBootstrap, options: SessionOptions) -> Harness {
    let calls = bootstrap.calls.clone();
    let (dialer, peers) = MemoryDialer::new();
    let (handler, events) = channel(16);
    let (tx, closes) = mpsc::unbounded_channel();
    let client = Client::with_bootstrap(bootstrap, dialer, handler, options)
        .with_close_handler(move |err| {
            let _ = tx.send(err);
        });
    Harness {
        client,
        calls,
        peers,
        events,
        closes,
    }
}

fn no_keepalive() -> SessionOptions {
    SessionOptions {
        app_heartbeat_interval: None,
        ..SessionOptions::default()
    }
}

async fn expect_auth(peer: &mut MemoryPeer) {
    match peer.recv().await {
        Some(PeerMessage::Binary(data)) => {
            let frame = decode_frame(&data).expect("client frames decode");
            assert_eq!(frame.operation, Operation::Auth);
            assert_eq!(frame.body.as_ref(), br#"{"key":"v"}"#);
        }
        other => panic!("expected AUTH, got {other:?}"),
    }
}

fn auth_ack() -> bytes::Bytes {
    Frame::new(Operation::AuthAck, 1, &br#"{"code":0}"#[..]).to_bytes()
}

impl Harness {
    async fn connect_active(&mut self) -> MemoryPeer {
        self.client.connect("live-code").await.expect("connect");
        let (url, mut peer) = self.peers.recv().await.expect("dialed");
        assert_eq!(url, ENDPOINT);
        expect_auth(&mut peer).await;
        peer.send(auth_ack());
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.client.is_active() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("client should become active");
        peer
    }
}

#[tokio::test]
async fn connect_activates_and_forwards_events() {
    let mut h = harness(FakeBootstrap::default(), no_keepalive());
    assert!(!h.client.is_active());

    let peer = h.connect_active().await;
    let session = h.client.session().await.expect("session owned");
    assert_eq!(session.anchor.room_id, 100);
    assert_eq!(session.game_id, "game-1");

    peer.send(
        Frame::new(
            Operation::MessageAck,
            2,
            &br#"{"cmd":"LIVE_OPEN_PLATFORM_DM","data":{"uid":123,"uname":"alice","msg":"hello"}}"#[..],
        )
        .to_bytes(),
    );
    match h.events.recv().await {
        Some(LiveEvent::Danmaku(dm)) => {
            assert_eq!((dm.uid, dm.uname.as_str(), dm.msg.as_str()), (123, "alice", "hello"));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    h.client.disconnect().await;
}

#[tokio::test]
async fn connect_while_owning_session_is_rejected() {
    let mut h = harness(FakeBootstrap::default(), no_keepalive());
    let _peer = h.connect_active().await;

    let err = h.client.connect("live-code").await.unwrap_err();
    assert!(matches!(err, ClientError::NotIdle));
    assert_eq!(h.calls.starts.load(Ordering::SeqCst), 1);
    assert!(h.client.is_active());

    h.client.disconnect().await;
}

#[tokio::test]
async fn bootstrap_failure_is_reported() {
    let h = harness(
        FakeBootstrap {
            fail_start: true,
            ..FakeBootstrap::default()
        },
        no_keepalive(),
    );

    let err = h.client.connect("live-code").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::SessionBootstrapFailed(ApiError::Status(500))
    ));
    assert!(!h.client.is_active());
    assert!(h.client.session().await.is_none());
    assert_eq!(h.calls.ends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn session_without_endpoint_is_ended() {
    let h = harness(
        FakeBootstrap {
            no_endpoint: true,
            ..FakeBootstrap::default()
        },
        no_keepalive(),
    );

    let err = h.client.connect("live-code").await.unwrap_err();
    assert!(matches!(err, ClientError::NoEndpoint));
    assert_eq!(h.calls.ends.load(Ordering::SeqCst), 1);
    assert!(h.client.session().await.is_none());
}

#[tokio::test]
async fn failed_dial_ends_session() {
    let bootstrap = FakeBootstrap::default();
    let calls = bootstrap.calls.clone();
    let (handler, _events) = channel(1);
    let client = Client::with_bootstrap(
        bootstrap,
        MemoryDialer::refusing(),
        handler,
        no_keepalive(),
    );

    let err = client.connect("live-code").await.unwrap_err();
    match err {
        ClientError::ConnectFailed(LiveError::Transport(TransportError::Io(_))) => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.ends.load(Ordering::SeqCst), 1);
    assert!(client.session().await.is_none());
    assert!(!client.is_active());
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let mut h = harness(FakeBootstrap::default(), no_keepalive());
    let mut peer = h.connect_active().await;

    h.client.disconnect().await;
    h.client.disconnect().await;

    assert!(!h.client.is_active());
    assert!(h.client.session().await.is_none());
    assert_eq!(h.calls.ends.load(Ordering::SeqCst), 1);
    assert!(h.closes.try_recv().is_err());

    loop {
        match peer.recv().await {
            Some(PeerMessage::Close { code, .. }) => {
                assert_eq!(code, 1000);
                break;
            }
            Some(PeerMessage::Binary(_)) => continue,
            None => panic!("peer should observe a close"),
        }
    }
}

#[tokio::test]
async fn disconnect_swallows_end_failure() {
    let mut h = harness(
        FakeBootstrap {
            fail_end: true,
            ..FakeBootstrap::default()
        },
        no_keepalive(),
    );
    let _peer = h.connect_active().await;

    h.client.disconnect().await;

    assert_eq!(h.calls.ends.load(Ordering::SeqCst), 1);
    assert!(h.client.session().await.is_none());
}

#[tokio::test]
async fn transport_close_ends_session_and_notifies() {
    let mut h = harness(FakeBootstrap::default(), no_keepalive());
    let peer = h.connect_active().await;

    peer.close(1001, "going away");

    let err = tokio::time::timeout(Duration::from_secs(5), h.closes.recv())
        .await
        .expect("close notification")
        .expect("close handler registered");
    match err {
        LiveError::Transport(TransportError::Closed { code, .. }) => assert_eq!(code, Some(1001)),
        other => panic!("unexpected close reason: {other}"),
    }
    assert_eq!(h.calls.ends.load(Ordering::SeqCst), 1);
    assert!(h.client.session().await.is_none());
    assert!(!h.client.is_active());

    // The facade is idle again and can start a new session.
    let _peer = h.connect_active().await;
    assert_eq!(h.calls.starts.load(Ordering::SeqCst), 2);
    h.client.disconnect().await;
    assert_eq!(h.calls.ends.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn project_heartbeat_runs_while_connected() {
    let mut h = harness(
        FakeBootstrap::default(),
        SessionOptions {
            app_heartbeat_interval: Some(Duration::from_secs(20)),
            ..SessionOptions::default()
        },
    );
    let _peer = h.connect_active().await;

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert_eq!(h.calls.heartbeats.load(Ordering::SeqCst), 2);

    h.client.disconnect().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.calls.heartbeats.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_client_stops_project_heartbeat() {
    let mut h = harness(
        FakeBootstrap::default(),
        SessionOptions {
            app_heartbeat_interval: Some(Duration::from_secs(20)),
            ..SessionOptions::default()
        },
    );
    let _peer = h.connect_active().await;

    let Harness { client, calls, .. } = h;
    drop(client);
    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(calls.heartbeats.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_app_heartbeat_interval_is_rejected() {
    let h = harness(
        FakeBootstrap::default(),
        SessionOptions {
            app_heartbeat_interval: Some(Duration::ZERO),
            ..SessionOptions::default()
        },
    );

    let err = h.client.connect("live-code").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::InvalidOptions(LiveError::InvalidInterval { .. })
    ));
    assert_eq!(h.calls.starts.load(Ordering::SeqCst), 0);
    assert!(!h.client.is_active());
}
