//! Integration tests for the pricetag server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pricetag::prelude::*;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// How long to wait for something that should NOT arrive.
const QUIET: Duration = Duration::from_millis(200);

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        guessing_time: 30,
        result_time: 1,
        max_protocol_violations: 3,
        items: Some(vec![Item::new("Mug", "https://placehold.co/400x300?text=Mug", 50.0)]),
        ..ServerConfig::default()
    }
}

/// Starts a server on a random port and returns the address.
async fn start_server(config: ServerConfig) -> String {
    serve(PricetagServer::builder().config(&config)).await
}

async fn serve(builder: PricetagServerBuilder) -> String {
    let server = builder.build().await.expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn connect(addr: &str, query: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?{query}"))
        .await
        .expect("should connect");
    ws
}

async fn join(addr: &str, name: &str, room: &str) -> ClientWs {
    connect(addr, &format!("name={name}&room={room}")).await
}

async fn send_intent(ws: &mut ClientWs, intent: ClientMessage) {
    let json = serde_json::to_string(&IntentFrame::from(intent)).expect("encode");
    ws.send(Message::Text(json.into())).await.expect("send intent");
}

/// Reads frames until the next state update.
async fn next_update(ws: &mut ClientWs) -> Snapshot {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an update")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => {
                let ServerMessage::StateUpdate(snapshot) =
                    serde_json::from_str(text.as_str()).expect("decode update");
                return snapshot;
            }
            Message::Close(frame) => panic!("connection closed: {frame:?}"),
            _ => continue,
        }
    }
}

/// Reads updates until one satisfies `done`. Countdown updates in between
/// are skipped.
async fn wait_until(ws: &mut ClientWs, done: impl Fn(&Snapshot) -> bool) -> Snapshot {
    loop {
        let snapshot = next_update(ws).await;
        if done(&snapshot) {
            return snapshot;
        }
    }
}

async fn wait_for_phase(ws: &mut ClientWs, phase: Phase) -> Snapshot {
    wait_until(ws, |s| s.state == phase).await
}

/// Reads until the server closes the connection; returns the close reason.
async fn expect_close(ws: &mut ClientWs) -> String {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for close");
        match next {
            Some(Ok(Message::Close(Some(frame)))) => {
                assert_eq!(frame.code, CloseCode::Policy);
                return frame.reason.as_str().to_owned();
            }
            Some(Ok(Message::Close(None))) | None | Some(Err(_)) => return String::new(),
            Some(Ok(_)) => continue,
        }
    }
}

async fn assert_quiet(ws: &mut ClientWs) {
    let result = tokio::time::timeout(QUIET, ws.next()).await;
    assert!(result.is_err(), "expected no frame, got {result:?}");
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_receives_state_update() {
    let addr = start_server(test_config()).await;
    let mut alice = join(&addr, "Alice", "ABC123").await;

    let msg = alice.next().await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();

    assert_eq!(json["type"], "STATE_UPDATE");
    let payload = &json["payload"];
    assert_eq!(payload["id"], "ABC123");
    assert_eq!(payload["state"], "WAITING");
    assert_eq!(payload["currentItem"], 0);
    assert_eq!(payload["timeLeft"], 0);
    assert_eq!(payload["items"][0]["imageUrl"], "https://placehold.co/400x300?text=Mug");
    let alice_json = &payload["players"]["Alice"];
    assert_eq!(alice_json["name"], "Alice");
    assert_eq!(alice_json["isHost"], true);
    assert_eq!(alice_json["hasGuessed"], false);
    assert!(alice_json["currentGuess"].is_null());
    assert_eq!(alice_json["score"], 0.0);
}

#[tokio::test]
async fn test_second_player_is_not_host_and_everyone_is_told() {
    let addr = start_server(test_config()).await;
    let mut alice = join(&addr, "Alice", "ABC123").await;
    next_update(&mut alice).await;

    let mut bob = join(&addr, "Bob", "ABC123").await;
    let for_bob = next_update(&mut bob).await;
    let for_alice = next_update(&mut alice).await;

    assert_eq!(for_alice, for_bob);
    assert!(for_bob.players.get("Alice").unwrap().is_host);
    assert!(!for_bob.players.get("Bob").unwrap().is_host);
}

#[tokio::test]
async fn test_query_values_are_percent_decoded() {
    let addr = start_server(test_config()).await;
    let mut ws = join(&addr, "Alice%20Smith", "big+room").await;

    let snapshot = next_update(&mut ws).await;
    assert_eq!(snapshot.id.as_str(), "big room");
    assert!(snapshot.players.get("Alice Smith").is_some());
}

#[tokio::test]
async fn test_missing_name_is_closed_with_reason() {
    let addr = start_server(test_config()).await;
    let mut ws = connect(&addr, "room=ABC123").await;

    let reason = expect_close(&mut ws).await;
    assert!(reason.contains("name"), "reason was {reason:?}");
}

#[tokio::test]
async fn test_duplicate_name_is_refused() {
    let addr = start_server(test_config()).await;
    let mut alice = join(&addr, "Alice", "ABC123").await;
    next_update(&mut alice).await;

    let mut impostor = join(&addr, "Alice", "ABC123").await;
    let reason = expect_close(&mut impostor).await;

    assert!(reason.contains("already taken"), "reason was {reason:?}");
    assert_quiet(&mut alice).await;
}

#[tokio::test]
async fn test_full_room_is_refused() {
    let addr = start_server(ServerConfig {
        max_players: Some(1),
        ..test_config()
    })
    .await;
    let mut alice = join(&addr, "Alice", "ABC123").await;
    next_update(&mut alice).await;

    let mut bob = join(&addr, "Bob", "ABC123").await;
    let reason = expect_close(&mut bob).await;
    assert!(reason.contains("full"), "reason was {reason:?}");
}

#[tokio::test]
async fn test_silent_peer_does_not_block_joins() {
    let addr = start_server(test_config()).await;

    // Opens TCP and never sends the upgrade request.
    let _silent = tokio::net::TcpStream::connect(&addr).await.unwrap();

    let joining = async {
        let mut alice = join(&addr, "Alice", "R").await;
        next_update(&mut alice).await
    };
    let snapshot = tokio::time::timeout(Duration::from_secs(3), joining)
        .await
        .expect("join should not wait on another peer's handshake");
    assert!(snapshot.players.get("Alice").is_some());
}

#[tokio::test]
async fn test_silent_peer_is_dropped_after_handshake_timeout() {
    use tokio::io::AsyncReadExt;

    let addr = serve(
        PricetagServer::builder()
            .config(&test_config())
            .handshake_timeout(Duration::from_millis(300)),
    )
    .await;
    let mut silent = tokio::net::TcpStream::connect(&addr).await.unwrap();

    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(3), silent.read(&mut buf))
        .await
        .expect("server should hang up on the silent peer");
    assert!(matches!(read, Ok(0) | Err(_)), "got {read:?}");
}

// =========================================================================
// Playing
// =========================================================================

#[tokio::test]
async fn test_full_round_over_websocket() {
    let addr = start_server(test_config()).await;
    let mut alice = join(&addr, "Alice", "ABC123").await;
    next_update(&mut alice).await;
    let mut bob = join(&addr, "Bob", "ABC123").await;
    next_update(&mut bob).await;
    next_update(&mut alice).await;

    send_intent(&mut alice, ClientMessage::StartGame).await;
    let started = next_update(&mut bob).await;
    assert_eq!(started.state, Phase::Guessing);
    assert_eq!(started.time_left, 30);

    send_intent(&mut alice, ClientMessage::Guess(40.0)).await;
    let guessed = wait_until(&mut bob, |s| s.players.get("Alice").is_some_and(|p| p.has_guessed)).await;
    let alice_view = guessed.players.get("Alice").unwrap();
    assert!(alice_view.has_guessed);
    assert_eq!(alice_view.current_guess, Some(40.0));

    send_intent(&mut bob, ClientMessage::Guess(60.0)).await;
    let result = wait_for_phase(&mut bob, Phase::RoundResult).await;
    assert_eq!(result.players.get("Alice").unwrap().score, 10.0);
    assert_eq!(result.players.get("Bob").unwrap().score, 10.0);

    let over = wait_for_phase(&mut bob, Phase::GameOver).await;
    assert_eq!(over.time_left, 0);
    assert_eq!(over.current_item, 0);

    send_intent(&mut alice, ClientMessage::ResetGame).await;
    let reset = wait_for_phase(&mut alice, Phase::Waiting).await;
    for player in reset.players.iter() {
        assert_eq!(player.score, 0.0);
        assert!(!player.has_guessed);
        assert_eq!(player.current_guess, None);
    }
}

#[tokio::test]
async fn test_refused_intents_are_not_broadcast() {
    let addr = start_server(test_config()).await;
    let mut alice = join(&addr, "Alice", "ABC123").await;
    next_update(&mut alice).await;
    let mut bob = join(&addr, "Bob", "ABC123").await;
    next_update(&mut bob).await;
    next_update(&mut alice).await;

    // Bob is not the host, and nobody can guess before the game starts.
    send_intent(&mut bob, ClientMessage::StartGame).await;
    send_intent(&mut bob, ClientMessage::Guess(10.0)).await;

    assert_quiet(&mut alice).await;
}

#[tokio::test]
async fn test_repeated_invalid_messages_close_connection() {
    let addr = start_server(test_config()).await;
    let mut ws = join(&addr, "Alice", "ABC123").await;
    next_update(&mut ws).await;

    for _ in 0..3 {
        ws.send(Message::Text(r#"{"type":"DANCE"}"#.into())).await.unwrap();
    }

    let reason = expect_close(&mut ws).await;
    assert_eq!(reason, "too many invalid messages");
}

#[tokio::test]
async fn test_valid_message_resets_violation_count() {
    let addr = start_server(test_config()).await;
    let mut ws = join(&addr, "Alice", "ABC123").await;
    next_update(&mut ws).await;

    for _ in 0..2 {
        ws.send(Message::Text("not json".into())).await.unwrap();
    }
    send_intent(&mut ws, ClientMessage::StartGame).await;
    assert_eq!(next_update(&mut ws).await.state, Phase::Guessing);
    for _ in 0..2 {
        ws.send(Message::Text("not json".into())).await.unwrap();
    }

    // Still connected: the next guess is answered.
    send_intent(&mut ws, ClientMessage::Guess(50.0)).await;
    assert_eq!(wait_for_phase(&mut ws, Phase::RoundResult).await.state, Phase::RoundResult);
}

// =========================================================================
// Leaving
// =========================================================================

#[tokio::test]
async fn test_disconnect_removes_player_and_passes_host() {
    let addr = start_server(test_config()).await;
    let mut alice = join(&addr, "Alice", "ABC123").await;
    next_update(&mut alice).await;
    let mut bob = join(&addr, "Bob", "ABC123").await;
    next_update(&mut bob).await;

    alice.close(None).await.unwrap();
    drop(alice);

    let snapshot = next_update(&mut bob).await;
    assert!(snapshot.players.get("Alice").is_none());
    assert!(snapshot.players.get("Bob").unwrap().is_host);
}

#[tokio::test]
async fn test_name_is_free_again_after_disconnect() {
    let addr = start_server(test_config()).await;
    let mut bob = join(&addr, "Bob", "ABC123").await;
    next_update(&mut bob).await;
    let mut alice = join(&addr, "Alice", "ABC123").await;
    next_update(&mut alice).await;
    next_update(&mut bob).await;

    alice.close(None).await.unwrap();
    drop(alice);
    next_update(&mut bob).await;

    let mut alice_again = join(&addr, "Alice", "ABC123").await;
    let snapshot = next_update(&mut alice_again).await;
    assert_eq!(snapshot.players.len(), 2);
    assert!(!snapshot.players.get("Alice").unwrap().is_host);
}

#[tokio::test]
async fn test_graceful_shutdown_closes_players() {
    let server = PricetagServer::builder()
        .config(&test_config())
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    let mut alice = join(&addr, "Alice", "ABC123").await;
    next_update(&mut alice).await;

    stop_tx.send(()).unwrap();
    running.await.unwrap().unwrap();

    assert_eq!(expect_close(&mut alice).await, "server shutting down");
}
