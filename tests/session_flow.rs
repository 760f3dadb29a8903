mod support;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect() -> WsStream {
    let url = support::ensure_server();
    let (stream, _response) = tokio_tungstenite::connect_async(url)
        .await
        .expect("websocket connect");
    stream
}

async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("websocket send");
}

// Read messages until one matches the wanted type and predicate. The test
// server is shared across integration tests, so unrelated broadcasts from
// other tests' players must be skipped, not treated as failures.
async fn recv_where(
    ws: &mut WsStream,
    wanted: &str,
    pred: impl Fn(&Value) -> bool,
) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let msg = ws
                .next()
                .await
                .expect("stream should stay open")
                .expect("websocket read");
            if let Message::Text(txt) = msg {
                let value: Value = serde_json::from_str(txt.as_str()).expect("server json");
                if value["type"] == wanted && pred(&value["data"]) {
                    return value;
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
}

async fn recv_type(ws: &mut WsStream, wanted: &str) -> Value {
    recv_where(ws, wanted, |_| true).await
}

// Join and return the stream plus the server-assigned id.
async fn join(name: &str) -> (WsStream, String) {
    let mut ws = connect().await;
    send_json(
        &mut ws,
        json!({"type": "newPlayer", "data": {"name": name, "avatar": "gremlin1.png"}}),
    )
    .await;
    let data = recv_where(&mut ws, "playerData", |d| d["name"] == name).await;
    let id = data["data"]["id"].as_str().expect("string id").to_string();
    (ws, id)
}

#[tokio::test]
async fn join_handshake_returns_identity_roster_and_pickups() {
    let mut ws = connect().await;
    send_json(
        &mut ws,
        json!({"type": "newPlayer", "data": {"name": "Ada", "avatar": "fox.png"}}),
    )
    .await;

    let player = recv_where(&mut ws, "playerData", |d| d["name"] == "Ada").await;
    let data = &player["data"];
    assert_eq!(data["health"], 100);
    assert_eq!(data["maxHealth"], 100);
    assert_eq!(data["weapon"], "Fists");
    assert_eq!(data["weaponDamage"], 10);
    assert_eq!(data["isDead"], false);
    assert_eq!(data["bitcoins"], 0);
    let x = data["x"].as_f64().expect("x");
    let y = data["y"].as_f64().expect("y");
    assert!((0.0..=1024.0).contains(&x));
    assert!((0.0..=600.0).contains(&y));
    let own_id = data["id"].as_str().expect("id").to_string();

    // Roster and pickup pool follow, addressed to the joining client only.
    let roster = recv_type(&mut ws, "currentPlayers").await;
    assert!(roster["data"].get(&own_id).is_some());

    let pickups = recv_type(&mut ws, "currentWeapons").await;
    assert!(pickups["data"].is_array());
}

#[tokio::test]
async fn peers_observe_join_move_chat_and_leave() {
    let (mut alice, _alice_id) = join("alice").await;
    let (mut bob, bob_id) = join("bob").await;

    // Alice sees bob's join notice (but bob does not get one for himself).
    let joined = recv_where(&mut alice, "playerJoined", |d| d["id"] == bob_id.as_str()).await;
    assert_eq!(joined["data"]["player"]["name"], "bob");

    // Movement is broadcast to everyone including the mover.
    send_json(&mut bob, json!({"type": "move", "data": "right"})).await;
    let moved = recv_where(&mut alice, "playerMoved", |d| d["id"] == bob_id.as_str()).await;
    assert!(moved["data"]["x"].is_number());
    recv_where(&mut bob, "playerMoved", |d| d["id"] == bob_id.as_str()).await;

    // Chat echoes to the sender as well.
    send_json(&mut bob, json!({"type": "chatMessage", "data": "hello room"})).await;
    let chat = recv_where(&mut alice, "chatMessage", |d| d["message"] == "hello room").await;
    assert_eq!(chat["data"]["name"], "bob");
    recv_where(&mut bob, "chatMessage", |d| d["message"] == "hello room").await;

    // Closing bob's socket produces exactly one left notice for the others.
    bob.close(None).await.expect("close");
    recv_where(&mut alice, "playerLeft", |d| d == &Value::from(bob_id.clone())).await;
}

#[tokio::test]
async fn invalid_and_self_targeted_events_leave_the_session_intact() {
    let (mut ws, id) = join("mallory").await;

    // Garbage JSON and a self-attack are both swallowed server-side.
    ws.send(Message::text("not json at all"))
        .await
        .expect("send garbage");
    send_json(&mut ws, json!({"type": "attack", "data": id})).await;

    // The connection still works and state is unchanged.
    send_json(&mut ws, json!({"type": "chatMessage", "data": "still here"})).await;
    let chat = recv_where(&mut ws, "chatMessage", |d| d["message"] == "still here").await;
    assert_eq!(chat["data"]["id"], id);
}

#[tokio::test]
async fn flood_of_well_formed_but_invalid_events_closes_the_connection() {
    let (mut ws, _id) = join("flooder").await;

    // Parsable JSON with unusable ids counts against the same budget as
    // malformed JSON; past the limit the server must hang up.
    for _ in 0..50 {
        send_json(&mut ws, json!({"type": "attack", "data": "not-a-number"})).await;
    }

    let outcome = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    })
    .await;
    assert!(outcome.is_ok(), "expected the server to close the socket");
}

#[tokio::test]
async fn first_message_must_be_the_join_handshake() {
    let mut ws = connect().await;
    send_json(&mut ws, json!({"type": "move", "data": "up"})).await;

    // The server closes the connection instead of creating a player.
    let outcome = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    })
    .await;
    assert!(outcome.is_ok(), "expected the server to close the socket");
}
