//! End-to-end tests over real WebSocket connections.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chat_relay::protocol::decode;
use chat_relay::{FrameKind, Message, RelayServer, ServerConfig};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

// ============================================================================
// Helpers
// ============================================================================

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> Result<Arc<RelayServer>> {
    let config = ServerConfig::new()
        .with_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_port(0);
    Ok(RelayServer::start(config).await?)
}

async fn connect(server: &RelayServer) -> Result<Client> {
    let (client, _response) = connect_async(server.ws_url()).await?;
    Ok(client)
}

async fn next_message(client: &mut Client) -> Result<Message> {
    loop {
        let frame = timeout(RECV_TIMEOUT, client.next())
            .await
            .context("timed out waiting for message")?
            .context("stream ended")??;

        match frame {
            WsMessage::Text(text) => return Ok(decode(text.as_str())?),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => bail!("unexpected frame: {other:?}"),
        }
    }
}

/// Reads the welcome notice and returns the assigned id.
async fn welcome_id(client: &mut Client, total: usize) -> Result<String> {
    let message = next_message(client).await?;
    let body = message.body();
    let suffix = format!(". Total user: {total}");
    let id = body
        .strip_prefix("Welcome User ")
        .and_then(|rest| rest.strip_suffix(&suffix))
        .with_context(|| format!("not a welcome notice: {body}"))?;
    Ok(id.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_join_chat_leave() -> Result<()> {
    let server = start_server().await?;

    let mut first = connect(&server).await?;
    let first_id = welcome_id(&mut first, 1).await?;

    let mut second = connect(&server).await?;
    let second_id = welcome_id(&mut second, 2).await?;
    assert_ne!(first_id, second_id);

    let joined = next_message(&mut first).await?;
    assert_eq!(
        joined,
        Message::text(format!("User {second_id} joined. Total user: 2"))
    );

    first.send(WsMessage::text("hi")).await?;
    let expected = Message::new(FrameKind::Text, format!("User {first_id} says hi"));
    assert_eq!(next_message(&mut first).await?, expected);
    assert_eq!(next_message(&mut second).await?, expected);

    first.close(None).await?;
    assert_eq!(
        next_message(&mut second).await?,
        Message::text(format!("User {first_id} left. Total user: 1"))
    );

    server.pool().wait_for_members(1).await?;
    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_binary_frame_is_relayed_with_its_kind() -> Result<()> {
    let server = start_server().await?;

    let mut client = connect(&server).await?;
    let id = welcome_id(&mut client, 1).await?;

    client.send(WsMessage::binary(b"bytes".to_vec())).await?;
    let relayed = next_message(&mut client).await?;
    assert_eq!(relayed.kind(), FrameKind::Binary);
    assert_eq!(relayed.body(), format!("User {id} says bytes"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_wrong_path_is_rejected() -> Result<()> {
    let server = start_server().await?;
    let url = format!("ws://{}/elsewhere", server.local_addr());

    assert!(connect_async(url).await.is_err());
    assert_eq!(server.pool().member_count(), 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_dropped_client_is_announced() -> Result<()> {
    let server = start_server().await?;

    let mut stays = connect(&server).await?;
    welcome_id(&mut stays, 1).await?;

    let mut leaves = connect(&server).await?;
    let leaves_id = welcome_id(&mut leaves, 2).await?;
    next_message(&mut stays).await?;

    // No close handshake, just the socket going away
    drop(leaves);

    assert_eq!(
        next_message(&mut stays).await?,
        Message::text(format!("User {leaves_id} left. Total user: 1"))
    );

    server.shutdown().await;
    Ok(())
}
