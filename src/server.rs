//! WebSocket transport for the signaling relay.
//!
//! One task per accepted connection reads text frames in arrival order and
//! feeds them to the router; a writer task drains the connection's outbox so
//! the router can reply without touching the socket. Router calls are
//! synchronous and never await, keeping registry mutation a single step.

use std::env;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::negotiate::RtcNegotiator;
use crate::registry::SignalSink;
use crate::signaling::SignalingServer;
use crate::util::{init_log, select_host_address};

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

type SharedServer = Arc<Mutex<SignalingServer<RtcNegotiator>>>;

/// Send handle backed by the connection's outbox channel. The writer task
/// owns the socket half; dropping the last sender ends it.
struct WsSink {
    outbox: UnboundedSender<Message>,
}

impl SignalSink for WsSink {
    fn send(&self, frame: String) -> Result<()> {
        self.outbox
            .send(Message::Text(frame))
            .map_err(|_| anyhow!("connection writer gone"))
    }
}

#[tokio::main]
pub async fn main() -> Result<()> {
    init_log();

    let host = select_host_address();
    let negotiator = RtcNegotiator::new(host)?;
    let server: SharedServer = Arc::new(Mutex::new(SignalingServer::new(negotiator)));

    let addr = env::var("SIGNALING_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("Signaling relay listening on ws://{}", listener.local_addr()?);

    loop {
        let (stream, remote) = listener.accept().await?;
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, server).await {
                debug!("connection from {} ended: {}", remote, e);
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, server: SharedServer) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut writer, mut reader) = ws.split();

    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<Message>();
    tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            if let Err(e) = writer.send(message).await {
                warn!("websocket send failed: {}", e);
                break;
            }
        }
    });

    let sink = Arc::new(WsSink { outbox });
    let id = server.lock().unwrap().on_accept(sink);

    while let Some(message) = reader.next().await {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                debug!("client {} read error: {}", id, e);
                break;
            }
        };
        match message {
            Message::Text(text) => server.lock().unwrap().on_message(id, &text),
            Message::Close(_) => break,
            // Binary and control frames are not part of the protocol.
            _ => {}
        }
    }

    server.lock().unwrap().on_close(id);
    Ok(())
}
