//! WebRTC peer client.
//!
//! Connects to the signaling relay over WebSocket, performs one offer/answer
//! exchange, then drives the str0m state machine over UDP: transmit what it
//! asks, feed it incoming packets, push time forward on timeouts. A small
//! data channel is opened so the negotiated connection can be observed.

use std::io::ErrorKind;
use std::net::UdpSocket;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use str0m::change::SdpAnswer;
use str0m::net::{Protocol, Receive};
use str0m::{Event, IceConnectionState, Input, Output, Rtc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::model::message::{SessionDescription, SignalMessage};
use crate::util::{get_candidates, init_log};

const SIGNALING_SERVER_URL: &str = "ws://127.0.0.1:8080";
const CHANNEL: &str = "probe";

#[tokio::main]
pub async fn main() -> Result<()> {
    init_log();

    let mut rtc = Rtc::new();

    let socket = UdpSocket::bind("0.0.0.0:0").context("binding a UDP port")?;
    info!("UDP socket bound to: {}", socket.local_addr()?);
    for candidate in get_candidates(&socket) {
        rtc.add_local_candidate(candidate)
            .context("adding a local candidate")?;
    }

    let url = std::env::var("SIGNALING_URL").unwrap_or_else(|_| SIGNALING_SERVER_URL.to_string());
    let (ws, _) = connect_async(url.as_str())
        .await
        .context("connecting to the signaling server")?;
    let (mut ws_sender, mut ws_receiver) = ws.split();
    info!("Connected to signaling server at {}", url);

    let mut change = rtc.sdp_api();
    let cid = change.add_channel(CHANNEL.to_string());
    let (offer, pending) = change
        .apply()
        .ok_or_else(|| anyhow!("no SDP change to apply"))?;

    let frame = SignalMessage::Offer {
        offer: SessionDescription::offer(offer.to_sdp_string()),
    };
    ws_sender
        .send(Message::Text(serde_json::to_string(&frame)?))
        .await?;
    info!("Sent offer");

    // The relay answers the offer itself; wait for the answer frame, skipping
    // the initial connected greeting.
    let answer = loop {
        let Some(message) = ws_receiver.next().await else {
            bail!("signaling server closed before answering");
        };
        let Ok(text) = message?.into_text() else {
            continue;
        };
        match serde_json::from_str::<SignalMessage>(&text) {
            Ok(SignalMessage::Connected { id }) => info!("Registered with id {}", id),
            Ok(SignalMessage::Answer { answer }) => break answer,
            Ok(SignalMessage::Error { error }) => bail!("signaling error: {}", error),
            Ok(other) => warn!("unexpected signaling frame: {:?}", other),
            Err(e) => warn!("unparseable signaling frame: {}", e),
        }
    };

    let answer = SdpAnswer::from_sdp_string(&answer.sdp).context("parsing the answer SDP")?;
    rtc.sdp_api().accept_answer(pending, answer)?;
    info!("Answer accepted, waiting for ICE connection...");

    // Signaling is done; the rest is ICE and the data channel over UDP.
    drop(ws_sender);
    drop(ws_receiver);

    let mut buf = vec![0; 2000];
    loop {
        let timeout = match rtc.poll_output()? {
            Output::Timeout(instant) => instant,
            Output::Transmit(transmit) => {
                socket.send_to(&transmit.contents, transmit.destination)?;
                continue;
            }
            Output::Event(event) => {
                match event {
                    Event::IceConnectionStateChange(state) => {
                        info!("ICE connection state: {:?}", state);
                        if state == IceConnectionState::Disconnected {
                            info!("Disconnected, shutting down");
                            break;
                        }
                    }
                    Event::ChannelOpen(channel_id, name) => {
                        info!("Channel '{}' open", name);
                        if channel_id == cid {
                            let mut channel = rtc
                                .channel(channel_id)
                                .ok_or_else(|| anyhow!("opened channel not found"))?;
                            channel.write(true, b"hello from peer")?;
                        }
                    }
                    Event::ChannelData(data) => {
                        info!("Channel data: {}", String::from_utf8_lossy(&data.data));
                    }
                    _ => {}
                }
                continue;
            }
        };

        let duration = timeout.saturating_duration_since(Instant::now());
        if duration.is_zero() {
            rtc.handle_input(Input::Timeout(Instant::now()))?;
            continue;
        }
        socket.set_read_timeout(Some(duration))?;

        // Scale the buffer back up to fit an entire UDP packet.
        buf.resize(2000, 0);

        let input = match socket.recv_from(&mut buf) {
            Ok((n, source)) => {
                buf.truncate(n);
                Input::Receive(
                    Instant::now(),
                    Receive {
                        proto: Protocol::Udp,
                        source,
                        destination: socket.local_addr()?,
                        contents: buf.as_slice().try_into().unwrap(),
                    },
                )
            }

            Err(e) => match e.kind() {
                // Expected error for set_read_timeout(). One for windows,
                // one for the rest.
                ErrorKind::WouldBlock | ErrorKind::TimedOut => Input::Timeout(Instant::now()),
                _ => return Err(e.into()),
            },
        };

        rtc.handle_input(input)?;
    }

    Ok(())
}
