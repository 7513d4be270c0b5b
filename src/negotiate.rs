//! SDP negotiation seam.
//!
//! The router only knows [`Negotiator`]; production wires in the str0m-backed
//! [`RtcNegotiator`], tests substitute deterministic fakes.

use std::net::{IpAddr, SocketAddr, UdpSocket};

use anyhow::{Context, Result};
use str0m::change::SdpOffer;
use str0m::{Candidate, Rtc};
use tracing::info;

use crate::model::message::SessionDescription;

/// Platform peer-connection capability: set the remote description from an
/// offer, create an answer, set it locally, and hand the answer back.
pub trait Negotiator: Send {
    fn answer(&mut self, offer: &SessionDescription) -> Result<SessionDescription>;
}

/// str0m-backed negotiator.
///
/// One UDP port is bound up front and advertised as the host candidate in
/// every generated answer; actual media flow is out of scope here.
pub struct RtcNegotiator {
    local_addr: SocketAddr,
    _socket: UdpSocket,
}

impl RtcNegotiator {
    pub fn new(host: IpAddr) -> Result<RtcNegotiator> {
        let socket =
            UdpSocket::bind(SocketAddr::new(host, 0)).context("binding a random UDP port")?;
        let local_addr = socket.local_addr().context("reading the local address")?;
        info!("Bound UDP port: {}", local_addr);
        Ok(RtcNegotiator {
            local_addr,
            _socket: socket,
        })
    }
}

impl Negotiator for RtcNegotiator {
    fn answer(&mut self, offer: &SessionDescription) -> Result<SessionDescription> {
        let offer = SdpOffer::from_sdp_string(&offer.sdp).context("parsing the remote offer")?;

        let mut rtc = Rtc::builder().build();
        let candidate = Candidate::host(self.local_addr, "udp").context("building a host candidate")?;
        rtc.add_local_candidate(candidate)
            .context("adding the local candidate")?;

        let answer = rtc
            .sdp_api()
            .accept_offer(offer)
            .context("accepting the remote offer")?;

        Ok(SessionDescription::answer(answer.to_sdp_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn channel_offer() -> SessionDescription {
        let mut rtc = Rtc::builder().build();
        let host = Candidate::host(
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4400),
            "udp",
        )
        .unwrap();
        rtc.add_local_candidate(host).unwrap();

        let mut change = rtc.sdp_api();
        change.add_channel("probe".to_string());
        let (offer, _pending) = change.apply().unwrap();
        SessionDescription::offer(offer.to_sdp_string())
    }

    #[test]
    fn answers_a_data_channel_offer() {
        let mut negotiator = RtcNegotiator::new(IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap();
        let answer = negotiator.answer(&channel_offer()).unwrap();
        assert_eq!(answer.kind, "answer");
        assert!(answer.sdp.starts_with("v=0"));
    }

    #[test]
    fn rejects_an_unparseable_offer() {
        let mut negotiator = RtcNegotiator::new(IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap();
        let offer = SessionDescription::offer("v=0 but nothing else of note");
        assert!(negotiator.answer(&offer).is_err());
    }
}
