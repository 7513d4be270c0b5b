use local_ip_address::list_afinet_netifas;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use str0m::Candidate;
use systemstat::{Platform, System};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_log() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Pick an IPv4 address that can be shared with a remote ICE peer.
///
/// Iterates over all network interfaces provided by `systemstat`, skipping any
/// loopback, link-local or broadcast addresses, and returns the first routable
/// one.
///
/// ## Panics
///
/// Panics if the host exposes no usable IPv4 address. Acceptable for the CLI
/// binaries here; embedders wanting graceful degradation should pick their own
/// address instead of calling this helper.
pub fn select_host_address() -> IpAddr {
    let system = System::new();
    let networks = system.networks().unwrap();

    for net in networks.values() {
        for n in &net.addrs {
            if let systemstat::IpAddr::V4(v) = n.addr {
                if !v.is_loopback() && !v.is_link_local() && !v.is_broadcast() {
                    return IpAddr::V4(v);
                }
            }
        }
    }

    panic!("Found no usable network interface");
}

/// Host ICE candidates for every usable IPv4 interface, on the port the given
/// socket is bound to.
pub fn get_candidates(socket: &UdpSocket) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = vec![];
    if let Ok(network_interfaces) = list_afinet_netifas() {
        for (name, ip) in network_interfaces {
            debug!("iface: {} / {:?}", name, ip);
            match ip {
                IpAddr::V4(ip4) => {
                    if !ip4.is_loopback() && !ip4.is_link_local() {
                        let socket_addr = SocketAddr::new(ip, socket.local_addr().unwrap().port());
                        candidates.push(
                            Candidate::host(socket_addr, str0m::net::Protocol::Udp)
                                .expect("Failed to create local candidate"),
                        );
                    }
                }
                IpAddr::V6(_ip6) => {}
            }
        }
    }

    candidates
}
