use std::{io::ErrorKind, net::SocketAddr, sync::Arc};

use tokio::net::UdpSocket;

use codec::packet::MAX_PACKET_SIZE;
use service::{
    Service, SocketRole,
    routing::{RouteResult, Router},
};

use crate::{
    config::Config,
    statistics::{Statistics, Stats},
};

/// Bind the authentication and accounting sockets and spawn one
/// processing loop for each.
pub async fn start(config: &Config, statistics: &Statistics, service: &Service) -> anyhow::Result<()> {
    let auth = UdpSocket::bind(SocketAddr::new(config.server.bind, config.server.auth_port)).await?;
    let acct = UdpSocket::bind(SocketAddr::new(config.server.bind, config.server.acct_port)).await?;

    tokio::spawn(process_socket(
        Arc::new(auth),
        service.get_router(),
        SocketRole::Auth,
        statistics.clone(),
    ));

    tokio::spawn(process_socket(
        Arc::new(acct),
        service.get_router(),
        SocketRole::Acct,
        statistics.clone(),
    ));

    log::info!(
        "radius server listening: auth={}:{}, acct={}:{}",
        config.server.bind,
        config.server.auth_port,
        config.server.bind,
        config.server.acct_port
    );

    Ok(())
}

/// udp socket process loop.
///
/// read the datagram from the UDP socket, hand it to the router, and
/// send whatever response comes back to the source address. Every
/// datagram that produces no response is accounted as an error packet
/// for its source.
async fn process_socket(socket: Arc<UdpSocket>, router: Router, role: SocketRole, statistics: Statistics) {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];

    loop {
        // A send to a vanished peer surfaces as ConnectionReset on the
        // next receive on some platforms; that is business as usual for
        // a UDP server.
        let (size, addr) = match socket.recv_from(&mut buf).await {
            Ok(it) => it,
            Err(e) => {
                if e.kind() != ErrorKind::ConnectionReset {
                    log::warn!("udp socket receive error: {:?}", e);
                }

                continue;
            }
        };

        statistics.add(addr.ip(), &Stats::ReceivedPkts(1));
        statistics.add(addr.ip(), &Stats::ReceivedBytes(size as u64));
        log::trace!("udp socket receive: size={}, addr={:?}, role={:?}", size, addr, role);

        match router.route(&buf[..size], addr, role).await {
            RouteResult::Response(bytes) => match socket.send_to(&bytes, addr).await {
                Ok(_) => {
                    statistics.add(addr.ip(), &Stats::SendPkts(1));
                    statistics.add(addr.ip(), &Stats::SendBytes(bytes.len() as u64));
                    log::trace!("udp socket response: size={}, addr={:?}", bytes.len(), addr);
                }
                Err(e) => {
                    statistics.add(addr.ip(), &Stats::ErrorPkts(1));
                    if e.kind() != ErrorKind::ConnectionReset {
                        log::warn!("udp socket send error: {:?}", e);
                    }
                }
            },
            RouteResult::UnknownClient => {
                statistics.add(addr.ip(), &Stats::ErrorPkts(1));
                log::warn!("request from unknown client dropped: addr={:?}", addr);
            }
            RouteResult::Exceptional(e) => {
                statistics.add(addr.ip(), &Stats::ErrorPkts(1));
                log::warn!("packet process failed: addr={:?}, error={:?}", addr, e);
            }
            RouteResult::Aborted(e) => {
                statistics.add(addr.ip(), &Stats::ErrorPkts(1));
                log::error!("handler chain aborted: addr={:?}, error={}", addr, e);
            }
            RouteResult::Unhandled => {
                statistics.add(addr.ip(), &Stats::ErrorPkts(1));
                log::trace!("no response defined: addr={:?}, role={:?}", addr, role);
            }
        }
    }
}
