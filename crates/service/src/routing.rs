use std::net::SocketAddr;

use bytes::Bytes;

use codec::{Code, Packet};

use crate::{Disposition, HandlerError, Service, SocketRole};

/// Attribute type code of Proxy-State, which is echoed from request to
/// response per RFC 2865 section 2.
const PROXY_STATE: u32 = 33;

/// Outcome of routing one datagram.
///
/// The router never logs; every way a datagram can fail to produce a
/// response is reported to the transport layer, which owns logging and
/// statistics.
#[derive(Debug)]
pub enum RouteResult {
    /// an encoded response, ready to send to the source address.
    Response(Bytes),
    /// the source IP is not in the client registry.
    UnknownClient,
    /// the datagram did not parse as a RADIUS packet.
    Exceptional(codec::Error),
    /// a handler failed; the transaction is aborted with silence.
    Aborted(HandlerError),
    /// no response is defined for this (socket, code) combination.
    Unhandled,
}

/// Per-socket request router.
pub struct Router {
    service: Service,
}

impl Router {
    pub(crate) fn new(service: &Service) -> Self {
        Self {
            service: service.clone(),
        }
    }

    /// Route one datagram through decode, default response synthesis
    /// and the handler chain.
    ///
    /// The default response is selected from the receiving socket's
    /// role and the request code:
    ///
    /// * auth + Access-Request    -> Access-Reject
    /// * auth + Status-Server     -> Access-Accept
    /// * acct + Accounting-Request -> Accounting-Response
    ///
    /// Status-Server bypasses the handler chain entirely; its response
    /// is returned as prepared.
    pub async fn route(&self, bytes: &[u8], source: SocketAddr, role: SocketRole) -> RouteResult {
        let Some(secret) = self.service.get_secret(&source.ip().to_string()) else {
            return RouteResult::UnknownClient;
        };

        let request = match Packet::decode(self.service.dictionary(), bytes, secret.as_bytes()) {
            Ok(request) => request,
            Err(e) => {
                return RouteResult::Exceptional(e);
            }
        };

        let code = match (role, request.code()) {
            (SocketRole::Auth, Code::AccessRequest) => Code::AccessReject,
            (SocketRole::Auth, Code::StatusServer) => Code::AccessAccept,
            (SocketRole::Acct, Code::AccountingRequest) => Code::AccountingResponse,
            _ => return RouteResult::Unhandled,
        };

        let mut response = request.respond(code);

        // proxies expect their Proxy-State attributes back verbatim and
        // in order
        if let Ok(proxy_state) = self.service.dictionary().get(PROXY_STATE) {
            for attribute in request.get_all(&proxy_state) {
                if let Err(e) = response.add_attribute(attribute.clone()) {
                    return RouteResult::Exceptional(e);
                }
            }
        }

        if request.code() != Code::StatusServer {
            for handler in self.service.handlers() {
                let result = match role {
                    SocketRole::Auth => handler.handle_auth(&request, &mut response).await,
                    SocketRole::Acct => handler.handle_acct(&request, &mut response).await,
                };

                match result {
                    Ok(Disposition::Continue) => {}
                    Ok(Disposition::Done) => break,
                    Err(e) => return RouteResult::Aborted(e),
                }
            }
        }

        match response.encode(secret.as_bytes(), true) {
            Ok(bytes) => RouteResult::Response(bytes),
            Err(e) => RouteResult::Exceptional(e),
        }
    }
}
