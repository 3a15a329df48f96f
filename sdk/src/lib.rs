//! # Radius Client SDK
//!
//! The client half of the protocol engine: build a request, send it to
//! one or more servers with retries and strict round-robin selection,
//! and resolve once a response survives source, identifier and
//! authenticator checks.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use codec::{Attribute, AttributeList, Code, Dictionary};
//! use radius_server_sdk::{RadiusClient, Upstream};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dictionary = Arc::new(Dictionary::standard()?);
//!
//! let client = RadiusClient::builder(dictionary.clone())
//!     .with_server(Upstream::new("127.0.0.1".parse()?, "testing123"))
//!     .build()?;
//!
//! let mut attributes = AttributeList::new();
//! attributes.add(Attribute::new(dictionary.get("User-Name")?, "alice")?)?;
//! attributes.add(Attribute::new(dictionary.get("User-Password")?, "mypass")?)?;
//!
//! let response = client.request(Code::AccessRequest, attributes).await?;
//! println!("granted: {:?}", response.code());
//! # Ok(())
//! # }
//! ```

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use parking_lot::Mutex;
use rand::Rng;
use tokio::{net::UdpSocket, time};

use codec::{AttributeList, Code, Dictionary, Packet, crypto, packet::MAX_PACKET_SIZE};

pub const DEFAULT_AUTH_PORT: u16 = 1812;
pub const DEFAULT_ACCT_PORT: u16 = 1813;
pub const DEFAULT_RETRY: usize = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Codec(codec::Error),
    NoServers,
    InvalidRetry,
    InvalidDelay,
    /// the server answered an Access-Request with Access-Reject; the
    /// response packet is the error payload.
    Rejected(Packet),
    /// no acceptable response arrived within `retry * server_count`
    /// attempts.
    Timeout,
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::IO(value)
    }
}

impl From<codec::Error> for Error {
    fn from(value: codec::Error) -> Self {
        Self::Codec(value)
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One upstream server the client may talk to.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub address: IpAddr,
    pub auth_port: u16,
    pub acct_port: u16,
    pub secret: String,
}

impl Upstream {
    pub fn new(address: IpAddr, secret: impl Into<String>) -> Self {
        Self {
            address,
            auth_port: DEFAULT_AUTH_PORT,
            acct_port: DEFAULT_ACCT_PORT,
            secret: secret.into(),
        }
    }

    fn port(&self, code: Code) -> u16 {
        match code {
            Code::AccountingRequest => self.acct_port,
            _ => self.auth_port,
        }
    }
}

pub struct RadiusClientBuilder {
    dictionary: Arc<Dictionary>,
    servers: Vec<Upstream>,
    retry: usize,
    delay: Duration,
}

impl RadiusClientBuilder {
    pub fn with_server(mut self, upstream: Upstream) -> Self {
        self.servers.push(upstream);
        self
    }

    /// attempts per server; must be positive.
    pub fn with_retry(mut self, retry: usize) -> Self {
        self.retry = retry;
        self
    }

    /// how long each attempt waits for a response; must be positive.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(self) -> Result<RadiusClient, Error> {
        if self.servers.is_empty() {
            return Err(Error::NoServers);
        }

        if self.retry == 0 {
            return Err(Error::InvalidRetry);
        }

        if self.delay.is_zero() {
            return Err(Error::InvalidDelay);
        }

        Ok(RadiusClient {
            dictionary: self.dictionary,
            servers: self
                .servers
                .into_iter()
                .map(|upstream| ServerState {
                    upstream,
                    identifier: Mutex::new(rand::rng().random()),
                })
                .collect(),
            retry: self.retry,
            delay: self.delay,
        })
    }
}

struct ServerState {
    upstream: Upstream,
    /// identifier counter, seeded with a random byte and incremented
    /// mod 256 per allocated request.
    identifier: Mutex<u8>,
}

impl ServerState {
    fn next_identifier(&self) -> u8 {
        let mut counter = self.identifier.lock();
        let identifier = *counter;
        *counter = counter.wrapping_add(1);
        identifier
    }
}

/// Request state cached per server so that retries to the same server
/// resend the identical datagram.
struct Pending {
    identifier: u8,
    authenticator: [u8; 16],
    bytes: Bytes,
    target: SocketAddr,
}

/// Radius client.
pub struct RadiusClient {
    dictionary: Arc<Dictionary>,
    servers: Vec<ServerState>,
    retry: usize,
    delay: Duration,
}

impl RadiusClient {
    pub fn builder(dictionary: Arc<Dictionary>) -> RadiusClientBuilder {
        RadiusClientBuilder {
            dictionary,
            servers: Vec::new(),
            retry: DEFAULT_RETRY,
            delay: DEFAULT_DELAY,
        }
    }

    /// Send a request and wait for an acceptable response.
    ///
    /// Servers are tried in strict round-robin (`attempt mod count`);
    /// each attempt resends the datagram cached for that server and
    /// waits up to the configured delay.  Datagrams from the wrong
    /// source, unparseable datagrams, identifier mismatches and
    /// authenticator mismatches are ignored without consuming the
    /// attempt window.
    ///
    /// Resolution by (request, response) code pair: Access-Accept and
    /// Accounting-Response resolve, Access-Reject fails with
    /// [`Error::Rejected`] carrying the response, everything else is
    /// ignored.  The transaction socket is ephemeral and closed on all
    /// paths when this function returns.
    pub async fn request(&self, code: Code, attributes: AttributeList) -> Result<Packet, Error> {
        let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)).await?;

        let mut pending: Vec<Option<Pending>> = (0..self.servers.len()).map(|_| None).collect();
        let mut buffer = vec![0u8; MAX_PACKET_SIZE];

        for attempt in 0..self.retry * self.servers.len() {
            let index = attempt % self.servers.len();
            let state = &self.servers[index];

            let prepared: &Pending = match &mut pending[index] {
                Some(it) => it,
                slot @ None => slot.insert(self.prepare(state, code, &attributes)?),
            };

            // transport failures are non-events: the attempt is spent
            // and the loop moves on until every attempt is exhausted
            if let Err(e) = socket.send_to(&prepared.bytes, prepared.target).await {
                log::warn!("radius client send error: addr={}, {:?}", prepared.target, e);
                continue;
            }

            log::trace!(
                "radius client send: attempt={}, id={}, addr={}",
                attempt,
                prepared.identifier,
                prepared.target
            );

            let deadline = time::Instant::now() + self.delay;
            loop {
                let received = match time::timeout_at(deadline, socket.recv_from(&mut buffer)).await {
                    Ok(Ok(it)) => it,
                    Ok(Err(e)) => {
                        log::warn!("radius client receive error: {:?}", e);
                        break;
                    }
                    Err(_) => break,
                };

                let (size, address) = received;
                if address != prepared.target {
                    continue;
                }

                let bytes = &buffer[..size];
                let secret = state.upstream.secret.as_bytes();

                let Ok(response) = Packet::decode(&self.dictionary, bytes, secret) else {
                    continue;
                };

                if response.identifier() != prepared.identifier {
                    continue;
                }

                if !crypto::verify_response_authenticator(bytes, &prepared.authenticator, secret) {
                    continue;
                }

                match (code, response.code()) {
                    (Code::AccessRequest, Code::AccessAccept) => return Ok(response),
                    (Code::AccessRequest, Code::AccessReject) => return Err(Error::Rejected(response)),
                    (Code::AccountingRequest, Code::AccountingResponse) => return Ok(response),
                    _ => continue,
                }
            }
        }

        Err(Error::Timeout)
    }

    fn prepare(&self, state: &ServerState, code: Code, attributes: &AttributeList) -> Result<Pending, Error> {
        let identifier = state.next_identifier();
        let authenticator = crypto::random_authenticator();

        let packet = Packet::with_attributes(code, identifier, authenticator, attributes.iter().cloned());
        let bytes = packet.encode(state.upstream.secret.as_bytes(), false)?;

        Ok(Pending {
            identifier,
            authenticator,
            bytes,
            target: SocketAddr::new(state.upstream.address, state.upstream.port(code)),
        })
    }
}
