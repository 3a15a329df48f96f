pub mod routing;

use std::{collections::HashMap, sync::Arc};

use ahash::AHashMap;
use async_trait::async_trait;

use codec::{Dictionary, Packet};

use self::routing::Router;

/// What a handler decided about the transaction so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// fall through to the next handler in the chain.
    Continue,
    /// the response is final; the rest of the chain is skipped.
    Done,
}

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<Disposition, HandlerError>;

/// A link in the request handler chain.
///
/// Handlers run in registration order and may mutate the prepared
/// response (change its code, append attributes).  Returning
/// [`Disposition::Done`] short-circuits the chain; returning an error
/// aborts the transaction and nothing is sent, so from the client's
/// point of view the request times out.
///
/// Both hooks default to passing the transaction through untouched, so
/// a handler only interested in one socket role implements one method.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// invoked for requests arriving on the authentication port.
    #[allow(unused_variables)]
    async fn handle_auth(&self, request: &Packet, response: &mut Packet) -> HandlerResult {
        Ok(Disposition::Continue)
    }

    /// invoked for requests arriving on the accounting port.
    #[allow(unused_variables)]
    async fn handle_acct(&self, request: &Packet, response: &mut Packet) -> HandlerResult {
        Ok(Disposition::Continue)
    }
}

/// Which of the two server sockets a datagram arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketRole {
    Auth,
    Acct,
}

pub struct ServiceOptions {
    pub dictionary: Arc<Dictionary>,
    /// source IP (exact string match) to shared secret.
    pub clients: HashMap<String, String>,
    /// the ordered handler chain.
    pub handlers: Vec<Arc<dyn RequestHandler>>,
}

/// Radius service.
///
/// Owns the per-deployment state every transaction needs: the shared
/// dictionary, the client registry and the handler chain.  The service
/// is cheap to clone; one clone per socket loop is the intended use.
#[derive(Clone)]
pub struct Service {
    dictionary: Arc<Dictionary>,
    clients: Arc<AHashMap<String, String>>,
    handlers: Arc<Vec<Arc<dyn RequestHandler>>>,
}

impl Service {
    /// Create the radius service.
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            dictionary: options.dictionary,
            clients: Arc::new(options.clients.into_iter().collect()),
            handlers: Arc::new(options.handlers),
        }
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    /// shared secret for a source IP, if the client is known.
    pub fn get_secret(&self, ip: &str) -> Option<&str> {
        self.clients.get(ip).map(String::as_str)
    }

    pub(crate) fn handlers(&self) -> &[Arc<dyn RequestHandler>] {
        &self.handlers
    }

    /// Get a request router.
    pub fn get_router(&self) -> Router {
        Router::new(self)
    }
}
