use std::sync::Arc;

use async_trait::async_trait;

use codec::{Code, Dictionary, Packet};
use service::{Disposition, HandlerResult, RequestHandler};

use crate::config::Config;

/// The built-in handler chain link.
///
/// Authenticates Access-Requests against the static credential table
/// from the configuration and logs every decision. Deployments with a
/// real identity backend put their own handlers in front of (or instead
/// of) this one.
pub struct Observer {
    config: Arc<Config>,
    dictionary: Arc<Dictionary>,
}

impl Observer {
    pub fn new(config: Arc<Config>, dictionary: Arc<Dictionary>) -> Self {
        Self { config, dictionary }
    }
}

#[async_trait]
impl RequestHandler for Observer {
    /// authentication request
    ///
    /// The User-Password attribute has already been de-obfuscated by
    /// the codec at this point; the comparison below is plaintext
    /// against the configured table. A missing user name or password
    /// leaves the prepared Access-Reject untouched.
    async fn handle_auth(&self, request: &Packet, response: &mut Packet) -> HandlerResult {
        let user_name = request
            .get(&*self.dictionary.get("User-Name")?)
            .and_then(|it| it.value().as_str().map(str::to_string));

        let password = request
            .get(&*self.dictionary.get("User-Password")?)
            .and_then(|it| it.value().as_str().map(str::to_string));

        let (Some(user_name), Some(password)) = (user_name, password) else {
            log::info!(
                "auth: id={}, missing credentials, leaving default response",
                request.identifier()
            );

            return Ok(Disposition::Continue);
        };

        let granted = self
            .config
            .auth
            .static_credentials
            .get(&user_name)
            .is_some_and(|it| *it == password);

        log::info!("auth: id={}, name={:?}, granted={}", request.identifier(), user_name, granted);

        if granted {
            response.set_code(Code::AccessAccept)?;
            return Ok(Disposition::Done);
        }

        Ok(Disposition::Continue)
    }

    /// accounting request
    ///
    /// The default Accounting-Response acknowledgement is kept as-is;
    /// this hook only records what happened.
    async fn handle_acct(&self, request: &Packet, _: &mut Packet) -> HandlerResult {
        let status = request
            .get(&*self.dictionary.get("Acct-Status-Type")?)
            .map(|it| it.to_string());

        let session = request
            .get(&*self.dictionary.get("Acct-Session-Id")?)
            .and_then(|it| it.value().as_str().map(str::to_string));

        log::info!(
            "acct: id={}, status={:?}, session={:?}",
            request.identifier(),
            status,
            session
        );

        Ok(Disposition::Continue)
    }
}
