pub mod config;
pub mod observer;
pub mod server;
pub mod statistics;

use std::sync::Arc;

use anyhow::Context;

use codec::Dictionary;
use service::{RequestHandler, Service, ServiceOptions};

use self::{config::Config, observer::Observer, statistics::Statistics};

#[rustfmt::skip]
static SOFTWARE: &str = concat!(
    "radius-server.",
    env!("CARGO_PKG_VERSION")
);

/// In order to let the integration test directly use the radius-server
/// crate and start the server, a function is opened to replace the main
/// function to directly start the server.
pub async fn startup(config: Arc<Config>) -> anyhow::Result<()> {
    log::info!("{} starting", SOFTWARE);

    let dictionary = Arc::new(Dictionary::standard().context("embedded dictionary load failed")?);
    for path in &config.dictionaries {
        dictionary
            .load(path)
            .with_context(|| format!("dictionary load failed: {}", path))?;
    }

    let statistics = Statistics::default();
    let handlers: Vec<Arc<dyn RequestHandler>> =
        vec![Arc::new(Observer::new(config.clone(), dictionary.clone()))];

    let service = Service::new(ServiceOptions {
        dictionary,
        clients: config.clients.clone(),
        handlers,
    });

    server::start(&config, &statistics, &service).await?;

    // The radius server is non-blocking once its socket loops are
    // spawned and needs to be kept from exiting immediately.
    std::future::pending::<()>().await;
    Ok(())
}
