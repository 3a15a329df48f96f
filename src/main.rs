#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use radius_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::load()?);
    simple_logger::init_with_level(config.log.level.as_level())?;

    if config.clients.is_empty() {
        log::warn!(
            "No clients are configured, every datagram will be dropped, it's just a program listening on two ports :-)"
        );

        return Ok(());
    }

    radius_server::startup(config).await
}
