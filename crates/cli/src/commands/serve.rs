//! `docchat serve` — Start the web UI and HTTP API.

use super::{build_chat, load_config};

pub async fn run(
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    let chat = build_chat(&config)?;

    println!("  DocChat");
    println!("   Open:      http://{}:{}/", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.effective_model());
    println!("   History:   {} first", match config.history.ordering {
        docchat_core::history::OrderingPolicy::Append => "oldest",
        docchat_core::history::OrderingPolicy::Prepend => "newest",
    });

    docchat_gateway::start(config, chat).await?;

    Ok(())
}
