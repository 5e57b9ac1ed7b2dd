//! `steward serve`: start the HTTP API server.

use steward_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        tracing::warn!("No API key configured; provider calls will fail until one is set");
    }

    println!("Steward Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, steward_providers::resolve_model(&config));
    println!(
        "   API key:   {}",
        if config.gateway.api_key.is_some() { "required" } else { "not required" }
    );

    steward_gateway::start(config).await?;

    Ok(())
}
