use crate::cli::{actions::Action, commands, dispatch::handler, globals::GlobalArgs, telemetry};
use anyhow::Result;
use secrecy::SecretString;

/// Start the CLI
pub fn start() -> Result<(Action, GlobalArgs)> {
    let matches = commands::new().get_matches();

    let verbosity_level = match matches.get_one::<u8>("verbosity").map_or(0, |&v| v) {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    telemetry::init(Some(verbosity_level))?;

    let secret_key = matches
        .get_one::<String>("secret-key")
        .map(|key| SecretString::from(key.clone()))
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --secret-key"))?;

    let provider_api_key = matches
        .get_one::<String>("provider-api-key")
        .map_or_else(
            || SecretString::from(String::new()),
            |key| SecretString::from(key.clone()),
        );

    let globals = GlobalArgs::new(secret_key, provider_api_key);

    let action = handler(&matches)?;

    Ok((action, globals))
}
