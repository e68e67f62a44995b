use anyhow::Result;
use pordisto::cli::{actions, actions::Action, start, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let (action, globals) = start()?;

    let result = match action {
        Action::Server { .. } => actions::server::handle(action, &globals).await,
    };

    telemetry::shutdown_tracer();

    result
}
