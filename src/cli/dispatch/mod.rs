use crate::cli::actions::Action;
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        provider_url: matches
            .get_one::<String>("provider-url")
            .map(ToString::to_string),
        docstore_url: matches
            .get_one::<String>("docstore-url")
            .map(ToString::to_string),
        frontend_url: matches
            .get_one::<String>("frontend-url")
            .map(ToString::to_string)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --frontend-url"))?,
        mail_relay_url: matches
            .get_one::<String>("mail-relay-url")
            .map(ToString::to_string),
        dev: matches.get_flag("dev"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn test_handler_dev_mode() -> Result<()> {
        let matches = commands::new().get_matches_from(vec![
            "pordisto",
            "--dev",
            "--secret-key",
            "signing-key",
        ]);
        let Action::Server {
            port,
            provider_url,
            dev,
            ..
        } = handler(&matches)?;
        assert_eq!(port, 8080);
        assert_eq!(provider_url, None);
        assert!(dev);
        Ok(())
    }
}
