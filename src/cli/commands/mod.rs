use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("pordisto")
        .about("Authentication and profile gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PORDISTO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("provider-url")
                .long("provider-url")
                .help("Identity provider base URL")
                .env("PORDISTO_PROVIDER_URL")
                .required_unless_present("dev"),
        )
        .arg(
            Arg::new("provider-api-key")
                .long("provider-api-key")
                .help("Identity provider API key")
                .env("PORDISTO_PROVIDER_API_KEY")
                .required_unless_present("dev"),
        )
        .arg(
            Arg::new("docstore-url")
                .long("docstore-url")
                .help("Document store base URL")
                .env("PORDISTO_DOCSTORE_URL")
                .required_unless_present("dev"),
        )
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Frontend base URL used in reset links")
                .default_value("http://localhost:3000")
                .env("PORDISTO_FRONTEND_URL"),
        )
        .arg(
            Arg::new("secret-key")
                .long("secret-key")
                .help("Signing key for password reset tokens")
                .env("PORDISTO_SECRET_KEY")
                .required(true),
        )
        .arg(
            Arg::new("mail-relay-url")
                .long("mail-relay-url")
                .help("Mail relay base URL, log-only delivery when unset")
                .env("PORDISTO_MAIL_RELAY_URL"),
        )
        .arg(
            Arg::new("dev")
                .long("dev")
                .help("Run with in-memory identity and document store backends")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PORDISTO_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
