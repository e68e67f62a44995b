pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        provider_url: Option<String>,
        docstore_url: Option<String>,
        frontend_url: String,
        mail_relay_url: Option<String>,
        dev: bool,
    },
}
