use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub secret_key: SecretString,
    pub provider_api_key: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(secret_key: SecretString, provider_api_key: SecretString) -> Self {
        Self {
            secret_key,
            provider_api_key,
        }
    }
}
