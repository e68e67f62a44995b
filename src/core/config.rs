//! Gateway configuration constructed once at process start.

use chrono::Duration;

const DEFAULT_CODE_TTL_MINUTES: i64 = 30;
const DEFAULT_RESET_TTL_MINUTES: i64 = 30;

/// Time windows and frontend wiring for the verification and reset flows.
/// Built once from CLI arguments and passed by reference into each component;
/// there is no ambient global state.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    frontend_base_url: String,
    code_ttl_minutes: i64,
    reset_ttl_minutes: i64,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            code_ttl_minutes: DEFAULT_CODE_TTL_MINUTES,
            reset_ttl_minutes: DEFAULT_RESET_TTL_MINUTES,
        }
    }

    #[must_use]
    pub fn with_code_ttl_minutes(mut self, minutes: i64) -> Self {
        self.code_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_reset_ttl_minutes(mut self, minutes: i64) -> Self {
        self.reset_ttl_minutes = minutes;
        self
    }

    /// Validity window for emailed verification codes.
    #[must_use]
    pub fn code_ttl(&self) -> Duration {
        Duration::minutes(self.code_ttl_minutes)
    }

    /// Validity window for password-reset tokens and tickets.
    #[must_use]
    pub fn reset_ttl(&self) -> Duration {
        Duration::minutes(self.reset_ttl_minutes)
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Frontend reset link embedded in the reset email.
    #[must_use]
    pub fn reset_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        format!("{base}/reset-password?token={token}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = GatewayConfig::new("https://app.example.com".to_string());
        assert_eq!(config.code_ttl(), Duration::minutes(30));
        assert_eq!(config.reset_ttl(), Duration::minutes(30));

        let config = config.with_code_ttl_minutes(5).with_reset_ttl_minutes(10);
        assert_eq!(config.code_ttl(), Duration::minutes(5));
        assert_eq!(config.reset_ttl(), Duration::minutes(10));
    }

    #[test]
    fn reset_url_trims_trailing_slash() {
        let config = GatewayConfig::new("https://app.example.com/".to_string());
        assert_eq!(
            config.reset_url("tok"),
            "https://app.example.com/reset-password?token=tok"
        );
    }
}
