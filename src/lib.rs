//! # Pordisto (Authentication & Profile Gateway)
//!
//! `pordisto` sits in front of an external identity provider and an external
//! document store and owns the orchestration between them: email verification
//! codes, password-reset tokens, and the consistency of profile fields that
//! are mirrored into session-token claims.
//!
//! ## Verification lifecycle
//!
//! Registration delegates credential creation to the identity provider and
//! writes a `Pending` profile record (6-digit code, 30-minute window) to the
//! document store. Verification promotes the record to `Verified` — a terminal
//! state — with a conditional write so concurrent attempts have exactly one
//! winner, then mirrors the result into the provider (email-verified flag and
//! a `member` role claim).
//!
//! ## Password reset
//!
//! Forgot-password issues a signed, short-lived token and persists a
//! `ResetTicket` keyed by email; the latest ticket supersedes older links.
//! Completing a reset consumes the ticket before the password changes, so a
//! reset link is provably single-use.
//!
//! ## Dual-store consistency
//!
//! The document store is the source of truth; the identity provider is a
//! mirror updated second. A partial write is surfaced as an error, never
//! reported as success, and claim drift is repaired idempotently on every
//! token validation.

pub mod api;
pub mod cli;
pub mod core;
pub mod email;
pub mod identity;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
