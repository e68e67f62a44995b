//! Gateway core: the flows behind the HTTP surface, wired over the
//! identity-provider and document-store seams.

use std::sync::Arc;

use crate::email::EmailSender;
use crate::identity::IdentityProvider;
use crate::store::{DocumentStore, ProfileStore, ResetTicketStore};

pub mod claims;
pub mod config;
pub mod error;
pub mod profile;
pub mod reset;
pub mod token;
pub mod verification;

pub use claims::ClaimsSynchronizer;
pub use config::GatewayConfig;
pub use error::Error;
pub use profile::{ProfileChanges, ProfileService};
pub use reset::ResetFlow;
pub use token::TokenCodec;
pub use verification::VerificationStateMachine;

/// All gateway flows behind one handle, shared across request handlers.
pub struct Gateway {
    pub identity: Arc<dyn IdentityProvider>,
    pub verification: VerificationStateMachine,
    pub reset: ResetFlow,
    pub claims: ClaimsSynchronizer,
    pub profile: ProfileService,
}

impl Gateway {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn EmailSender>,
        codec: TokenCodec,
        config: GatewayConfig,
    ) -> Self {
        let profiles = ProfileStore::new(Arc::clone(&store));
        let tickets = ResetTicketStore::new(store);

        Self {
            verification: VerificationStateMachine::new(
                profiles.clone(),
                Arc::clone(&identity),
                Arc::clone(&mailer),
                config.clone(),
            ),
            reset: ResetFlow::new(
                Arc::clone(&identity),
                tickets,
                codec,
                Arc::clone(&mailer),
                config,
            ),
            claims: ClaimsSynchronizer::new(Arc::clone(&identity)),
            profile: ProfileService::new(profiles, Arc::clone(&identity)),
            identity,
        }
    }
}
