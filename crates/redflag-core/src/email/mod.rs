//! Transactional email: the `Mailer` seam and message templates.

pub mod templates;

use redflag_types::error::MailError;
use serde::Serialize;

/// A fully rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivery backend. Implementations live in redflag-infra.
pub trait Mailer: Send + Sync {
    fn send(
        &self,
        email: &OutgoingEmail,
    ) -> impl std::future::Future<Output = Result<(), MailError>> + Send;
}
