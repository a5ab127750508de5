//! Transactional email relay: a fixed catalogue of French templates rendered
//! into a shared layout and delivered through Resend.

pub mod components;
pub mod error;
pub mod helpers;
pub mod layout;
pub mod mailer;
pub mod notification;
pub mod params;
pub mod resend;
pub mod templates;

pub use error::MailError;
pub use mailer::{MailSettings, Mailer, NOTIFICATION_CATEGORY, RenderedEmail, SentEmail};
pub use notification::NotificationEmail;
pub use params::EmailParams;
pub use resend::{MailTransport, OutgoingEmail, ResendTransport, UnconfiguredTransport};
pub use templates::{Category, EmailTemplate};
