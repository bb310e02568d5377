//! Notifier — typed notifications rendered to email and sent over SMTP.

pub mod mailer;
pub mod model;
pub mod render;

pub use mailer::{Mailer, Notify};
pub use model::{Notification, SendOutcome};
