//! Notification rendering and dispatch.
//!
//! Rendering is pure (see [`render`]); delivery goes through the
//! [`NotificationTransport`] port. Mail mechanics live outside the monitor: the
//! shipped [`OutboxTransport`] drops each message into the store for an
//! external mailer.

mod render;
mod transport;

pub use render::{TRUNCATION_NOTICE, render, render_block, subject};
pub use transport::{NotificationTransport, OutboxTransport, OutgoingMessage, TransportError};
