//! Request orchestration and notification fan-out for cmnotify.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** This crate knows every domain component and every port,
//! but no concrete transport. The composition root hands it an
//! [`events::HttpSink`], an optional [`events::Mailer`], and an
//! [`events::OutcomeRecorder`].
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`notifier`] | `Notifier`, the verify → decode → validate → dispatch pipeline |
//! | [`dispatcher`] | `NotificationDispatcher`, concurrent channel fan-out |
//! | [`body`] | Raw body decoding (plain or base64 JSON) |
//! | [`recorder`] | `TracingRecorder`, the default settlement sink |

pub mod body;
pub mod dispatcher;
pub mod notifier;
pub mod recorder;

#[cfg(test)]
mod testing;

pub use body::decode_body;
pub use dispatcher::NotificationDispatcher;
pub use notifier::{Notifier, PostOptions};
pub use recorder::TracingRecorder;
