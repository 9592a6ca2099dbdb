//! Notification delivery for fired listeners.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - Slack chat, desktop-notification, and browser-launch channels
//! - Dispatcher that fans one fire event out to all configured channels

pub mod browser;
pub mod desktop;
pub mod dispatcher;
pub mod slack;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use traits::{DispatchResult, Notifier, NotifyError};
