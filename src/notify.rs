//! User-facing notifications.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{display_message, ErrorClass, UserFacing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// Receives messages meant for the user (a snackbar, a status line).
pub trait Notifier {
    fn notify(&self, message: &str, severity: Severity);
}

/// Logs notifications instead of showing them; for headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Success => info!(target: "notification", "{message}"),
            Severity::Warning => warn!(target: "notification", "{message}"),
            Severity::Error => error!(target: "notification", "{message}"),
        }
    }
}

/// Reports `err` as an error notification and logs it by class.
pub fn report<E: UserFacing + ?Sized>(notifier: &dyn Notifier, err: &E) {
    let message = display_message(err);
    match err.class() {
        ErrorClass::Unexpected => error!(error = %err, "unexpected failure"),
        ErrorClass::Input | ErrorClass::Wallet => warn!(error = %err, "operation failed"),
    }
    notifier.notify(&message, Severity::Error);
}
