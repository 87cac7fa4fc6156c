//! Outbound alert port toward the notification collaborator.

use crate::domain::Alert;

/// Receives alerts as they are generated.
///
/// Ownership of an alert transfers downstream on emission; the engine keeps
/// no delivery state beyond the handoff.
pub trait AlertSink: Send + Sync {
    fn emit(&self, alert: Alert);
}
