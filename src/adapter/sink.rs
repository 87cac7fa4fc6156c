//! Alert sink adapters.

use parking_lot::Mutex;
use tracing::info;

use crate::domain::{Alert, DeliveryStatus};
use crate::port::AlertSink;

/// Emits alerts as structured log events.
#[derive(Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn emit(&self, alert: Alert) {
        info!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            severity = ?alert.severity,
            tender_id = %alert.tender_id,
            message = %alert.message,
            "alert emitted"
        );
    }
}

/// Collects alerts in memory; test helper.
#[derive(Default)]
pub struct VecAlertSink {
    inner: Mutex<Vec<Alert>>,
}

impl VecAlertSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.inner.lock())
    }
}

impl AlertSink for VecAlertSink {
    fn emit(&self, mut alert: Alert) {
        alert.delivery = DeliveryStatus::Emitted;
        self.inner.lock().push(alert);
    }
}
