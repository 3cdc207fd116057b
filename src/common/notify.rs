use duct::cmd;

use crate::common::sanitize::{SanitizeContext, sanitize};
use crate::ui::prelude::*;

/// Where completion notifications go.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Desktop notifications through `notify-send`.
#[derive(Debug, Clone, Copy)]
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &str) {
        send_notification(self.enabled, message);
    }
}

/// Send a desktop notification when enabled and `notify-send` exists.
pub fn send_notification(enabled: bool, message: &str) {
    if !enabled || which::which("notify-send").is_err() {
        return;
    }
    let message = sanitize(message, SanitizeContext::Message);
    let result = cmd!("notify-send", "rinse", &message)
        .stdout_null()
        .stderr_null()
        .unchecked()
        .run();
    if let Err(e) = result {
        emit(
            Level::Debug,
            "notify.failed",
            &format!("notify-send failed: {}", e),
            None,
        );
    }
}
