use log::{debug, info};
use std::io::{IsTerminal, Write};

use crate::models::PrayerType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
}

impl NotificationRequest {
    pub fn prayer_due(prayer: PrayerType) -> Self {
        Self {
            title: "Prayer Time!".to_string(),
            body: format!("It is now time for {}.", prayer.display_name()),
        }
    }
}

/// Local notification delivery.
pub trait Notifier {
    fn permitted(&self) -> bool;
    /// Single best-effort ask, made once at startup.
    fn request_permission(&self) -> bool;
    fn notify(&self, title: &str, body: &str);
}

/// Deliver `request` if the notifier has permission. Returns whether it was sent.
pub fn deliver(notifier: &dyn Notifier, request: &NotificationRequest) -> bool {
    if !notifier.permitted() {
        debug!("notification suppressed (no permission): {}", request.body);
        return false;
    }
    notifier.notify(&request.title, &request.body);
    true
}

/// Rings the terminal bell and writes the message to stderr.
pub struct TerminalNotifier {
    enabled: bool,
}

impl TerminalNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for TerminalNotifier {
    fn permitted(&self) -> bool {
        self.enabled
    }

    fn request_permission(&self) -> bool {
        if !self.enabled {
            info!("notifications disabled in config");
        }
        self.enabled
    }

    fn notify(&self, title: &str, body: &str) {
        info!("{title} {body}");
        let mut err = std::io::stderr();
        let bell = if err.is_terminal() { "\x07" } else { "" };
        let _ = writeln!(err, "{bell}{title} {body}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        allowed: bool,
        sent: RefCell<Vec<String>>,
    }

    impl Notifier for Recorder {
        fn permitted(&self) -> bool {
            self.allowed
        }
        fn request_permission(&self) -> bool {
            self.allowed
        }
        fn notify(&self, _title: &str, body: &str) {
            self.sent.borrow_mut().push(body.to_string());
        }
    }

    #[test]
    fn delivery_requires_permission() {
        let request = NotificationRequest::prayer_due(PrayerType::Asr);
        assert_eq!(request.body, "It is now time for Asr.");

        let denied = Recorder {
            allowed: false,
            sent: RefCell::new(Vec::new()),
        };
        assert!(!deliver(&denied, &request));
        assert!(denied.sent.borrow().is_empty());

        let granted = Recorder {
            allowed: true,
            sent: RefCell::new(Vec::new()),
        };
        assert!(deliver(&granted, &request));
        assert_eq!(granted.sent.borrow().len(), 1);
    }
}
