use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Info,
    Warning,
    Error,
}

/// One operational event, in the shape the control UI renders.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
}

/// Append-only, timestamped record of operational events. Pure sink:
/// nothing in the core consumes it. Unbounded by default; truncation is a
/// caller concern, not a guarantee made here.
#[derive(Default)]
pub struct EventLog {
    entries: Mutex<Vec<EventEntry>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, kind: EventKind, message: impl Into<String>) {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        self.entries.lock().unwrap().push(EventEntry {
            timestamp,
            kind,
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(EventKind::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.append(EventKind::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(EventKind::Error, message);
    }

    /// Full log in insertion order.
    pub fn entries(&self) -> Vec<EventEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let log = EventLog::new();
        log.info("first");
        log.warning("second");
        log.error("third");

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[0].kind, EventKind::Info);
        assert_eq!(entries[1].kind, EventKind::Warning);
        assert_eq!(entries[2].kind, EventKind::Error);
    }

    #[test]
    fn kind_serializes_to_ui_labels() {
        let log = EventLog::new();
        log.warning("probe");
        let json = serde_json::to_value(log.entries()).unwrap();
        assert_eq!(json[0]["type"], "warning");
        assert!(json[0]["timestamp"].as_str().unwrap().contains('T'));
    }
}
