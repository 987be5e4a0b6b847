/// Progress reporting: lightweight events sent from worker threads to
/// whoever is listening (the engine's event bus, a CLI progress line, a
/// test channel).
///
/// Events carry only counters and the path being processed; results are
/// returned from the operation itself.
use crate::model::ScanMode;
use crossbeam_channel::Sender;
use serde::Serialize;

/// Every topic on the engine's event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum ProgressEvent {
    ScanStarted {
        mode: ScanMode,
        root: Option<String>,
    },
    /// Emitted once per completed unit (category, child directory, file batch).
    ScanProgress {
        mode: ScanMode,
        completed: u64,
        /// Units in this scan, when known up front.
        total: Option<u64>,
        bytes_scanned: u64,
        current_path: String,
    },
    ScanCompleted {
        mode: ScanMode,
        total_size: u64,
        duration_ms: u64,
    },
    ScanCancelled {
        mode: ScanMode,
    },
    /// The scan stopped on an error; distinct from a cancellation.
    ScanFailed {
        mode: ScanMode,
        message: String,
    },
    CleanStarted {
        total: usize,
    },
    CleanProgress {
        completed: usize,
        total: usize,
        freed_bytes: u64,
        current_path: String,
    },
    CleanCompleted {
        freed_bytes: u64,
        deleted: usize,
        error_count: usize,
    },
    CleanCancelled {
        freed_bytes: u64,
    },
}

/// Anything that can receive progress events. Implementations must never
/// block the emitting worker for long.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// A bounded channel drops events when full rather than stalling a worker.
impl ProgressSink for Sender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.try_send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_sink_drops_when_full() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.emit(ProgressEvent::ScanCancelled { mode: ScanMode::Dev });
        tx.emit(ProgressEvent::ScanCancelled { mode: ScanMode::Normal });
        assert_eq!(rx.len(), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            ProgressEvent::ScanCancelled { mode: ScanMode::Dev }
        );
    }

    #[test]
    fn events_serialise_with_topic_tag() {
        let json = serde_json::to_value(ProgressEvent::CleanStarted { total: 3 }).unwrap();
        assert_eq!(json["topic"], "clean_started");
        assert_eq!(json["total"], 3);
    }
}
