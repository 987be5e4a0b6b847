/// Live progress line on stderr, fed from the engine's event bus.
use cleansleuth_core::model::size::format_size;
use cleansleuth_core::scanner::progress::ProgressEvent;
use cleansleuth_core::Engine;
use std::io::{self, Write};
use std::thread::{self, JoinHandle};

/// Widest current-path tail shown before truncation.
const PATH_WIDTH: usize = 60;

pub struct ProgressPrinter {
    subscription_id: u64,
    handle: JoinHandle<()>,
}

impl ProgressPrinter {
    pub fn start(engine: &Engine) -> Self {
        let subscription = engine.subscribe();
        let receiver = subscription.receiver;
        let handle = thread::spawn(move || {
            // Ends when the bus drops our sender.
            for event in receiver.iter() {
                let mut stderr = io::stderr().lock();
                if let Some(line) = render(&event) {
                    let _ = write!(stderr, "\r\x1b[2K{line}");
                    let _ = stderr.flush();
                }
                if is_terminal(&event) {
                    let _ = write!(stderr, "\r\x1b[2K");
                    let _ = stderr.flush();
                }
            }
        });
        Self {
            subscription_id: subscription.id,
            handle,
        }
    }

    pub fn stop(self, engine: &Engine) {
        engine.unsubscribe(self.subscription_id);
        let _ = self.handle.join();
    }
}

fn is_terminal(event: &ProgressEvent) -> bool {
    matches!(
        event,
        ProgressEvent::ScanCompleted { .. }
            | ProgressEvent::ScanCancelled { .. }
            | ProgressEvent::ScanFailed { .. }
            | ProgressEvent::CleanCompleted { .. }
            | ProgressEvent::CleanCancelled { .. }
    )
}

fn render(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::ScanStarted { mode, root } => Some(match root {
            Some(root) => format!("{} scan of {root}...", mode.label()),
            None => format!("{} scan...", mode.label()),
        }),
        ProgressEvent::ScanProgress {
            mode,
            completed,
            total,
            bytes_scanned,
            current_path,
        } => {
            let count = match total {
                Some(total) => format!("{completed}/{total}"),
                None => completed.to_string(),
            };
            Some(format!(
                "{} {count} ({}) {}",
                mode.label(),
                format_size(*bytes_scanned),
                tail(current_path)
            ))
        }
        ProgressEvent::CleanStarted { total } => Some(format!("cleaning {total} paths...")),
        ProgressEvent::CleanProgress {
            completed,
            total,
            freed_bytes,
            current_path,
        } => Some(format!(
            "cleaning {completed}/{total} ({} freed) {}",
            format_size(*freed_bytes),
            tail(current_path)
        )),
        _ => None,
    }
}

fn tail(path: &str) -> &str {
    let len = path.chars().count();
    if len <= PATH_WIDTH {
        return path;
    }
    let skip = len - PATH_WIDTH;
    let start = path
        .char_indices()
        .nth(skip)
        .map_or(0, |(i, _)| i);
    &path[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleansleuth_core::model::ScanMode;

    #[test]
    fn long_paths_keep_their_tail() {
        let long = "a".repeat(100) + "/target";
        let shown = tail(&long);
        assert_eq!(shown.chars().count(), PATH_WIDTH);
        assert!(shown.ends_with("/target"));
        assert_eq!(tail("/short"), "/short");
    }

    #[test]
    fn progress_line_shows_counts() {
        let line = render(&ProgressEvent::ScanProgress {
            mode: ScanMode::Dev,
            completed: 3,
            total: Some(10),
            bytes_scanned: 2048,
            current_path: "/home/u/.npm".into(),
        })
        .unwrap();
        assert_eq!(line, "dev 3/10 (2.0 KB) /home/u/.npm");
        assert!(render(&ProgressEvent::ScanCancelled { mode: ScanMode::Dev }).is_none());
    }

    #[test]
    fn failed_scan_ends_the_line() {
        let failed = ProgressEvent::ScanFailed {
            mode: ScanMode::Normal,
            message: "path not found: /gone".into(),
        };
        assert!(is_terminal(&failed));
        assert!(render(&failed).is_none());
    }
}
