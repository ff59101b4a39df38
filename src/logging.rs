//! `env_logger` output, teed into a channel for the configuration window.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{Log, Metadata, Record};
use parking_lot::Mutex;
use tokio::sync::mpsc;

const BACKLOG_LINES: usize = 500;

/// Recent log lines, so a window that opens late still sees startup output.
#[derive(Clone, Default)]
pub struct LogBacklog {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBacklog {
    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() == BACKLOG_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }
}

/// Receiving end of the tee, drained by the UI forwarding task.
pub struct LogStream {
    pub lines: mpsc::UnboundedReceiver<String>,
    pub backlog: LogBacklog,
}

struct TeeLogger {
    inner: env_logger::Logger,
    tx: mpsc::UnboundedSender<String>,
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);
        // Nobody listening any more after shutdown.
        let _ = self.tx.send(format_line(record));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

fn format_line(record: &Record) -> String {
    format!(
        "{} {:<5} {}: {}",
        chrono::Local::now().format("%H:%M:%S"),
        record.level(),
        record.target(),
        record.args()
    )
}

/// Install the global logger (`RUST_LOG`, default `info`).
pub fn init() -> Result<LogStream, log::SetLoggerError> {
    let inner = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .build();
    let max_level = inner.filter();
    let (tx, rx) = mpsc::unbounded_channel();

    log::set_boxed_logger(Box::new(TeeLogger { inner, tx }))?;
    log::set_max_level(max_level);

    Ok(LogStream {
        lines: rx,
        backlog: LogBacklog::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backlog_keeps_most_recent_lines() {
        let backlog = LogBacklog::default();
        for i in 0..BACKLOG_LINES + 3 {
            backlog.push(format!("line {i}"));
        }
        let lines = backlog.snapshot();
        assert_eq!(lines.len(), BACKLOG_LINES);
        assert_eq!(lines[0], "line 3");
        assert_eq!(lines.last().unwrap(), &format!("line {}", BACKLOG_LINES + 2));
    }

    #[test]
    fn lines_carry_level_target_and_message() {
        let line = format_line(
            &Record::builder()
                .args(format_args!("hello"))
                .level(log::Level::Warn)
                .target("screen_qa_lib::orchestrator")
                .build(),
        );
        assert!(line.ends_with("WARN  screen_qa_lib::orchestrator: hello"));
    }
}
