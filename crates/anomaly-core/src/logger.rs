//! Event Logger
//!
//! Append-only JSONL log of scheduler events.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anomaly_events::SchedulerEvent;

/// Writes drained scheduler events to a JSONL file.
pub struct EventLogger {
    writer: Option<BufWriter<File>>,
    event_count: u64,
}

impl EventLogger {
    /// Create a new event logger writing to the specified path
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            event_count: 0,
        })
    }

    /// Create a logger that discards events
    pub fn null() -> Self {
        Self {
            writer: None,
            event_count: 0,
        }
    }

    /// Number of events seen so far, written or not
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn log(&mut self, event: &SchedulerEvent) -> std::io::Result<()> {
        self.event_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = event.to_jsonl()?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    pub fn log_batch(&mut self, events: &[SchedulerEvent]) -> std::io::Result<()> {
        for event in events {
            self.log(event)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("failed to flush event log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomaly_events::{ResolveCause, SchedulerEventKind, SkipReason};
    use std::io::BufRead;

    fn skipped(sequence: u64) -> SchedulerEvent {
        SchedulerEvent::new(
            sequence,
            6.0,
            SchedulerEventKind::SpawnSkipped {
                reason: SkipReason::NoCandidates,
                room_id: Some("room_kitchen".to_string()),
            },
        )
    }

    #[test]
    fn test_event_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut logger = EventLogger::new(&path).unwrap();
        logger.log_batch(&[skipped(0), SchedulerEvent::new(1, 420.0, SchedulerEventKind::Won)]).unwrap();
        logger.flush().unwrap();

        let file = File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        let parsed = SchedulerEvent::from_jsonl(&lines[0]).unwrap();
        assert_eq!(parsed, skipped(0));
        assert!(lines[1].contains(r#""event":"won""#));
    }

    #[test]
    fn test_null_logger() {
        let mut logger = EventLogger::null();
        let resolved = SchedulerEvent::new(
            0,
            1.0,
            SchedulerEventKind::Resolved {
                instance: anomaly_events::InstanceId::from_random_bytes([2; 16]),
                anomaly_id: "vase".to_string(),
                room_id: "kitchen".to_string(),
                cause: ResolveCause::Forced,
            },
        );

        logger.log(&resolved).unwrap();
        assert_eq!(logger.event_count(), 1);
    }

    #[test]
    fn test_drop_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        {
            let mut logger = EventLogger::new(&path).unwrap();
            logger.log(&skipped(0)).unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
