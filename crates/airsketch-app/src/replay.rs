//! Recorded pen sessions.
//!
//! A log is JSON lines, one [`PenEvent`] per line, in arrival order:
//!
//! ```text
//! {"type":"connection","state":"connected","device_id":"AA:BB"}
//! {"type":"dot","device_id":"AA:BB","dot":{"x":30.0,"y":40.0,"dot_type":0}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::io::{BufRead, Write};

use airsketch_core::PenEvent;
use airsketch_core::pen::PenEventSender;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read event log: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Parse every event in a log.
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<PenEvent>, ReplayError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|source| ReplayError::Parse {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    log::debug!("Read {} event(s) from log", events.len());
    Ok(events)
}

/// Write events in the same format [`read_events`] accepts.
pub fn write_events<W: Write>(mut writer: W, events: &[PenEvent]) -> Result<(), ReplayError> {
    for event in events {
        let line = serde_json::to_string(event)?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Push events into a live queue, as the pen SDK would. Returns how many were delivered.
pub fn feed(sender: &PenEventSender, events: Vec<PenEvent>) -> usize {
    let mut delivered = 0;
    for event in events {
        if !sender.send(event) {
            break;
        }
        delivered += 1;
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use airsketch_core::{ConnectionEvent, PenEventQueue, RawDot};
    use std::io::Cursor;

    const LOG: &str = r#"
# recorded session
{"type":"connection","state":"connecting"}
{"type":"connection","state":"connected","device_id":"AA:BB"}
{"type":"dot","device_id":"AA:BB","dot":{"x":30.0,"y":40.0,"dot_type":0}}

{"type":"dot","device_id":"AA:BB","dot":{"x":31.5,"y":41.0,"dot_type":2}}
"#;

    #[test]
    fn test_read_events() {
        let events = read_events(Cursor::new(LOG)).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], PenEvent::Connection(ConnectionEvent::Connecting));
        assert_eq!(
            events[1],
            PenEvent::Connection(ConnectionEvent::Connected {
                device_id: "AA:BB".to_string()
            })
        );
        assert_eq!(
            events[3],
            PenEvent::Dot {
                device_id: "AA:BB".to_string(),
                dot: RawDot { x: 31.5, y: 41.0, dot_type: 2 },
            }
        );
    }

    #[test]
    fn test_parse_error_names_line() {
        let log = "{\"type\":\"connection\",\"state\":\"disconnected\"}\nnot json\n";
        match read_events(Cursor::new(log)) {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_written_log_reads_back() {
        let events = read_events(Cursor::new(LOG)).unwrap();
        let mut buf = Vec::new();
        write_events(&mut buf, &events).unwrap();
        assert_eq!(read_events(Cursor::new(buf)).unwrap(), events);
    }

    #[test]
    fn test_feed_delivers_in_order() {
        let queue = PenEventQueue::new();
        let events = read_events(Cursor::new(LOG)).unwrap();
        assert_eq!(feed(&queue.sender(), events.clone()), 4);
        assert_eq!(queue.poll_events(), events);
    }
}
