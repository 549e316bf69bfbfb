//! # Scan Events & Line Framing
//!
//! The device bridge delivers raw bytes from the RFID reader. This module
//! turns those bytes into a closed set of typed scan events.
//!
//! ## Framing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Device Bridge Framing                               │
//! │                                                                         │
//! │  Serial read #1:  "CARD:04A1B2"          (no terminator yet)           │
//! │  Serial read #2:  "C3\nITEM:BOO"                                       │
//! │  Serial read #3:  "K-1\n"                                              │
//! │                                                                         │
//! │  LineFramer output:                                                    │
//! │    after #1: []                        ← partial line buffered         │
//! │    after #2: [Card { uid: "04A1B2C3" }]                                │
//! │    after #3: [Item { tag: "BOOK-1" }]                                  │
//! │                                                                         │
//! │  An event is only emitted once a full line terminator is observed.     │
//! │  At most one parse is in flight; events come out in arrival order.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! One event per LF-terminated line (CR is tolerated and stripped):
//! - `CARD:<uid>`   - a student card was presented
//! - `ITEM:<tag>`   - an item tag was presented
//! - `STATUS:<msg>` - reader status (battery, firmware, etc.)
//! - anything else  - preserved verbatim as [`ScanEvent::Raw`]

use serde::{Deserialize, Serialize};

// =============================================================================
// Scan Event
// =============================================================================

/// A single event from the RFID reader.
///
/// A closed tagged-variant type: the reader's loosely-typed payloads are
/// normalized here and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanEvent {
    /// A student card scan.
    Card { uid: String },

    /// An item tag scan.
    Item { tag: String },

    /// Reader status line (informational only).
    Status { message: String },

    /// Unrecognized line, preserved for diagnostics.
    Raw { line: String },
}

impl ScanEvent {
    /// Parses a single complete line into an event.
    ///
    /// Never fails: unrecognized input becomes [`ScanEvent::Raw`].
    pub fn parse(line: &str) -> ScanEvent {
        let line = line.trim_end_matches('\r');

        if let Some(uid) = line.strip_prefix("CARD:") {
            let uid = uid.trim();
            if !uid.is_empty() {
                return ScanEvent::Card {
                    uid: uid.to_string(),
                };
            }
        } else if let Some(tag) = line.strip_prefix("ITEM:") {
            let tag = tag.trim();
            if !tag.is_empty() {
                return ScanEvent::Item {
                    tag: tag.to_string(),
                };
            }
        } else if let Some(message) = line.strip_prefix("STATUS:") {
            return ScanEvent::Status {
                message: message.trim().to_string(),
            };
        }

        ScanEvent::Raw {
            line: line.to_string(),
        }
    }
}

// =============================================================================
// Line Framer
// =============================================================================

/// Accumulates raw reader bytes and emits one event per complete line.
///
/// Partial lines are buffered across reads; a scan event is only emitted
/// once the line terminator is observed.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

/// Cap on the partial-line buffer. A reader that never sends a terminator
/// would otherwise grow the buffer without bound.
const MAX_PENDING_LINE: usize = 4096;

impl LineFramer {
    /// Creates an empty framer.
    pub fn new() -> Self {
        LineFramer::default()
    }

    /// Feeds a chunk of bytes and returns every completed event, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<ScanEvent> {
        let mut events = Vec::new();

        for &b in bytes {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                if !line.trim().is_empty() {
                    events.push(ScanEvent::parse(&line));
                }
            } else {
                if self.buf.len() >= MAX_PENDING_LINE {
                    // Oversized line: drop the head, keep framing from here.
                    self.buf.clear();
                }
                self.buf.push(b);
            }
        }

        events
    }

    /// Number of buffered bytes awaiting a terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_card() {
        assert_eq!(
            ScanEvent::parse("CARD:04A1B2C3"),
            ScanEvent::Card {
                uid: "04A1B2C3".to_string()
            }
        );
    }

    #[test]
    fn test_parse_item() {
        assert_eq!(
            ScanEvent::parse("ITEM:BOOK-1"),
            ScanEvent::Item {
                tag: "BOOK-1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            ScanEvent::parse("STATUS:ready"),
            ScanEvent::Status {
                message: "ready".to_string()
            }
        );
    }

    #[test]
    fn test_parse_unknown_is_raw() {
        assert_eq!(
            ScanEvent::parse("GARBAGE"),
            ScanEvent::Raw {
                line: "GARBAGE".to_string()
            }
        );
        // Empty payload after a known prefix is not a valid scan
        assert_eq!(
            ScanEvent::parse("CARD:"),
            ScanEvent::Raw {
                line: "CARD:".to_string()
            }
        );
    }

    #[test]
    fn test_framer_buffers_partial_lines() {
        let mut framer = LineFramer::new();

        assert!(framer.push(b"CARD:04A1").is_empty());
        assert_eq!(framer.pending(), 9);

        let events = framer.push(b"B2C3\nITEM:BOO");
        assert_eq!(
            events,
            vec![ScanEvent::Card {
                uid: "04A1B2C3".to_string()
            }]
        );

        let events = framer.push(b"K-1\n");
        assert_eq!(
            events,
            vec![ScanEvent::Item {
                tag: "BOOK-1".to_string()
            }]
        );
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_handles_crlf() {
        let mut framer = LineFramer::new();
        let events = framer.push(b"CARD:AA\r\nITEM:BB\r\n");
        assert_eq!(
            events,
            vec![
                ScanEvent::Card {
                    uid: "AA".to_string()
                },
                ScanEvent::Item {
                    tag: "BB".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_framer_skips_blank_lines() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"\n\r\n\n").is_empty());
    }

    #[test]
    fn test_framer_multiple_events_one_read() {
        let mut framer = LineFramer::new();
        let events = framer.push(b"CARD:AA\nITEM:BB\nSTATUS:ok\n");
        assert_eq!(events.len(), 3);
    }
}
