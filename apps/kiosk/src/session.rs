//! # Kiosk Pairing Session
//!
//! Pairs card and item scans into borrow/return intents.
//!
//! ## Pairing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Card + Item Pairing                                │
//! │                                                                         │
//! │  CARD:ALICE              ITEM:BOOK-1                                    │
//! │      │                       │                                          │
//! │      ▼                       ▼                                          │
//! │  session opens ───────► CardItem { card, item }  → borrow (or return    │
//! │  (30s window)                                      if already on loan)  │
//! │                                                                         │
//! │  ITEM:BOOK-2 with no open session                                       │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  ItemOnly { item } → return-by-scan                                     │
//! │                                                                         │
//! │  A second CARD scan replaces the open session; the window expires       │
//! │  after 30 seconds of inactivity.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::{Duration, Instant};
use tracing::debug;

use biblio_core::ScanEvent;

/// Default session window: how long a card scan waits for an item scan.
pub const DEFAULT_SESSION_WINDOW: Duration = Duration::from_secs(30);

// =============================================================================
// Paired Scan
// =============================================================================

/// A resolved scan intent, ready for the loan engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairedScan {
    /// An item scanned while a card session is open.
    CardItem { card_uid: String, item_tag: String },

    /// An item scanned with no session open (return-by-scan).
    ItemOnly { item_tag: String },
}

// =============================================================================
// Kiosk Session
// =============================================================================

/// The card-then-item pairing state machine.
///
/// Pure state: time is passed in, so the expiry logic is testable without
/// sleeping.
#[derive(Debug)]
pub struct KioskSession {
    window: Duration,
    open_card: Option<(String, Instant)>,
}

impl KioskSession {
    /// Creates a session with the given pairing window.
    pub fn new(window: Duration) -> Self {
        KioskSession {
            window,
            open_card: None,
        }
    }

    /// Feeds one scan event; returns an intent when a pairing resolves.
    pub fn on_event(&mut self, event: &ScanEvent, now: Instant) -> Option<PairedScan> {
        self.expire(now);

        match event {
            ScanEvent::Card { uid } => {
                debug!(card_uid = %uid, "Card session opened");
                self.open_card = Some((uid.clone(), now));
                None
            }

            ScanEvent::Item { tag } => match self.open_card.take() {
                Some((card_uid, _)) => Some(PairedScan::CardItem {
                    card_uid,
                    item_tag: tag.clone(),
                }),
                None => Some(PairedScan::ItemOnly {
                    item_tag: tag.clone(),
                }),
            },

            // Status lines and unrecognized input never affect pairing
            ScanEvent::Status { .. } | ScanEvent::Raw { .. } => None,
        }
    }

    /// True when a card session is currently open.
    pub fn has_open_card(&self) -> bool {
        self.open_card.is_some()
    }

    fn expire(&mut self, now: Instant) {
        if let Some((_, opened)) = &self.open_card {
            if now.duration_since(*opened) > self.window {
                debug!("Card session expired");
                self.open_card = None;
            }
        }
    }
}

impl Default for KioskSession {
    fn default() -> Self {
        KioskSession::new(DEFAULT_SESSION_WINDOW)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn card(uid: &str) -> ScanEvent {
        ScanEvent::Card {
            uid: uid.to_string(),
        }
    }

    fn item(tag: &str) -> ScanEvent {
        ScanEvent::Item {
            tag: tag.to_string(),
        }
    }

    #[test]
    fn test_card_then_item_pairs() {
        let mut session = KioskSession::default();
        let t0 = Instant::now();

        assert!(session.on_event(&card("ALICE"), t0).is_none());
        let intent = session.on_event(&item("BOOK-1"), t0).unwrap();
        assert_eq!(
            intent,
            PairedScan::CardItem {
                card_uid: "ALICE".to_string(),
                item_tag: "BOOK-1".to_string()
            }
        );

        // The pairing consumed the session
        assert!(!session.has_open_card());
    }

    #[test]
    fn test_item_without_card_is_return_by_scan() {
        let mut session = KioskSession::default();
        let intent = session.on_event(&item("BOOK-1"), Instant::now()).unwrap();
        assert_eq!(
            intent,
            PairedScan::ItemOnly {
                item_tag: "BOOK-1".to_string()
            }
        );
    }

    #[test]
    fn test_session_expires() {
        let mut session = KioskSession::new(Duration::from_secs(30));
        let t0 = Instant::now();

        session.on_event(&card("ALICE"), t0);
        let later = t0 + Duration::from_secs(31);

        // The stale card is gone; the item resolves as return-by-scan
        let intent = session.on_event(&item("BOOK-1"), later).unwrap();
        assert_eq!(
            intent,
            PairedScan::ItemOnly {
                item_tag: "BOOK-1".to_string()
            }
        );
    }

    #[test]
    fn test_second_card_replaces_session() {
        let mut session = KioskSession::default();
        let t0 = Instant::now();

        session.on_event(&card("ALICE"), t0);
        session.on_event(&card("BOB"), t0);

        let intent = session.on_event(&item("BOOK-1"), t0).unwrap();
        assert_eq!(
            intent,
            PairedScan::CardItem {
                card_uid: "BOB".to_string(),
                item_tag: "BOOK-1".to_string()
            }
        );
    }

    #[test]
    fn test_status_lines_are_ignored() {
        let mut session = KioskSession::default();
        let t0 = Instant::now();

        session.on_event(&card("ALICE"), t0);
        assert!(session
            .on_event(
                &ScanEvent::Status {
                    message: "battery low".to_string()
                },
                t0
            )
            .is_none());
        assert!(session.has_open_card());
    }
}
