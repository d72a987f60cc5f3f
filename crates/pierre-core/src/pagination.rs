// ABOUTME: Cursor-based pagination module for efficient data traversal
// ABOUTME: Provides opaque, sort-mode-bound cursor encoding for the analytics endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{self, Display, Formatter};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current cursor schema version. Cursors minted under another version restart pagination.
pub const CURSOR_VERSION: u32 = 1;

/// Opaque pagination cursor: `base64url(json(CursorPayload))`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Get the raw cursor string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create cursor from raw string (for deserialization)
    #[must_use]
    pub const fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sort orders a cursor can be minted under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// `workout_end_time DESC, set_id DESC`
    #[default]
    DateDesc,
    /// `e1rm DESC, workout_end_time DESC, set_id DESC`
    E1rmDesc,
    /// Workout event log, `occurred_at DESC, event_id DESC`
    EventTimeDesc,
}

impl SortMode {
    /// Wire name of this sort mode
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DateDesc => "date_desc",
            Self::E1rmDesc => "e1rm_desc",
            Self::EventTimeDesc => "event_time_desc",
        }
    }

    /// Parse a set-query sort parameter. Event ordering is not selectable by callers.
    #[must_use]
    pub fn parse_set_sort(s: &str) -> Option<Self> {
        match s {
            "date_desc" => Some(Self::DateDesc),
            "e1rm_desc" => Some(Self::E1rmDesc),
            _ => None,
        }
    }
}

/// Position encoded inside a [`Cursor`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CursorPayload {
    /// Sort mode the cursor was minted under
    pub sort: SortMode,
    /// End time of the last returned item's workout (event time for event logs)
    pub last_workout_end_time: DateTime<Utc>,
    /// Id of the last returned item (set id or event id)
    pub last_set_id: String,
    /// Cursor schema version
    pub version: u32,
    /// e1RM of the last returned item, present only for `e1rm_desc`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_e1rm: Option<f64>,
}

impl CursorPayload {
    /// Payload for a time-ordered listing
    #[must_use]
    pub fn new(sort: SortMode, last_workout_end_time: DateTime<Utc>, last_set_id: &str) -> Self {
        Self {
            sort,
            last_workout_end_time,
            last_set_id: last_set_id.to_owned(),
            version: CURSOR_VERSION,
            last_e1rm: None,
        }
    }

    /// Payload for an e1RM-ordered listing
    #[must_use]
    pub fn by_e1rm(last_e1rm: f64, last_workout_end_time: DateTime<Utc>, last_set_id: &str) -> Self {
        Self {
            last_e1rm: Some(last_e1rm),
            ..Self::new(SortMode::E1rmDesc, last_workout_end_time, last_set_id)
        }
    }

    /// Encode as an opaque cursor
    #[must_use]
    pub fn encode(&self) -> Cursor {
        // Serializing a struct of plain fields cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        Cursor(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode a cursor, validating it belongs to `expected_sort` and the current version
    ///
    /// Returns `None` (start over) if:
    /// - The cursor is malformed
    /// - The sort mode in the cursor doesn't match `expected_sort`
    /// - The cursor was minted under another schema version
    #[must_use]
    pub fn decode(cursor: &Cursor, expected_sort: SortMode) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(cursor.as_str()).ok()?;
        let payload: Self = serde_json::from_slice(&bytes).ok()?;

        if payload.sort != expected_sort || payload.version != CURSOR_VERSION {
            tracing::debug!(
                cursor_sort = payload.sort.as_str(),
                expected_sort = expected_sort.as_str(),
                cursor_version = payload.version,
                "Cursor does not match request, restarting pagination"
            );
            return None;
        }
        if expected_sort == SortMode::E1rmDesc && payload.last_e1rm.is_none() {
            return None;
        }
        Some(payload)
    }
}

/// A page fetched from storage with one-item lookahead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T> {
    /// The items in this page
    pub items: Vec<T>,
    /// Whether there are more items after this page upstream
    pub has_more: bool,
}

impl<T> CursorPage<T> {
    /// Build a page from `limit + 1` fetched rows, dropping the lookahead row
    #[must_use]
    pub fn from_lookahead(mut items: Vec<T>, limit: usize) -> Self {
        let has_more = items.len() > limit;
        items.truncate(limit);
        Self { items, has_more }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_keeps_payload() {
        let payload = CursorPayload::new(SortMode::DateDesc, Utc::now(), "abc:123");
        let decoded = CursorPayload::decode(&payload.encode(), SortMode::DateDesc);
        assert_eq!(decoded, Some(payload));
    }

    #[test]
    fn test_e1rm_cursor_keeps_exact_value() {
        let e1rm = 100.0 * (1.0 + 5.0 / 30.0);
        let payload = CursorPayload::by_e1rm(e1rm, Utc::now(), "s9");
        let decoded = CursorPayload::decode(&payload.encode(), SortMode::E1rmDesc).unwrap();
        assert_eq!(decoded.last_e1rm.map(f64::to_bits), Some(e1rm.to_bits()));
    }

    #[test]
    fn test_sort_mismatch_restarts() {
        let cursor = CursorPayload::new(SortMode::DateDesc, Utc::now(), "s1").encode();
        assert!(CursorPayload::decode(&cursor, SortMode::E1rmDesc).is_none());
    }

    #[test]
    fn test_version_mismatch_restarts() {
        let mut payload = CursorPayload::new(SortMode::DateDesc, Utc::now(), "s1");
        payload.version = CURSOR_VERSION + 1;
        assert!(CursorPayload::decode(&payload.encode(), SortMode::DateDesc).is_none());
    }

    #[test]
    fn test_garbage_restarts() {
        let cursor = Cursor::from_string("not base64 !!".to_owned());
        assert!(CursorPayload::decode(&cursor, SortMode::DateDesc).is_none());
    }

    #[test]
    fn test_lookahead_page() {
        let page = CursorPage::from_lookahead(vec![1, 2, 3], 2);
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.has_more);
        let page = CursorPage::from_lookahead(vec![1, 2], 2);
        assert!(!page.has_more);
    }
}
