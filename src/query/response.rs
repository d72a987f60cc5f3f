// ABOUTME: Response envelope and byte-budget enforcement for every query endpoint
// ABOUTME: Truncates array payloads to the longest fitting prefix via binary search
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Response Builder
//!
//! Array payloads that serialize above the budget are cut to the longest leading
//! prefix that still fits, with `truncated = true` and a `next_cursor` minted from
//! the last included item. Single computed objects are never truncated.

use pierre_core::constants::limits::{MAX_RAW_RESPONSE_BYTES, MAX_SUMMARY_RESPONSE_BYTES};
use pierre_core::pagination::Cursor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::AppResult;

/// Envelope returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Always `true`; failures use the error envelope
    pub success: bool,
    /// Payload
    pub data: T,
    /// Cursor for the next page, if any
    pub next_cursor: Option<Cursor>,
    /// Whether the payload stops short of everything available
    pub truncated: bool,
    /// Counts and size
    pub meta: ResponseMeta,
}

/// Envelope metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Items in `data`
    pub returned: usize,
    /// Effective limit of the request
    pub limit: usize,
    /// Serialized size of the envelope measured before this field is filled in.
    ///
    /// The bytes on the wire are slightly larger, by the length of the
    /// `"response_bytes":N` member itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_bytes: Option<usize>,
}

/// Serialized size of a value
///
/// # Errors
///
/// Returns `SerializationError` if the value cannot be serialized
pub fn serialized_len<T: Serialize + ?Sized>(value: &T) -> AppResult<usize> {
    Ok(serde_json::to_vec(value)?.len())
}

/// Builds envelopes under a byte budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseBuilder {
    budget: usize,
}

impl ResponseBuilder {
    /// Budget for raw set and event listings
    #[must_use]
    pub const fn raw() -> Self {
        Self {
            budget: MAX_RAW_RESPONSE_BYTES,
        }
    }

    /// Budget for summaries and the coaching pack
    #[must_use]
    pub const fn summary() -> Self {
        Self {
            budget: MAX_SUMMARY_RESPONSE_BYTES,
        }
    }

    /// Custom budget
    #[must_use]
    pub const fn with_budget(budget: usize) -> Self {
        Self { budget }
    }

    /// Byte budget of this builder
    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// Build a page envelope.
    ///
    /// `has_more` says whether storage holds items beyond `items`. `render` produces
    /// each item's JSON and `cursor_for` mints the resume position after an item.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or serialization fails
    pub fn page<T, R, C>(
        &self,
        items: &[T],
        has_more: bool,
        limit: usize,
        render: R,
        cursor_for: C,
    ) -> AppResult<Envelope<Vec<Value>>>
    where
        R: Fn(&T) -> AppResult<Value>,
        C: Fn(&T) -> Cursor,
    {
        let rendered = items.iter().map(&render).collect::<AppResult<Vec<_>>>()?;

        let full_cursor = if has_more {
            items.last().map(&cursor_for)
        } else {
            None
        };
        let full = page_envelope(rendered.clone(), full_cursor, has_more, limit);
        let full_bytes = serialized_len(&full)?;
        if full_bytes <= self.budget || rendered.is_empty() {
            return Ok(finish(full, full_bytes));
        }

        // Largest prefix length that fits. An empty prefix resumes after the first
        // item, which alone is larger than the budget.
        let fits = |len: usize| -> AppResult<Option<(Envelope<Vec<Value>>, usize)>> {
            let cursor = cursor_for(&items[len.saturating_sub(1)]);
            let envelope = page_envelope(rendered[..len].to_vec(), Some(cursor), true, limit);
            let bytes = serialized_len(&envelope)?;
            Ok((bytes <= self.budget).then_some((envelope, bytes)))
        };

        let (mut low, mut high) = (0, rendered.len() - 1);
        while low < high {
            let mid = low + (high - low).div_ceil(2);
            if fits(mid)?.is_some() {
                low = mid;
            } else {
                high = mid - 1;
            }
        }

        let (envelope, bytes) = match fits(low)? {
            Some(found) => found,
            None => {
                let envelope =
                    page_envelope(Vec::new(), Some(cursor_for(&items[0])), true, limit);
                let bytes = serialized_len(&envelope)?;
                (envelope, bytes)
            }
        };
        debug!(
            returned = envelope.meta.returned,
            available = rendered.len(),
            response_bytes = bytes,
            truncated = true,
            budget = self.budget,
            "Truncated response to fit byte budget"
        );
        Ok(finish(envelope, bytes))
    }

    /// Build an envelope around a single computed object; never truncated
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn object<T: Serialize>(
        &self,
        data: T,
        returned: usize,
        limit: usize,
    ) -> AppResult<Envelope<T>> {
        self.bounded_object(data, returned, limit, false)
    }

    /// Like [`Self::object`], for objects whose inner list was capped by `limit`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn bounded_object<T: Serialize>(
        &self,
        data: T,
        returned: usize,
        limit: usize,
        truncated: bool,
    ) -> AppResult<Envelope<T>> {
        let envelope = Envelope {
            success: true,
            data,
            next_cursor: None,
            truncated,
            meta: ResponseMeta {
                returned,
                limit,
                response_bytes: None,
            },
        };
        let bytes = serialized_len(&envelope)?;
        if bytes > self.budget {
            warn!(
                response_bytes = bytes,
                budget = self.budget,
                "Computed object exceeds its byte budget"
            );
        }
        Ok(finish(envelope, bytes))
    }
}

fn page_envelope(
    data: Vec<Value>,
    next_cursor: Option<Cursor>,
    truncated: bool,
    limit: usize,
) -> Envelope<Vec<Value>> {
    let returned = data.len();
    Envelope {
        success: true,
        data,
        next_cursor,
        truncated,
        meta: ResponseMeta {
            returned,
            limit,
            response_bytes: None,
        },
    }
}

fn finish<T>(mut envelope: Envelope<T>, bytes: usize) -> Envelope<T> {
    envelope.meta.response_bytes = Some(bytes);
    envelope
}
