// ABOUTME: Re-exports caps, byte budgets, tool names, and training thresholds from pierre-core
// ABOUTME: Single source of truth for every limit the query endpoints enforce
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use pierre_core::constants::*;
