// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for asklink integration tests.
//!
//! Provides a mock channel and a test harness for fast, deterministic,
//! CI-runnable tests without a Telegram bot.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock messaging channel with message injection and capture
//! - [`TestHarness`] - Store, router and listener wired to a `MockChannel`

pub mod harness;
pub mod mock_channel;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_channel::MockChannel;
