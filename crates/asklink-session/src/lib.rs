// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session correlation for the asklink daemon.
//!
//! Questions posted to a chat are tracked in a [`CorrelationStore`] until a
//! reply resolves them or their deadline withdraws them:
//! - [`store`] holds outstanding questions, buffered replies and the capture
//! - [`matcher`] decides which question an inbound reply answers
//! - [`arbiter`] races a reply against the deadline
//! - [`router`] serves `send` and `get_chat_id` requests
//! - [`listener`] feeds inbound channel messages to the matcher

pub mod arbiter;
pub mod listener;
pub mod matcher;
pub mod router;
pub mod shutdown;
pub mod store;

pub use arbiter::{Episode, EpisodeState};
pub use listener::run_listener;
pub use matcher::{Delivery, MatchOutcome};
pub use router::{DaemonRouter, SessionSelector};
pub use shutdown::install_signal_handler;
pub use store::{CaptureId, CaptureTicket, CorrelationStore, QuestionId, QuestionTicket};
