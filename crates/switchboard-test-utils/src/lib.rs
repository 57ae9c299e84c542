// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures shared by the integration suites of every channel crate.
//!
//! Nothing here talks to the network: [`MockGenerator`] replays scripted
//! replies, [`MockChannel`] records what would have been sent, and
//! [`TestHarness`] wires both into a real [`Pipeline`] backed by a
//! throwaway SQLite file.
//!
//! [`Pipeline`]: switchboard_agent::Pipeline

pub mod harness;
pub mod mock_channel;
pub mod mock_generator;

pub use harness::{TEST_COMPANY, TestHarness, chunk_text, collect_items};
pub use mock_channel::MockChannel;
pub use mock_generator::{MockGenerator, Scripted};
