// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite backing for conversations, messages and the escalation queue.
//!
//! All statements run on one background connection owned by
//! `tokio-rusqlite`; [`SqliteStorage`] is the [`StorageAdapter`] face of it.
//!
//! [`StorageAdapter`]: switchboard_core::StorageAdapter

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
