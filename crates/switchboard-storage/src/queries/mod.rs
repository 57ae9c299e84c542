// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Every function takes `&Database` and runs on the
//! single tokio-rusqlite writer thread.

pub mod conversations;
pub mod customers;
pub mod escalations;
pub mod messages;
