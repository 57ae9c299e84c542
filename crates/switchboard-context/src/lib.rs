// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly and response generation for the Switchboard engine.
//!
//! - [`GuidelineTable`]: closed, industry-keyed guideline lookup validated at construction
//! - [`PromptBuilder`]: preamble + guideline + trimmed history + current message
//! - [`ResponseGenerator`]: blocking and streaming generation with timeouts

pub mod generator;
pub mod guidelines;
pub mod prompt;

pub use generator::ResponseGenerator;
pub use guidelines::GuidelineTable;
pub use prompt::PromptBuilder;
