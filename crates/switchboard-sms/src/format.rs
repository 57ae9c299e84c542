// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply shaping for SMS.

/// Truncates `text` to at most `max_length` characters, ending in `marker`
/// when anything was cut.
///
/// Lengths are counted in Unicode scalar values.
pub fn truncate_reply(text: &str, max_length: usize, marker: &str) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(marker.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.truncate(out.trim_end().len());
    out.push_str(marker);
    out
}
