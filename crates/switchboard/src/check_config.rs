// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard check-config` command implementation.

use std::fmt::Write;

use switchboard_config::model::SwitchboardConfig;

/// Summary of a validated configuration.
///
/// Secrets are masked by the config types' `Debug` impls.
pub fn render_report(config: &SwitchboardConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "configuration is valid");
    let _ = writeln!(
        out,
        "  listen: {}:{}",
        config.gateway.host, config.gateway.port
    );
    let _ = writeln!(out, "  database: {}", config.storage.database_path);
    let _ = writeln!(out, "  model: {}", config.anthropic.model);
    let _ = writeln!(
        out,
        "  escalation: threshold {} after {} failed generations",
        config.escalation.confidence_threshold, config.escalation.max_generation_failures
    );
    let _ = writeln!(out, "  tenants: {}", config.tenants.len());
    for tenant in &config.tenants {
        let mut channels = Vec::new();
        if tenant.sms.is_some() {
            channels.push("sms");
        }
        if tenant.whatsapp.is_some() {
            channels.push("whatsapp");
        }
        let _ = writeln!(
            out,
            "    {} ({}): {}",
            tenant.company_id,
            tenant.industry,
            if channels.is_empty() {
                "web only".to_string()
            } else {
                channels.join(", ")
            }
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{config:#?}");
    out
}
