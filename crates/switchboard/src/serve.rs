// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard serve` command implementation.
//!
//! Wires SQLite storage, the tenant directory, the Anthropic generator, the
//! rule classifier and the pipeline, then serves the web chat endpoint and
//! the SMS/WhatsApp webhooks until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use switchboard_agent::shutdown;
use switchboard_agent::{ConfigDirectory, ConversationStore, Pipeline};
use switchboard_anthropic::AnthropicGenerator;
use switchboard_config::model::SwitchboardConfig;
use switchboard_core::error::SwitchboardError;
use switchboard_core::{StorageAdapter, TenantDirectory};
use switchboard_gateway::{GatewayState, HealthState, ServerConfig, build_router, start_server};
use switchboard_prometheus::{PrometheusAdapter, RenderFn};
use switchboard_router::RuleClassifier;
use switchboard_sms::{SmsSettings, SmsState, TwilioClient};
use switchboard_storage::SqliteStorage;
use switchboard_whatsapp::{WhatsAppClient, WhatsAppSettings, WhatsAppState};
use tracing::{debug, error, info, warn};

/// Runs the `switchboard serve` command.
pub async fn run_serve(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    init_tracing(&config.agent.log_level);

    info!("starting switchboard serve");

    let storage = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };
    let store = Arc::new(ConversationStore::new(
        storage.clone() as Arc<dyn StorageAdapter>
    ));

    let directory: Arc<dyn TenantDirectory> =
        Arc::new(ConfigDirectory::from_config(&config.tenants));
    if config.tenants.is_empty() {
        warn!("no tenants configured, SMS and WhatsApp webhooks will reject every message");
    } else {
        info!(count = config.tenants.len(), "tenant directory loaded");
    }

    let generator = AnthropicGenerator::new(&config.anthropic).map_err(|e| {
        error!(error = %e, "failed to initialize Anthropic generator");
        eprintln!(
            "error: Anthropic API key required. Set anthropic.api_key, \
             SWITCHBOARD_ANTHROPIC_API_KEY or ANTHROPIC_API_KEY"
        );
        e
    })?;

    let pipeline = Arc::new(Pipeline::from_config(
        &config,
        store,
        Arc::new(RuleClassifier::new()),
        Arc::new(generator),
    )?);

    let prometheus_render = init_prometheus(&config);

    let sms = SmsState {
        pipeline: pipeline.clone(),
        directory: directory.clone(),
        client: TwilioClient::new(
            &config.sms.api_base_url,
            Duration::from_secs(config.sms.timeout_secs),
        )?,
        settings: SmsSettings::from_config(&config.sms),
    };
    let whatsapp = WhatsAppState {
        pipeline: pipeline.clone(),
        directory,
        client: WhatsAppClient::new(
            &config.whatsapp.api_base_url,
            Duration::from_secs(config.whatsapp.timeout_secs),
        )?,
        settings: WhatsAppSettings::from_config(&config.whatsapp),
    };
    if config.whatsapp.verify_token.is_none() {
        warn!("whatsapp.verify_token is not set, webhook subscription handshakes will fail");
    }

    let gateway = GatewayState {
        pipeline: pipeline.clone(),
        default_company_id: config.web.default_company_id.clone(),
        health: HealthState::new(prometheus_render),
    };
    let app = build_router(gateway, Some(sms), Some(whatsapp));

    let cancel = shutdown::install_signal_handler();
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let served = start_server(&server_config, app, cancel.clone()).await;
    // Also stops the signal task when the server exits on its own.
    cancel.cancel();

    let drain_timeout = Duration::from_secs(config.generation.timeout_secs);
    shutdown::drain_tasks(pipeline.streams(), drain_timeout).await;

    if let Err(e) = storage.close().await {
        warn!(error = %e, "failed to close storage cleanly");
    }

    served?;
    info!("switchboard serve shutdown complete");
    Ok(())
}

/// Installs the global Prometheus recorder when enabled.
///
/// A failed install is logged and the server runs without metrics.
fn init_prometheus(config: &SwitchboardConfig) -> Option<RenderFn> {
    if !config.prometheus.enabled {
        debug!("prometheus metrics disabled by configuration");
        return None;
    }

    match PrometheusAdapter::install() {
        Ok(adapter) => {
            info!("prometheus metrics enabled");
            Some(adapter.render_fn())
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchboard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
