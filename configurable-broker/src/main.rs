/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use event_broker::{ConfigFeed, EventBroker, TableFeed};
use http_delivery_client::HttpDeliveryClient;
use static_broker_config::{ApplyOutcome, StaticConfigProvider};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "configurable-broker")]
#[command(about = "Per-tenant CloudEvents broker dataplane", long_about = None)]
struct Cli {
    /// json5 configuration file.
    #[arg(short, long, env = "BROKER_CONFIG")]
    config: PathBuf,

    /// Broker this process serves; triggers bound to other brokers are ignored.
    #[arg(short, long, env = "BROKER_NAME", default_value = "default")]
    name: String,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigquit.recv() => info!("received SIGQUIT"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    init_tracing(config.logging.json);

    info!(
        config = %cli.config.display(),
        broker = cli.name.as_str(),
        "starting configurable broker"
    );

    let client = HttpDeliveryClient::new(config.http_client())
        .context("unable to build the delivery client")?;
    let broker = EventBroker::new(cli.name.clone(), Arc::new(client), config.broker_settings());
    let shutdown = CancellationToken::new();

    let poller = match &config.static_config {
        Some(section) => {
            let feed: Arc<dyn ConfigFeed> =
                Arc::new(TableFeed::new(broker.name(), Arc::clone(broker.table())));
            let mut provider = StaticConfigProvider::new(&section.path);
            if let ApplyOutcome::Applied(summary) = provider
                .apply(feed.as_ref())
                .context("unable to apply the static broker config")?
            {
                info!(
                    triggers = summary.upserted,
                    rejected = summary.rejected,
                    "initial broker config loaded"
                );
            }
            Some(tokio::spawn(provider.poll(
                feed,
                Duration::from_millis(section.poll_interval_ms),
                shutdown.child_token(),
            )))
        }
        None => {
            warn!("no static_config section; the broker starts without triggers");
            None
        }
    };

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = wait_for_shutdown_signal().await {
                warn!(err = %err, "unable to listen for shutdown signals, shutting down");
            }
            shutdown.cancel();
        });
    }

    let listener = TcpListener::bind(config.ingress.bind)
        .await
        .with_context(|| format!("unable to bind ingress on {}", config.ingress.bind))?;
    info!(addr = %listener.local_addr()?, "ingress listening");

    let result = broker.run(listener, shutdown.clone()).await;

    shutdown.cancel();
    if let Some(poller) = poller {
        if let Err(err) = poller.await {
            warn!(err = %err, "static config poller panicked");
        }
    }

    result.context("broker did not shut down cleanly")?;
    info!("broker stopped");
    Ok(())
}
