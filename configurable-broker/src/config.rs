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

use anyhow::{bail, Context, Result};
use event_broker::{
    BrokerSettings, DispatcherConfig, LifecycleConfig, DEFAULT_BACKGROUND_TASK_LIMIT,
    DEFAULT_DRAIN_TIMEOUT, DEFAULT_REPLY_QUEUE_CAPACITY,
};
use http_delivery_client::{HttpClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngressConfig {
    pub bind: SocketAddr,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleSection {
    pub drain_timeout_secs: u64,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            drain_timeout_secs: DEFAULT_DRAIN_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherSection {
    pub reply_queue_capacity: usize,
    pub background_task_limit: usize,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            reply_queue_capacity: DEFAULT_REPLY_QUEUE_CAPACITY,
            background_task_limit: DEFAULT_BACKGROUND_TASK_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliverySection {
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticConfigSection {
    pub path: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub json: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub ingress: IngressConfig,
    pub lifecycle: LifecycleSection,
    pub dispatcher: DispatcherSection,
    pub delivery: DeliverySection,
    pub static_config: Option<StaticConfigSection>,
    pub logging: LoggingSection,
}

impl Config {
    /// Reads a json5 config file. A relative static config path is resolved
    /// against the directory of `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let mut config: Config = json5::from_str(&data)
            .with_context(|| format!("unable to parse config file {}", path.display()))?;

        if let Some(section) = config.static_config.as_mut() {
            if section.path.is_relative() {
                if let Some(dir) = path.parent() {
                    section.path = dir.join(&section.path);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.dispatcher.reply_queue_capacity == 0 {
            bail!("dispatcher.reply_queue_capacity must be at least 1");
        }
        if self.dispatcher.background_task_limit == 0 {
            bail!("dispatcher.background_task_limit must be at least 1");
        }
        if self.delivery.request_timeout_ms == 0 {
            bail!("delivery.request_timeout_ms must be at least 1");
        }
        if matches!(&self.static_config, Some(section) if section.poll_interval_ms == 0) {
            bail!("static_config.poll_interval_ms must be at least 1");
        }
        Ok(())
    }

    pub fn broker_settings(&self) -> BrokerSettings {
        BrokerSettings {
            dispatcher: DispatcherConfig {
                reply_queue_capacity: self.dispatcher.reply_queue_capacity,
                background_task_limit: self.dispatcher.background_task_limit,
            },
            lifecycle: LifecycleConfig {
                drain_timeout: Duration::from_secs(self.lifecycle.drain_timeout_secs),
            },
        }
    }

    pub fn http_client(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: Duration::from_millis(self.delivery.request_timeout_ms),
            connect_timeout: Duration::from_millis(self.delivery.connect_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHIPPED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/DEFAULT_CONFIG.json5");

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("broker.json5");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn shipped_config_loads_and_points_at_an_existing_file() {
        let config = Config::load(Path::new(SHIPPED)).unwrap();

        assert_eq!(config.ingress.bind.port(), 8080);
        assert_eq!(
            config.broker_settings().lifecycle.drain_timeout,
            Duration::from_secs(900)
        );
        let section = config.static_config.expect("static config configured");
        assert!(section.path.is_file(), "{}", section.path.display());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&write(&dir, "{}")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(
            config.broker_settings().dispatcher,
            DispatcherConfig::default()
        );
        assert_eq!(config.http_client(), HttpClientConfig::default());
        assert!(config.static_config.is_none());
    }

    #[test]
    fn relative_static_path_resolves_next_to_the_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&write(
            &dir,
            "{ static_config: { path: 'broker.json' } }",
        ))
        .unwrap();

        let section = config.static_config.unwrap();
        assert_eq!(section.path, dir.path().join("broker.json"));
        assert_eq!(section.poll_interval_ms, 5_000);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let dir = TempDir::new().unwrap();
        for body in [
            "{ ingress: { bind: 'not an address' } }",
            "{ unknown: 1 }",
            "{ dispatcher: { reply_queue_capacity: 0 } }",
            "{ static_config: { path: 'x', poll_interval_ms: 0 } }",
        ] {
            assert!(Config::load(&write(&dir, body)).is_err(), "{body}");
        }
    }
}
