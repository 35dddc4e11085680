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

//! File-backed configuration feed.
//!
//! Reads one broker object and its triggers from a JSON document and pushes them
//! through a [`ConfigFeed`], re-reading the file on an interval.

use event_broker::{BrokerSpec, ConfigFeed, TriggerSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StaticConfigError {
    #[error("unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("broker name must not be empty in {}", .0.display())]
    MissingBrokerName(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerObject {
    pub name: String,
    #[serde(flatten)]
    pub spec: BrokerSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerObject {
    pub name: String,
    #[serde(flatten)]
    pub spec: TriggerSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticBrokerConfig {
    pub broker: BrokerObject,
    #[serde(default)]
    pub triggers: Vec<TriggerObject>,
}

/// Reads and parses a static broker configuration.
///
/// Triggers that do not name a broker are bound to the document's broker.
pub fn load(path: &Path) -> Result<StaticBrokerConfig, StaticConfigError> {
    let data = fs::read_to_string(path).map_err(|source| StaticConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: StaticBrokerConfig =
        serde_json::from_str(&data).map_err(|source| StaticConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if config.broker.name.is_empty() {
        return Err(StaticConfigError::MissingBrokerName(path.to_path_buf()));
    }
    for trigger in &mut config.triggers {
        trigger
            .spec
            .broker
            .get_or_insert_with(|| config.broker.name.clone());
    }
    Ok(config)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub upserted: usize,
    pub removed: usize,
    pub rejected: usize,
}

/// What one [`StaticConfigProvider::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The document has not changed since the last apply.
    Unchanged,
    Applied(ApplySummary),
}

/// Tracks the last applied document so removals can be derived.
#[derive(Debug)]
pub struct StaticConfigProvider {
    path: PathBuf,
    last: Option<StaticBrokerConfig>,
}

impl StaticConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file and pushes any difference through `feed`.
    ///
    /// Objects rejected by the feed are logged and skipped; the rest of the
    /// document is still applied.
    pub fn apply(&mut self, feed: &dyn ConfigFeed) -> Result<ApplyOutcome, StaticConfigError> {
        let config = load(&self.path)?;
        if self.last.as_ref() == Some(&config) {
            return Ok(ApplyOutcome::Unchanged);
        }

        let mut summary = ApplySummary::default();

        if let Err(err) = feed.on_config_update(&config.broker.spec) {
            warn!(
                path = %self.path.display(),
                broker = config.broker.name.as_str(),
                err = %err,
                "broker config rejected"
            );
            summary.rejected += 1;
        }

        let mut current = BTreeSet::new();
        for trigger in &config.triggers {
            current.insert(trigger.name.as_str());
            match feed.on_trigger_upsert(&trigger.name, &trigger.spec) {
                Ok(()) => summary.upserted += 1,
                Err(err) => {
                    warn!(
                        path = %self.path.display(),
                        trigger = trigger.name.as_str(),
                        err = %err,
                        "trigger rejected"
                    );
                    summary.rejected += 1;
                }
            }
        }

        if let Some(last) = &self.last {
            for stale in last
                .triggers
                .iter()
                .filter(|trigger| !current.contains(trigger.name.as_str()))
            {
                match feed.on_trigger_remove(&stale.name) {
                    Ok(()) => summary.removed += 1,
                    Err(err) => warn!(
                        path = %self.path.display(),
                        trigger = stale.name.as_str(),
                        err = %err,
                        "trigger removal failed"
                    ),
                }
            }
        }

        info!(
            path = %self.path.display(),
            broker = config.broker.name.as_str(),
            upserted = summary.upserted,
            removed = summary.removed,
            rejected = summary.rejected,
            "static broker config applied"
        );
        self.last = Some(config);
        Ok(ApplyOutcome::Applied(summary))
    }

    /// Applies the file every `interval` until `cancel` fires. Read and parse
    /// failures are logged and the previous state keeps serving.
    pub async fn poll(
        mut self,
        feed: Arc<dyn ConfigFeed>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            match self.apply(feed.as_ref()) {
                Ok(ApplyOutcome::Unchanged) => {
                    debug!(path = %self.path.display(), "static broker config unchanged")
                }
                Ok(ApplyOutcome::Applied(_)) => {}
                Err(err) => warn!(err = %err, "static broker config poll failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        debug!(path = %self.path.display(), "static broker config polling stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_broker::{BackoffPolicy, TableFeed, TriggerTable};
    use tempfile::NamedTempFile;

    const TESTDATA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static-configs/default-broker.json");

    fn write(file: &NamedTempFile, body: &str) {
        fs::write(file.path(), body).unwrap();
    }

    fn feed(broker: &str) -> (Arc<TableFeed>, Arc<TriggerTable>) {
        let table = Arc::new(TriggerTable::new());
        (Arc::new(TableFeed::new(broker, table.clone())), table)
    }

    #[test]
    fn load_binds_unscoped_triggers_to_the_document_broker() {
        let config = load(Path::new(TESTDATA)).expect("testdata loads");

        assert_eq!(config.broker.name, "default");
        assert_eq!(config.triggers.len(), 2);
        assert!(config
            .triggers
            .iter()
            .all(|trigger| trigger.spec.broker.as_deref() == Some("default")));
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        assert!(matches!(
            load(Path::new("does/not/exist.json")),
            Err(StaticConfigError::Read { .. })
        ));

        let file = NamedTempFile::new().unwrap();
        write(&file, "{ not json");
        assert!(matches!(
            load(file.path()),
            Err(StaticConfigError::Parse { .. })
        ));

        write(&file, r#"{"broker":{"name":""}}"#);
        assert!(matches!(
            load(file.path()),
            Err(StaticConfigError::MissingBrokerName(_))
        ));
    }

    #[test]
    fn apply_pushes_config_and_triggers() {
        let (feed, table) = feed("default");
        let mut provider = StaticConfigProvider::new(TESTDATA);

        let outcome = provider.apply(feed.as_ref()).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Applied(ApplySummary {
                upserted: 2,
                removed: 0,
                rejected: 0
            })
        );

        let snapshot = table.snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.config().backoff_policy,
            Some(BackoffPolicy::Exponential)
        );
        assert_eq!(snapshot.config().retry_count, Some(3));
        assert!(snapshot.config().dead_letter_sink.is_some());

        assert_eq!(
            provider.apply(feed.as_ref()).unwrap(),
            ApplyOutcome::Unchanged
        );
    }

    #[test]
    fn apply_removes_triggers_dropped_from_the_file() {
        let (feed, table) = feed("default");
        let file = NamedTempFile::new().unwrap();
        write(
            &file,
            r#"{"broker":{"name":"default"},"triggers":[
                {"name":"a","subscriberUri":"http://a.example"},
                {"name":"b","subscriberUri":"http://b.example"}]}"#,
        );
        let mut provider = StaticConfigProvider::new(file.path());
        provider.apply(feed.as_ref()).unwrap();
        assert_eq!(table.snapshot().unwrap().len(), 2);

        write(
            &file,
            r#"{"broker":{"name":"default"},"triggers":[
                {"name":"b","subscriberUri":"http://b.example"},
                {"name":"c","subscriberUri":"not-a-uri"}]}"#,
        );
        let outcome = provider.apply(feed.as_ref()).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Applied(ApplySummary {
                upserted: 1,
                removed: 1,
                rejected: 1
            })
        );

        let snapshot = table.snapshot().unwrap();
        let names: Vec<_> = snapshot.triggers().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[tokio::test]
    async fn poll_picks_up_changes_until_canceled() {
        let (feed, table) = feed("default");
        let file = NamedTempFile::new().unwrap();
        write(&file, r#"{"broker":{"name":"default"}}"#);

        let cancel = CancellationToken::new();
        let polling = tokio::spawn(StaticConfigProvider::new(file.path()).poll(
            feed,
            Duration::from_millis(10),
            cancel.clone(),
        ));

        write(
            &file,
            r#"{"broker":{"name":"default"},"triggers":[{"name":"a","subscriberUri":"http://a.example"}]}"#,
        );
        let mut found = false;
        for _ in 0..200 {
            if table.snapshot().unwrap().len() == 1 {
                found = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(found, "poll never applied the updated file");

        cancel.cancel();
        polling.await.unwrap();
    }
}
