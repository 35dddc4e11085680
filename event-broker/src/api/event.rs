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

//! The immutable event envelope routed by the broker.

use crate::error::EventFormatError;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

pub const SPEC_VERSION_V1: &str = "1.0";
pub const SPEC_VERSION_V03: &str = "0.3";

/// An event as seen by the broker: the fixed context attributes, the open set of
/// extension attributes and an opaque payload.
///
/// Envelopes are only created through [`EventBuilder`] and never mutated afterwards,
/// so a single instance can be shared across concurrent per-trigger deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    id: String,
    source: String,
    ty: String,
    specversion: String,
    subject: Option<String>,
    time: Option<DateTime<Utc>>,
    datacontenttype: Option<String>,
    dataschema: Option<String>,
    extensions: BTreeMap<String, String>,
    data: Option<Bytes>,
}

impl EventEnvelope {
    /// Starts a `1.0` envelope with the three attributes every event needs.
    pub fn builder(
        id: impl Into<String>,
        source: impl Into<String>,
        ty: impl Into<String>,
    ) -> EventBuilder {
        EventBuilder {
            id: id.into(),
            source: source.into(),
            ty: ty.into(),
            specversion: SPEC_VERSION_V1.to_string(),
            subject: None,
            time: None,
            datacontenttype: None,
            dataschema: None,
            extensions: BTreeMap::new(),
            data: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn specversion(&self) -> &str {
        &self.specversion
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn datacontenttype(&self) -> Option<&str> {
        self.datacontenttype.as_deref()
    }

    /// Content type without its parameters, lower-cased.
    pub fn datamediatype(&self) -> Option<String> {
        self.datacontenttype.as_deref().map(|content_type| {
            content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    pub fn dataschema(&self) -> Option<&str> {
        self.dataschema.as_deref()
    }

    pub fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extensions
    }

    pub fn extension(&self, name: &str) -> Option<&str> {
        self.extensions.get(name).map(String::as_str)
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    /// Resolves an attribute by its lower-case name.
    ///
    /// Standard context attributes are looked up first, anything else is treated as
    /// an extension. `None` means the event does not carry the attribute.
    pub fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "specversion" => Some(Cow::Borrowed(self.specversion.as_str())),
            "type" => Some(Cow::Borrowed(self.ty.as_str())),
            "source" => Some(Cow::Borrowed(self.source.as_str())),
            "id" => Some(Cow::Borrowed(self.id.as_str())),
            "subject" => self.subject.as_deref().map(Cow::Borrowed),
            "time" => self
                .time
                .map(|time| Cow::Owned(time.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
            "dataschema" | "schemaurl" => self.dataschema.as_deref().map(Cow::Borrowed),
            "datacontenttype" => self.datacontenttype.as_deref().map(Cow::Borrowed),
            "datamediatype" => self.datamediatype().map(Cow::Owned),
            other => self.extension(other).map(Cow::Borrowed),
        }
    }
}

impl Display for EventEnvelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event[id: {}, source: {}, type: {}, specversion: {}",
            self.id, self.source, self.ty, self.specversion
        )?;
        if let Some(subject) = &self.subject {
            write!(f, ", subject: {subject}")?;
        }
        for (name, value) in &self.extensions {
            write!(f, ", {name}: {value}")?;
        }
        let data_len = self.data.as_ref().map(Bytes::len).unwrap_or_default();
        write!(f, ", data: {data_len} bytes]")
    }
}

/// Builder for [`EventEnvelope`]; validation happens in [`EventBuilder::build`].
#[derive(Debug, Clone)]
pub struct EventBuilder {
    id: String,
    source: String,
    ty: String,
    specversion: String,
    subject: Option<String>,
    time: Option<DateTime<Utc>>,
    datacontenttype: Option<String>,
    dataschema: Option<String>,
    extensions: BTreeMap<String, String>,
    data: Option<Bytes>,
}

impl EventBuilder {
    pub fn specversion(mut self, specversion: impl Into<String>) -> Self {
        self.specversion = specversion.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn datacontenttype(mut self, content_type: impl Into<String>) -> Self {
        self.datacontenttype = Some(content_type.into());
        self
    }

    pub fn dataschema(mut self, schema: impl Into<String>) -> Self {
        self.dataschema = Some(schema.into());
        self
    }

    /// Extension names are case-insensitive and stored lower-cased.
    pub fn extension(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.extensions
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn build(self) -> Result<EventEnvelope, EventFormatError> {
        if self.id.is_empty() {
            return Err(EventFormatError::MissingAttribute("id"));
        }
        if self.source.is_empty() {
            return Err(EventFormatError::MissingAttribute("source"));
        }
        if self.ty.is_empty() {
            return Err(EventFormatError::MissingAttribute("type"));
        }
        match self.specversion.as_str() {
            SPEC_VERSION_V1 | SPEC_VERSION_V03 => {}
            "" => return Err(EventFormatError::MissingAttribute("specversion")),
            other => return Err(EventFormatError::UnsupportedSpecVersion(other.to_string())),
        }
        if let Some(name) = self
            .extensions
            .keys()
            .find(|name| name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(EventFormatError::InvalidAttribute {
                attribute: name.clone(),
                reason: "extension names must be non-empty and alphanumeric".to_string(),
            });
        }

        Ok(EventEnvelope {
            id: self.id,
            source: self.source,
            ty: self.ty,
            specversion: self.specversion,
            subject: self.subject,
            time: self.time,
            datacontenttype: self.datacontenttype,
            dataschema: self.dataschema,
            extensions: self.extensions,
            data: self.data,
        })
    }
}
