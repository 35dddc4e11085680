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

//! CloudEvents HTTP protocol binding.
//!
//! Binary mode carries context attributes in `ce-*` headers and the payload as the
//! body; structured mode carries the whole envelope as an
//! `application/cloudevents+json` document. Both are accepted on decode, binary
//! mode is used on encode.

use crate::api::event::{EventBuilder, EventEnvelope};
use crate::error::EventFormatError;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{percent_decode, utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{Map, Value};

pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";
const HEADER_PREFIX: &str = "ce-";

/// `ce-*` values escape controls, space, `"`, `%` and everything outside ASCII.
const HEADER_VALUE_ESCAPES: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'%');

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, EventFormatError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|err| EventFormatError::InvalidAttribute {
            attribute: "time".to_string(),
            reason: err.to_string(),
        })
}

/// `true` when the headers announce an event in either binding mode.
pub fn carries_event(headers: &HeaderMap) -> bool {
    let structured = content_type(headers)
        .is_some_and(|content_type| content_type.starts_with(STRUCTURED_CONTENT_TYPE));
    structured || headers.contains_key("ce-id") || headers.contains_key("ce-specversion")
}

/// Decodes an event from an HTTP message in binary or structured mode.
pub fn decode(headers: &HeaderMap, body: Bytes) -> Result<EventEnvelope, EventFormatError> {
    let content_type = content_type(headers);
    if content_type
        .as_deref()
        .is_some_and(|content_type| content_type.starts_with(STRUCTURED_CONTENT_TYPE))
    {
        return decode_structured(&body);
    }
    if !carries_event(headers) {
        return Err(EventFormatError::NotAnEvent(content_type));
    }
    decode_binary(headers, content_type, body)
}

fn decode_binary(
    headers: &HeaderMap,
    content_type: Option<String>,
    body: Bytes,
) -> Result<EventEnvelope, EventFormatError> {
    let mut id = String::new();
    let mut source = String::new();
    let mut ty = String::new();
    let mut specversion = String::new();
    let mut optional: Vec<(String, String)> = Vec::new();

    for (name, value) in headers {
        let Some(attribute) = name.as_str().strip_prefix(HEADER_PREFIX) else {
            continue;
        };
        let value = percent_decode(value.as_bytes())
            .decode_utf8()
            .map_err(|err| EventFormatError::InvalidAttribute {
                attribute: attribute.to_string(),
                reason: err.to_string(),
            })?
            .into_owned();
        match attribute {
            "id" => id = value,
            "source" => source = value,
            "type" => ty = value,
            "specversion" => specversion = value,
            _ => optional.push((attribute.to_string(), value)),
        }
    }

    if specversion.is_empty() {
        return Err(EventFormatError::MissingAttribute("specversion"));
    }

    let mut builder = EventEnvelope::builder(id, source, ty).specversion(specversion);
    for (attribute, value) in optional {
        builder = apply_optional(builder, &attribute, value)?;
    }
    if let Some(content_type) = content_type {
        builder = builder.datacontenttype(content_type);
    }
    if !body.is_empty() {
        builder = builder.data(body);
    }
    builder.build()
}

fn apply_optional(
    builder: EventBuilder,
    attribute: &str,
    value: String,
) -> Result<EventBuilder, EventFormatError> {
    Ok(match attribute {
        "subject" => builder.subject(value),
        "time" => builder.time(parse_time(&value)?),
        "dataschema" | "schemaurl" => builder.dataschema(value),
        "datacontenttype" => builder.datacontenttype(value),
        other => builder.extension(other, value),
    })
}

fn required_str(object: &Map<String, Value>, attribute: &'static str) -> Result<String, EventFormatError> {
    match object.get(attribute) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(EventFormatError::InvalidAttribute {
            attribute: attribute.to_string(),
            reason: "expected a string".to_string(),
        }),
        None => Err(EventFormatError::MissingAttribute(attribute)),
    }
}

fn scalar_to_string(attribute: &str, value: &Value) -> Result<String, EventFormatError> {
    match value {
        Value::String(value) => Ok(value.clone()),
        Value::Bool(value) => Ok(value.to_string()),
        Value::Number(value) => Ok(value.to_string()),
        _ => Err(EventFormatError::InvalidAttribute {
            attribute: attribute.to_string(),
            reason: "expected a scalar value".to_string(),
        }),
    }
}

fn decode_structured(body: &[u8]) -> Result<EventEnvelope, EventFormatError> {
    let document: Value = serde_json::from_slice(body)
        .map_err(|err| EventFormatError::InvalidStructuredBody(err.to_string()))?;
    let Value::Object(object) = document else {
        return Err(EventFormatError::InvalidStructuredBody(
            "expected a JSON object".to_string(),
        ));
    };

    let mut builder = EventEnvelope::builder(
        required_str(&object, "id")?,
        required_str(&object, "source")?,
        required_str(&object, "type")?,
    )
    .specversion(required_str(&object, "specversion")?);

    for (attribute, value) in &object {
        match attribute.as_str() {
            "id" | "source" | "type" | "specversion" => {}
            "data" => {
                let data = match value {
                    Value::Null => continue,
                    Value::String(text) => Bytes::from(text.clone().into_bytes()),
                    other => Bytes::from(
                        serde_json::to_vec(other)
                            .map_err(|err| EventFormatError::InvalidStructuredBody(err.to_string()))?,
                    ),
                };
                builder = builder.data(data);
            }
            "data_base64" => {
                let encoded = scalar_to_string(attribute, value)?;
                let decoded = BASE64.decode(encoded.as_bytes()).map_err(|err| {
                    EventFormatError::InvalidAttribute {
                        attribute: "data_base64".to_string(),
                        reason: err.to_string(),
                    }
                })?;
                builder = builder.data(decoded);
            }
            other => {
                if value.is_null() {
                    continue;
                }
                let value = scalar_to_string(other, value)?;
                builder = apply_optional(builder, other, value)?;
            }
        }
    }

    builder.build()
}

fn header_value(attribute: &str, value: &str) -> Result<HeaderValue, EventFormatError> {
    HeaderValue::from_str(value).map_err(|err| EventFormatError::InvalidAttribute {
        attribute: attribute.to_string(),
        reason: err.to_string(),
    })
}

fn header_name(attribute: &str) -> Result<HeaderName, EventFormatError> {
    HeaderName::from_bytes(format!("{HEADER_PREFIX}{attribute}").as_bytes()).map_err(|err| {
        EventFormatError::InvalidAttribute {
            attribute: attribute.to_string(),
            reason: err.to_string(),
        }
    })
}

/// Encodes an event in binary mode, returning the headers and the body.
pub fn encode_binary(event: &EventEnvelope) -> Result<(HeaderMap, Bytes), EventFormatError> {
    let mut headers = HeaderMap::new();
    let mut put = |attribute: &str, value: &str| -> Result<(), EventFormatError> {
        let encoded = utf8_percent_encode(value, HEADER_VALUE_ESCAPES).to_string();
        headers.insert(header_name(attribute)?, header_value(attribute, &encoded)?);
        Ok(())
    };

    put("id", event.id())?;
    put("source", event.source())?;
    put("type", event.ty())?;
    put("specversion", event.specversion())?;
    if let Some(subject) = event.subject() {
        put("subject", subject)?;
    }
    if let Some(time) = event.time() {
        put("time", &time.to_rfc3339_opts(SecondsFormat::AutoSi, true))?;
    }
    if let Some(schema) = event.dataschema() {
        put("dataschema", schema)?;
    }
    for (name, value) in event.extensions() {
        put(name, value)?;
    }
    if let Some(content_type) = event.datacontenttype() {
        headers.insert(CONTENT_TYPE, header_value("datacontenttype", content_type)?);
    }

    let body = event.data().cloned().unwrap_or_default();
    Ok((headers, body))
}
