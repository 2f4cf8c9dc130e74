//! Remote-resource interface
//!
//! The request cache never talks to a concrete transport. It consumes a
//! [`ResourceClient`]: one async `request` call over a method/target/body
//! descriptor, returning opaque JSON. Swapping persistence backends (a real
//! HTTP API, a local key-value fallback, a test double) requires no cache or
//! router changes.
//!
//! [`MemoryClient`] is the bundled backend: JSON record collections held in
//! memory with CRUD semantics, useful for tests and offline fallbacks.

use crate::error::RequestError;
use futures::future::LocalBoxFuture;
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Description of one remote-resource request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Target path, e.g. "/channels" or "/channels/3"
    pub target: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(target: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            target: target.into(),
            body: None,
        }
    }

    pub fn post(target: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            target: target.into(),
            body: Some(body),
        }
    }

    pub fn put(target: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            target: target.into(),
            body: Some(body),
        }
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            target: target.into(),
            body: None,
        }
    }
}

/// Asynchronous access to a remote resource
///
/// Implementations resolve a [`RequestDescriptor`] to opaque JSON. Failures
/// are values, never panics, so they can cross the cache boundary as typed
/// results. Timeouts are the implementation's responsibility.
pub trait ResourceClient {
    fn request(&self, descriptor: RequestDescriptor) -> LocalBoxFuture<'_, Result<Value, RequestError>>;
}

// ============================================================================
// MemoryClient
// ============================================================================

/// In-memory JSON-backed resource client
///
/// Collections of records addressed as `/collection` and `/collection/id`.
/// Records are JSON objects; a POST without an `id` field gets one assigned
/// from a counter. PUT merges the body's top-level fields into the record.
pub struct MemoryClient {
    collections: RefCell<HashMap<String, Vec<Value>>>,
    next_id: Cell<u64>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            collections: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Seed a collection with records
    pub fn with_collection(self, name: impl Into<String>, records: Vec<Value>) -> Self {
        self.collections.borrow_mut().insert(name.into(), records);
        self
    }

    /// Number of records in a collection
    pub fn collection_len(&self, name: &str) -> usize {
        self.collections
            .borrow()
            .get(name)
            .map_or(0, |records| records.len())
    }

    fn handle(&self, descriptor: RequestDescriptor) -> Result<Value, RequestError> {
        let (collection, id) = parse_target(&descriptor.target)?;

        match (descriptor.method, id) {
            (Method::Get, None) => {
                let collections = self.collections.borrow();
                let records = collections.get(&collection).cloned().unwrap_or_default();
                Ok(Value::Array(records))
            }
            (Method::Get, Some(id)) => {
                let collections = self.collections.borrow();
                collections
                    .get(&collection)
                    .and_then(|records| records.iter().find(|r| id_matches(r, &id)))
                    .cloned()
                    .ok_or_else(|| RequestError::NotFound(descriptor.target.clone()))
            }
            (Method::Post, None) => {
                let mut record = as_object(descriptor.body)?;
                if !record.contains_key("id") {
                    let id = self.next_id.get();
                    self.next_id.set(id + 1);
                    record.insert("id".to_string(), json!(id.to_string()));
                }
                let record = Value::Object(record);
                self.collections
                    .borrow_mut()
                    .entry(collection)
                    .or_default()
                    .push(record.clone());
                Ok(record)
            }
            (Method::Put, Some(id)) => {
                let patch = as_object(descriptor.body)?;
                let mut collections = self.collections.borrow_mut();
                let record = collections
                    .get_mut(&collection)
                    .and_then(|records| records.iter_mut().find(|r| id_matches(r, &id)))
                    .ok_or_else(|| RequestError::NotFound(descriptor.target.clone()))?;

                if let Value::Object(fields) = record {
                    for (key, value) in patch {
                        fields.insert(key, value);
                    }
                }
                Ok(record.clone())
            }
            (Method::Delete, Some(id)) => {
                let mut collections = self.collections.borrow_mut();
                let records = collections
                    .get_mut(&collection)
                    .ok_or_else(|| RequestError::NotFound(descriptor.target.clone()))?;

                let before = records.len();
                records.retain(|r| !id_matches(r, &id));
                if records.len() == before {
                    return Err(RequestError::NotFound(descriptor.target.clone()));
                }
                Ok(json!({ "success": true }))
            }
            _ => Err(RequestError::Request(format!(
                "unsupported request: {:?} {}",
                descriptor.method, descriptor.target
            ))),
        }
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceClient for MemoryClient {
    fn request(&self, descriptor: RequestDescriptor) -> LocalBoxFuture<'_, Result<Value, RequestError>> {
        let result = self.handle(descriptor);
        Box::pin(std::future::ready(result))
    }
}

/// Split "/collection/id?query" into collection and optional id
fn parse_target(target: &str) -> Result<(String, Option<String>), RequestError> {
    let path = target.split('?').next().unwrap_or(target);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [collection] => Ok(((*collection).to_string(), None)),
        [collection, id] => Ok(((*collection).to_string(), Some((*id).to_string()))),
        _ => Err(RequestError::Request(format!(
            "malformed target: '{}'",
            target
        ))),
    }
}

fn as_object(body: Option<Value>) -> Result<Map<String, Value>, RequestError> {
    match body {
        Some(Value::Object(map)) => Ok(map),
        other => Err(RequestError::InvalidBody(format!(
            "expected a JSON object, got {:?}",
            other
        ))),
    }
}

fn id_matches(record: &Value, id: &str) -> bool {
    match record.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}
