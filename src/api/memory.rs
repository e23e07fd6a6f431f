//! In-memory backend
//!
//! Serves page data from a JSON fixture keyed by path and behaves like the
//! REST collections for admin CRUD:
//!
//! | Request                     | Effect                                   |
//! |-----------------------------|------------------------------------------|
//! | `GET path`                  | value stored under `path`                |
//! | `GET coll/<id>`             | item of array `coll` whose `id` matches  |
//! | `POST coll`                 | append, assigning the next numeric `id`  |
//! | `PUT coll/<id>`             | replace the matching item (keeps `id`)   |
//! | `DELETE coll/<id>`          | remove the matching item                 |

use super::{Api, ApiFuture, FetchError};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct Inner {
    resources: BTreeMap<String, Value>,
    failures: HashMap<String, String>,
    requests: Vec<String>,
}

/// Clones share the same data
#[derive(Clone, Default)]
pub struct MemoryApi {
    inner: Rc<RefCell<Inner>>,
    latency: Duration,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a fixture object: `{ "pages/home": {...}, "admin/ministries": [...] }`
    pub fn from_fixture(fixture: Value) -> Result<Self, FetchError> {
        let Value::Object(entries) = fixture else {
            return Err(FetchError::Decode(
                "fixture must be a JSON object keyed by path".to_string(),
            ));
        };
        let api = Self::new();
        for (path, value) in entries {
            api.insert(&path, value);
        }
        Ok(api)
    }

    /// Delay every response by `latency` (tokio time, so tests can pause it)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn insert(&self, path: &str, value: Value) {
        self.inner
            .borrow_mut()
            .resources
            .insert(normalize(path), value);
    }

    /// Current value stored under `path`
    pub fn resource(&self, path: &str) -> Option<Value> {
        self.inner.borrow().resources.get(&normalize(path)).cloned()
    }

    /// Make every request whose path starts with `prefix` fail with
    /// `success: false` and `message`
    pub fn fail(&self, prefix: &str, message: &str) {
        self.inner
            .borrow_mut()
            .failures
            .insert(normalize(prefix), message.to_string());
    }

    pub fn clear_failures(&self) {
        self.inner.borrow_mut().failures.clear();
    }

    /// Requests served so far, as `"METHOD path"`
    pub fn requests(&self) -> Vec<String> {
        self.inner.borrow().requests.clone()
    }

    fn respond(&self, method: &'static str, path: &str, body: Option<Value>) -> ApiFuture {
        let inner = self.inner.clone();
        let latency = self.latency;
        let path = normalize(path);

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let mut inner = inner.borrow_mut();
            inner.requests.push(format!("{} {}", method, path));

            let failure = inner
                .failures
                .iter()
                .find(|(prefix, _)| path.starts_with(prefix.as_str()))
                .map(|(_, message)| message.clone());
            if let Some(message) = failure {
                return Err(FetchError::Rejected { message });
            }

            match (method, body) {
                ("GET", _) => inner.get(&path),
                ("POST", Some(body)) => inner.create(&path, body),
                ("PUT", Some(body)) => inner.update(&path, body),
                ("DELETE", _) => inner.remove(&path),
                _ => Err(FetchError::Status {
                    status: 400,
                    message: format!("{} {} needs a body", method, path),
                }),
            }
        }
        .boxed_local()
    }
}

impl Api for MemoryApi {
    fn get(&self, path: &str) -> ApiFuture {
        self.respond("GET", path, None)
    }

    fn post(&self, path: &str, body: Value) -> ApiFuture {
        self.respond("POST", path, Some(body))
    }

    fn put(&self, path: &str, body: Value) -> ApiFuture {
        self.respond("PUT", path, Some(body))
    }

    fn delete(&self, path: &str) -> ApiFuture {
        self.respond("DELETE", path, None)
    }
}

impl Inner {
    fn get(&self, path: &str) -> Result<Value, FetchError> {
        if let Some(value) = self.resources.get(path) {
            return Ok(value.clone());
        }
        let (collection, id) = split_item(path).ok_or_else(|| not_found(path))?;
        self.items(collection)
            .and_then(|items| items.iter().find(|item| has_id(item, id)))
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn create(&mut self, collection: &str, body: Value) -> Result<Value, FetchError> {
        let Value::Object(mut item) = body else {
            return Err(bad_request("body must be an object"));
        };
        let items = match self
            .resources
            .entry(collection.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => items,
            _ => return Err(bad_request("not a collection")),
        };

        let missing_id = item.get("id").map_or(true, |id| id.is_null() || id == "");
        if missing_id {
            let next = items
                .iter()
                .filter_map(|i| i.get("id").and_then(Value::as_u64))
                .max()
                .unwrap_or(0)
                + 1;
            item.insert("id".to_string(), Value::from(next));
        }

        let item = Value::Object(item);
        items.push(item.clone());
        Ok(item)
    }

    fn update(&mut self, path: &str, body: Value) -> Result<Value, FetchError> {
        let Value::Object(fields) = body else {
            return Err(bad_request("body must be an object"));
        };
        let (collection, id) = split_item(path).ok_or_else(|| not_found(path))?;
        let item = self
            .items_mut(collection)
            .and_then(|items| items.iter_mut().find(|item| has_id(item, id)))
            .ok_or_else(|| not_found(path))?;

        let kept_id = item.get("id").cloned().unwrap_or(Value::Null);
        let mut replacement: Map<String, Value> = fields;
        replacement.insert("id".to_string(), kept_id);
        *item = Value::Object(replacement);
        Ok(item.clone())
    }

    fn remove(&mut self, path: &str) -> Result<Value, FetchError> {
        let (collection, id) = split_item(path).ok_or_else(|| not_found(path))?;
        let items = self.items_mut(collection).ok_or_else(|| not_found(path))?;
        let before = items.len();
        items.retain(|item| !has_id(item, id));
        if items.len() == before {
            return Err(not_found(path));
        }
        Ok(Value::Null)
    }

    fn items(&self, collection: &str) -> Option<&Vec<Value>> {
        self.resources.get(collection).and_then(Value::as_array)
    }

    fn items_mut(&mut self, collection: &str) -> Option<&mut Vec<Value>> {
        self.resources
            .get_mut(collection)
            .and_then(Value::as_array_mut)
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn split_item(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once('/').filter(|(c, id)| !c.is_empty() && !id.is_empty())
}

fn has_id(item: &Value, id: &str) -> bool {
    match item.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

fn not_found(path: &str) -> FetchError {
    FetchError::Status {
        status: 404,
        message: format!("Not found: {}", path),
    }
}

fn bad_request(message: &str) -> FetchError {
    FetchError::Status {
        status: 400,
        message: message.to_string(),
    }
}
