//! In-memory persistence collaborator used by the demo resources.
//!
//! A [`Record`] is a flat value map plus optional one-to-one links and
//! one-to-many related sets; it implements the core `Host` seam so the
//! field resolver can traverse it. [`MemoryStore`] implements `Queryable`
//! over a fixed record set.

use std::collections::BTreeMap;
use std::sync::Arc;

use restkit::{Host, HostValue, Queryable};
use serde_json::Value;

#[derive(Default)]
pub struct Record {
    values: BTreeMap<String, Value>,
    links: BTreeMap<String, Arc<Record>>,
    related: BTreeMap<String, Vec<Arc<Record>>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn link(mut self, key: impl Into<String>, target: Arc<Record>) -> Self {
        self.links.insert(key.into(), target);
        self
    }

    pub fn related(mut self, key: impl Into<String>, targets: Vec<Arc<Record>>) -> Self {
        self.related.insert(key.into(), targets);
        self
    }

    /// Walk a dotted path through values and links, rendering the leaf.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        let mut record = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                return record.values.get(segment).cloned();
            }
            record = record.links.get(segment)?.as_ref();
        }
        None
    }

    fn text_at(&self, path: &str) -> Option<String> {
        self.value_at(path).map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

impl Host for Record {
    fn member(&self, name: &str) -> Option<HostValue> {
        self.links
            .get(name)
            .map(|record| HostValue::Object(Arc::clone(record) as Arc<dyn Host>))
    }

    fn index(&self, key: &str) -> Option<HostValue> {
        self.values.get(key).cloned().map(HostValue::Scalar)
    }

    fn collection(&self, name: &str) -> Option<Vec<HostValue>> {
        self.related.get(name).map(|records| {
            records
                .iter()
                .map(|record| HostValue::Object(Arc::clone(record) as Arc<dyn Host>))
                .collect()
        })
    }

    fn repr(&self) -> Value {
        self.values.get("id").cloned().unwrap_or(Value::Null)
    }
}

pub struct MemoryStore {
    records: Vec<Arc<Record>>,
}

impl MemoryStore {
    pub fn new(records: Vec<Arc<Record>>) -> Self {
        MemoryStore { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Queryable for MemoryStore {
    fn all(&self) -> Vec<Arc<dyn Host>> {
        self.records
            .iter()
            .map(|record| Arc::clone(record) as Arc<dyn Host>)
            .collect()
    }

    fn find_by(&self, path: &str, value: &str) -> Option<Arc<dyn Host>> {
        self.records
            .iter()
            .find(|record| record.text_at(path).as_deref() == Some(value))
            .map(|record| Arc::clone(record) as Arc<dyn Host>)
    }

    fn filter_by(&self, path: &str, values: &[String]) -> Vec<Arc<dyn Host>> {
        self.records
            .iter()
            .filter(|record| {
                record
                    .text_at(path)
                    .map(|text| values.contains(&text))
                    .unwrap_or(false)
            })
            .map(|record| Arc::clone(record) as Arc<dyn Host>)
            .collect()
    }
}
