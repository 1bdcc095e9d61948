//! Demo resources in the shape of a small survey API: polls, their choices,
//! and authors. This module exists to exercise the restkit core end to end
//! and carries the integration fixtures its tests (and anyone learning the
//! API) build on.

use std::sync::Arc;

use restkit::{
    relation, Attribute, Environment, Operation, ResourceType, ResourceTypeBuilder,
};
use serde_json::json;

pub mod connectors;
pub mod store;

use connectors::ModelConnector;
use store::{MemoryStore, Record};

pub const FIRST_QUESTION: &str = "Are you an innie or an outie?";
pub const LAST_QUESTION: &str = "What one question would you add to this survey?";

/// Environment with link-time connectors discovered and the stock codecs
/// installed.
pub fn build_environment() -> Environment {
    let env = Environment::new();
    restkit_codecs::register_defaults(&env.codecs);
    env
}

/// One hundred polls; the first and last carry fixed questions, the rest
/// are filler.
pub fn poll_store() -> Arc<MemoryStore> {
    let author = Arc::new(
        Record::new()
            .set("id", json!(1))
            .set("name", json!("sam")),
    );

    let mut records = Vec::with_capacity(100);
    for id in 1..=100u32 {
        let question = match id {
            1 => FIRST_QUESTION.to_string(),
            100 => LAST_QUESTION.to_string(),
            other => format!("Question #{other}?"),
        };
        let choices = vec![
            Arc::new(
                Record::new()
                    .set("id", json!(id * 10 + 1))
                    .set("text", json!("yes")),
            ),
            Arc::new(
                Record::new()
                    .set("id", json!(id * 10 + 2))
                    .set("text", json!("no")),
            ),
        ];
        records.push(Arc::new(
            Record::new()
                .set("id", json!(id))
                .set("question", json!(question))
                .link("author", Arc::clone(&author))
                .related("choices", choices),
        ));
    }
    Arc::new(MemoryStore::new(records))
}

/// The read-only poll resource over the given store.
pub fn register_poll(
    env: &Environment,
    store: Arc<MemoryStore>,
) -> Result<Arc<ResourceType>, restkit::ConfigError> {
    env.connectors
        .register(Arc::new(ModelConnector::new("poll-model", store)));

    ResourceTypeBuilder::new("poll")
        .configure(|decl| {
            decl.connectors(["http", "poll-model"])
                .operations([Operation::Read])
                .field("id")
                .field("question")
                .attribute("choices", Attribute::collection("choices"))
                .attribute(
                    "author",
                    Attribute::new("author").with_relation(relation("author").local()),
                )
        })
        .build(env)
}

/// The author resource; typically registered after `poll`, which is what
/// makes its lazily resolved relation interesting.
pub fn register_author(env: &Environment) -> Result<Arc<ResourceType>, restkit::ConfigError> {
    ResourceTypeBuilder::new("author")
        .configure(|decl| {
            decl.connectors(["http"])
                .operations([Operation::Read])
                .field("id")
                .field("name")
        })
        .build(env)
}
