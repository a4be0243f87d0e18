use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::{
    events::{EventSink, IdentityResolver, NotFound, RevisionId, RevisionStore},
    mentions::IdentityResult,
    signature::{NamespaceAliases, SignatureResolver, TimestampMatcher},
};

pub mod prelude {
    pub(crate) use super::{
        english_resolver, signed_message, InMemoryStore, MapIdentityResolver, RecordingSink, TS,
    };
}

/// Timestamp used in all signed test lines.
pub const TS: &str = "00:17, 7 May 2013 (UTC)";

pub fn english_resolver() -> SignatureResolver {
    SignatureResolver::new(
        TimestampMatcher::from_exemplar(TS).unwrap(),
        NamespaceAliases::english(),
    )
}

/// A one-line comment `foo` signed by `user`.
pub fn signed_message(user: &str) -> String {
    format!(": foo [[User:{user}|{user}]] ([[User talk:{user}|talk]]) {TS}")
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    texts: FxHashMap<RevisionId, String>,
}

impl InMemoryStore {
    pub fn with(mut self, revision: RevisionId, text: impl Into<String>) -> Self {
        self.texts.insert(revision, text.into());
        self
    }
}

impl RevisionStore for InMemoryStore {
    fn get_text(&self, revision: RevisionId) -> Result<String, NotFound> {
        self.texts.get(&revision).cloned().ok_or(NotFound(revision))
    }
}

/// Resolves the names it was given, everything else is unknown.
#[derive(Debug, Default)]
pub struct MapIdentityResolver {
    identities: FxHashMap<String, IdentityResult>,
}

impl MapIdentityResolver {
    pub fn with(mut self, name: &str, identity: IdentityResult) -> Self {
        self.identities.insert(name.to_string(), identity);
        self
    }
}

impl IdentityResolver for MapIdentityResolver {
    fn resolve(&self, name: &str) -> IdentityResult {
        self.identities
            .get(name)
            .cloned()
            .unwrap_or(IdentityResult::Unknown)
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<(String, Map<String, Value>)>,
}

impl RecordingSink {
    pub fn of_type(&self, event_type: &str) -> Vec<&Map<String, Value>> {
        self.events
            .iter()
            .filter(|(t, _)| t == event_type)
            .map(|(_, fields)| fields)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event_type: &str, fields: Map<String, Value>) {
        self.events.push((event_type.to_string(), fields));
    }
}
