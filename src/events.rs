use std::sync::{Arc, Mutex, PoisonError};

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value};

use crate::{
    config::Config,
    interpret::{Annotation, DiffInterpreter},
    line_diff::ChangeSet,
    mentions::{classify, overall_count, IdentityResult, LinkExtractor, MentionResult, UserId},
    sections::strip_header,
    signature::{canonical_username, SignatureResolver},
};

pub type RevisionId = u64;

/// Namespace number of user talk pages.
pub const NS_USER_TALK: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("revision {0} not found")]
pub struct NotFound(pub RevisionId);

pub trait RevisionStore {
    fn get_text(&self, revision: RevisionId) -> Result<String, NotFound>;
}

pub trait IdentityResolver {
    fn resolve(&self, name: &str) -> IdentityResult;
}

pub trait EventSink {
    fn emit(&mut self, event_type: &str, fields: Map<String, Value>);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageTitle {
    pub namespace: i32,
    /// Title without the namespace prefix.
    pub text: CompactString,
}

impl PageTitle {
    /// Name of the user whose talk page this is. Subpages have no owner.
    pub fn user_talk_owner(&self) -> Option<&str> {
        if self.namespace == NS_USER_TALK && !self.text.contains('/') {
            Some(&self.text)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Agent {
    pub id: UserId,
    pub name: CompactString,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionInfo {
    pub id: RevisionId,
    /// `None` for the first revision of a page.
    pub parent_id: Option<RevisionId>,
    pub page: PageTitle,
    pub agent: Agent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: &'static str,
    pub fields: Map<String, Value>,
}

impl Event {
    fn new(event_type: &'static str, revision: &RevisionInfo, fields: Value) -> Self {
        let mut fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        fields.insert("revid".into(), revision.id.into());
        Self { event_type, fields }
    }
}

/// Annotations already computed for a revision.
///
/// Owned by the caller and shared between generators as needed.
#[derive(Debug, Default)]
pub struct InterpretationCache {
    entries: Mutex<FxHashMap<RevisionId, Arc<[Annotation]>>>,
}

impl InterpretationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, revision: RevisionId) -> Option<Arc<[Annotation]>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&revision)
            .cloned()
    }

    pub fn insert(&self, revision: RevisionId, annotations: Arc<[Annotation]>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(revision, annotations);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("text of revision {revision} is unavailable")]
    MissingRevision {
        revision: RevisionId,
        #[source]
        source: NotFound,
    },
}

struct AnnotationMentions {
    result: MentionResult,
    /// Linked name of each valid mention.
    names: FxHashMap<UserId, CompactString>,
}

/// Turns a talk page revision into notification events.
pub struct RevisionEventGenerator<'a> {
    store: &'a dyn RevisionStore,
    identities: &'a dyn IdentityResolver,
    links: &'a dyn LinkExtractor,
    config: &'a dyn Config,
    signatures: &'a SignatureResolver,
    cache: Option<&'a InterpretationCache>,
}

impl<'a> RevisionEventGenerator<'a> {
    pub fn new(
        store: &'a dyn RevisionStore,
        identities: &'a dyn IdentityResolver,
        links: &'a dyn LinkExtractor,
        config: &'a dyn Config,
        signatures: &'a SignatureResolver,
    ) -> Self {
        Self {
            store,
            identities,
            links,
            config,
            signatures,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a InterpretationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Emit all events of `revision` to `sink` and return how many there were.
    ///
    /// On error nothing is emitted.
    pub fn generate(
        &self,
        revision: &RevisionInfo,
        sink: &mut dyn EventSink,
    ) -> Result<usize, GenerationError> {
        let events = self.events_for_revision(revision)?;
        let count = events.len();
        for event in events {
            sink.emit(event.event_type, event.fields);
        }
        Ok(count)
    }

    #[tracing::instrument(skip_all, fields(revision = revision.id, page = %revision.page.text))]
    pub fn events_for_revision(
        &self,
        revision: &RevisionInfo,
    ) -> Result<Vec<Event>, GenerationError> {
        let annotations = self.annotations(revision)?;
        let interpreter = DiffInterpreter::new(self.signatures);
        let agent = revision.agent.name.as_str();

        let mut events = Vec::with_capacity(annotations.len());
        for annotation in annotations.iter() {
            let fields = match annotation {
                Annotation::AddComment {
                    content,
                    full_section,
                } => json!({ "content": content, "full-section": full_section }),
                Annotation::NewSectionWithComment { content } => json!({ "content": content }),
            };
            events.push(Event::new(annotation.event_type(), revision, fields));
        }

        let mentions: Vec<AnnotationMentions> = annotations
            .iter()
            .map(|annotation| self.classify_mentions(revision, annotation))
            .collect();
        let total: usize = mentions.iter().map(|m| overall_count(&m.result)).sum();
        let max_mentions = self.config.max_mentions();

        if total > max_mentions {
            tracing::info!(total, max_mentions, "too many mentions, not notifying any");
            let summary = interpreter.detect_section_title_and_text(&annotations);
            events.push(Event::new(
                "mention-failure-too-many",
                revision,
                json!({
                    "agent": agent,
                    "section-title": summary.section_title,
                    "max-mentions": max_mentions,
                }),
            ));
        } else {
            for (annotation, mentions) in annotations.iter().zip(&mentions) {
                self.mention_events(revision, annotation, mentions, &mut events);
            }
        }

        if let Some(owner) = revision.page.user_talk_owner() {
            match self.identities.resolve(owner) {
                IdentityResult::Valid(owner_id) if owner_id != 0 && owner_id != revision.agent.id => {
                    let summary = interpreter.detect_section_title_and_text(&annotations);
                    events.push(Event::new(
                        "edit-user-talk",
                        revision,
                        json!({
                            "agent": agent,
                            "section-title": summary.section_title,
                            "section-text": summary.section_text,
                        }),
                    ));
                }
                _ => {}
            }
        }

        tracing::debug!(
            annotations = annotations.len(),
            events = events.len(),
            "interpreted revision"
        );
        Ok(events)
    }

    fn annotations(&self, revision: &RevisionInfo) -> Result<Arc<[Annotation]>, GenerationError> {
        if let Some(cached) = self.cache.and_then(|cache| cache.get(revision.id)) {
            tracing::trace!("using cached annotations");
            return Ok(cached);
        }

        let new_text = self.text_of(revision.id)?;
        let old_text = match revision.parent_id {
            Some(parent) => self.text_of(parent)?,
            None => String::new(),
        };

        let changes = ChangeSet::compute(&old_text, &new_text);
        let annotations: Arc<[Annotation]> = DiffInterpreter::new(self.signatures)
            .interpret(&changes, &revision.agent.name, &revision.page.text)
            .into();

        if let Some(cache) = self.cache {
            cache.insert(revision.id, Arc::clone(&annotations));
        }
        Ok(annotations)
    }

    fn text_of(&self, revision: RevisionId) -> Result<String, GenerationError> {
        self.store
            .get_text(revision)
            .map_err(|source| GenerationError::MissingRevision { revision, source })
    }

    fn classify_mentions(
        &self,
        revision: &RevisionInfo,
        annotation: &Annotation,
    ) -> AnnotationMentions {
        let owner = revision.page.user_talk_owner();
        let agent = canonical_username(&revision.agent.name);
        // the owner of a user talk page is notified through edit-user-talk instead
        let links: Vec<(CompactString, IdentityResult)> = self
            .links
            .user_links(annotation.content())
            .into_iter()
            .filter(|name| owner != Some(name.as_str()) && agent.as_ref() != Some(name))
            .map(|name| {
                let identity = self.identities.resolve(&name);
                (name, identity)
            })
            .collect();

        let mut names = FxHashMap::default();
        for (name, identity) in &links {
            if let IdentityResult::Valid(id) = identity {
                names.entry(*id).or_insert_with(|| name.clone());
            }
        }

        AnnotationMentions {
            result: classify(revision.agent.id, links),
            names,
        }
    }

    fn mention_events(
        &self,
        revision: &RevisionInfo,
        annotation: &Annotation,
        mentions: &AnnotationMentions,
        events: &mut Vec<Event>,
    ) {
        let AnnotationMentions {
            result: mentions,
            names,
        } = mentions;
        let agent = revision.agent.name.as_str();
        let section_title = annotation.section_header().unwrap_or_default();

        if !mentions.valid_mentions.is_empty() {
            let content = strip_header(annotation.content());
            let content = self.signatures.strip_signature(&content);
            let mentioned: Vec<UserId> = mentions.valid_mentions.values().copied().collect();
            events.push(Event::new(
                "mention",
                revision,
                json!({
                    "agent": agent,
                    "section-title": section_title,
                    "content": content,
                    "mentioned-users": mentioned,
                }),
            ));
        }

        if !self.config.mention_status_notifications_enabled() {
            return;
        }

        for user in mentions.valid_mentions.values() {
            let name = names.get(user).map(CompactString::as_str).unwrap_or_default();
            events.push(Event::new(
                "mention-success",
                revision,
                json!({
                    "agent": agent,
                    "section-title": section_title,
                    "subject-name": name,
                    "subject-id": user,
                }),
            ));
        }

        let failures = mentions
            .anonymous_users
            .iter()
            .map(|name| ("user-anonymous", name))
            .chain(mentions.unknown_users.iter().map(|name| ("user-unknown", name)));
        for (failure_type, name) in failures {
            events.push(Event::new(
                "mention-failure",
                revision,
                json!({
                    "agent": agent,
                    "section-title": section_title,
                    "subject-name": name,
                    "failure-type": failure_type,
                }),
            ));
        }
    }
}
