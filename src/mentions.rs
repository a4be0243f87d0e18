use std::collections::BTreeMap;

use compact_str::CompactString;
use rustc_hash::FxHashSet;

use crate::signature::{LinkKind, NamespaceAliases, WIKILINK};

pub type UserId = u64;

/// What the identity collaborator knows about a linked name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResult {
    /// A registered user. Id `0` means the name is valid but nobody has registered it.
    Valid(UserId),
    Unknown,
    /// An IP address, as written in the link.
    Anonymous(CompactString),
}

/// Mentions of one comment, partitioned by whether they can be notified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionResult {
    pub valid_mentions: BTreeMap<UserId, UserId>,
    pub unknown_users: Vec<String>,
    pub anonymous_users: Vec<String>,
}

impl MentionResult {
    pub fn is_empty(&self) -> bool {
        overall_count(self) == 0
    }
}

/// Partition resolved links into valid, unknown and anonymous mentions.
///
/// Links to `acting_user_id` are dropped. An id of `0` is never the acting user, anonymous editors
/// have no id. A name seen twice is only classified once. Nothing is truncated here; the mention
/// ceiling is up to the caller.
pub fn classify<I, S>(acting_user_id: UserId, links: I) -> MentionResult
where
    I: IntoIterator<Item = (S, IdentityResult)>,
    S: AsRef<str>,
{
    let mut result = MentionResult::default();
    let mut seen: FxHashSet<CompactString> = FxHashSet::default();

    for (name, identity) in links {
        let name = name.as_ref();
        if !seen.insert(CompactString::from(name)) {
            continue;
        }

        match identity {
            IdentityResult::Anonymous(ip) => result.anonymous_users.push(ip.to_string()),
            IdentityResult::Valid(0) | IdentityResult::Unknown => {
                result.unknown_users.push(name.replace('_', " "));
            }
            IdentityResult::Valid(id) if id == acting_user_id => {}
            IdentityResult::Valid(id) => {
                result.valid_mentions.insert(id, id);
            }
        }
    }

    result
}

pub fn overall_count(result: &MentionResult) -> usize {
    result.valid_mentions.len() + result.unknown_users.len() + result.anonymous_users.len()
}

/// Finds the user names a piece of wikitext links to.
pub trait LinkExtractor {
    fn user_links(&self, content: &str) -> Vec<CompactString>;
}

/// Link extractor working on the raw wikitext.
///
/// Only links to user pages count as mentions. User talk and contributions links are what
/// signatures are made of. Every name is reported once, in order of first appearance.
#[derive(Debug, Clone)]
pub struct UserLinkExtractor {
    aliases: NamespaceAliases,
}

impl UserLinkExtractor {
    pub fn new(aliases: NamespaceAliases) -> Self {
        Self { aliases }
    }
}

impl LinkExtractor for UserLinkExtractor {
    fn user_links(&self, content: &str) -> Vec<CompactString> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();

        for captures in WIKILINK.captures_iter(content) {
            let Some(inner) = captures.get(1) else {
                continue;
            };
            let target = inner.as_str().split('|').next().unwrap_or_default();
            let Some(linked) = self.aliases.linked_user(target) else {
                continue;
            };
            if linked.kind != LinkKind::User {
                continue;
            }
            if seen.insert(linked.name.clone()) {
                names.push(linked.name);
            }
        }

        names
    }
}
