use std::sync::LazyLock;

use chrono::Utc;
use compact_str::CompactString;
use regex::{NoExpand, Regex};
use rustc_hash::FxHashMap;

/// Offset in bytes into a UTF-8 string. Never a char or grapheme index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteOffset(pub usize);

impl ByteOffset {
    pub fn get(self) -> usize {
        self.0
    }
}

/// `[[target]]` or `[[target|display]]`. The display part may contain a lone `]`.
pub(crate) static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[]+)\]\]").unwrap());

/// Maximum number of bytes between two links to the same user that still belong to one signature,
/// e.g. the ` (` in `[[User:X|X]] ([[User talk:X|talk]])`.
const SIGNATURE_GLUE_MAX: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum TimestampRegexError {
    #[error("timestamp regex does not match its exemplar `{0}`")]
    ExemplarMismatch(String),
    #[error("failed to build timestamp regex")]
    Regex(#[from] regex::Error),
}

/// Recognizes the timestamp part of a signature as rendered by this wiki.
#[derive(Debug, Clone)]
pub struct TimestampMatcher {
    regex: Regex,
}

impl TimestampMatcher {
    /// Build a matcher by generalizing one rendered timestamp, e.g. `00:17, 7 May 2013 (UTC)`.
    ///
    /// Letter runs (month and day names) match any word, digit runs match any number and the
    /// trailing timezone in parentheses has to match literally.
    pub fn from_exemplar(exemplar: &str) -> Result<Self, TimestampRegexError> {
        static TIMEZONE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"[ \t]*\(\w+\)[ \t]*$").unwrap());
        static LETTERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\d\W]+").unwrap());
        static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

        let (body, timezone) = match TIMEZONE.find(exemplar) {
            Some(m) => (&exemplar[..m.start()], Some(m.as_str())),
            None => (exemplar, None),
        };

        let escaped = regex::escape(body);
        let pattern = LETTERS.replace_all(&escaped, NoExpand(r"[^\d\W]+"));
        let mut pattern = DIGITS.replace_all(&pattern, NoExpand(r"\d+")).into_owned();
        if let Some(timezone) = timezone {
            pattern.push_str(&regex::escape(timezone));
        }

        let regex = Regex::new(&pattern)?;
        if !regex.is_match(exemplar) {
            return Err(TimestampRegexError::ExemplarMismatch(exemplar.to_string()));
        }

        tracing::debug!(pattern = regex.as_str(), "built timestamp regex");
        Ok(Self { regex })
    }

    /// Matcher for the default English signature format, `HH:MM, D Month YYYY (UTC)`.
    pub fn utc() -> Result<Self, TimestampRegexError> {
        let exemplar = Utc::now().format("%H:%M, %-d %B %Y (UTC)").to_string();
        Self::from_exemplar(&exemplar)
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Byte offset of the first timestamp in `line`.
    pub fn position_in(&self, line: &str) -> Option<ByteOffset> {
        self.regex.find(line).map(|m| ByteOffset(m.start()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    User,
    UserTalk,
    Contributions,
}

/// A link target that points at a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedUser {
    pub kind: LinkKind,
    pub name: CompactString,
}

/// Localized namespace names that make a link point at a user.
///
/// Aliases are compared case-insensitively with underscores treated as spaces.
#[derive(Debug, Clone)]
pub struct NamespaceAliases {
    user: Vec<String>,
    user_talk: Vec<String>,
    special: Vec<String>,
    contributions: Vec<String>,
}

fn normalize_alias(alias: &str) -> String {
    alias
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl NamespaceAliases {
    pub fn english() -> Self {
        Self {
            user: vec![normalize_alias("User")],
            user_talk: vec![normalize_alias("User talk")],
            special: vec![normalize_alias("Special")],
            contributions: vec![normalize_alias("Contributions")],
        }
    }

    pub fn with_user(mut self, alias: &str) -> Self {
        self.user.push(normalize_alias(alias));
        self
    }

    pub fn with_user_talk(mut self, alias: &str) -> Self {
        self.user_talk.push(normalize_alias(alias));
        self
    }

    pub fn with_special(mut self, alias: &str) -> Self {
        self.special.push(normalize_alias(alias));
        self
    }

    pub fn with_contributions(mut self, alias: &str) -> Self {
        self.contributions.push(normalize_alias(alias));
        self
    }

    /// Interpret a link target (the part before `|`).
    ///
    /// Subpages of user pages are not users.
    pub fn linked_user(&self, target: &str) -> Option<LinkedUser> {
        let target = target.trim();
        let target = target.strip_prefix(':').unwrap_or(target);
        let target = target.split('#').next().unwrap_or_default();
        let (namespace, rest) = target.split_once(':')?;
        let namespace = normalize_alias(namespace);

        let kind = if self.user.contains(&namespace) {
            LinkKind::User
        } else if self.user_talk.contains(&namespace) {
            LinkKind::UserTalk
        } else if self.special.contains(&namespace) {
            let (page, name) = rest.split_once('/')?;
            if !self.contributions.contains(&normalize_alias(page)) {
                return None;
            }
            return Some(LinkedUser {
                kind: LinkKind::Contributions,
                name: canonical_username(name)?,
            });
        } else {
            return None;
        };

        if rest.contains('/') {
            return None;
        }

        Some(LinkedUser {
            kind,
            name: canonical_username(rest)?,
        })
    }
}

/// Normalize a user name the way the wiki stores it: underscores become spaces, whitespace runs
/// collapse, the first letter is upper-cased.
pub fn canonical_username(raw: &str) -> Option<CompactString> {
    let collapsed = raw.replace('_', " ");
    let mut words = collapsed.split_whitespace();

    let mut name = CompactString::default();
    if let Some(first) = words.next() {
        name.push_str(first);
    }
    for word in words {
        name.push(' ');
        name.push_str(word);
    }

    if name.is_empty() || name.contains(&['[', ']', '{', '}', '<', '>', '|', '#'][..]) {
        return None;
    }

    let mut chars = name.chars();
    let first = chars.next()?;
    let mut result = CompactString::default();
    match unicode_case_mapping::to_uppercase(first) {
        [0, ..] => result.push(first),
        upper => {
            for c in upper
                .into_iter()
                .take_while(|&u| u != 0)
                .filter_map(char::from_u32)
            {
                result.push(c);
            }
        }
    }
    result.push_str(chars.as_str());
    Some(result)
}

/// The signer of a line and where the signature starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatch {
    pub byte_offset: ByteOffset,
    pub username: CompactString,
}

struct UserLink {
    start: usize,
    end: usize,
    name: CompactString,
}

/// Finds signatures: a link to a user page, user talk page or contributions page followed by a
/// timestamp.
#[derive(Debug, Clone)]
pub struct SignatureResolver {
    timestamp: TimestampMatcher,
    aliases: NamespaceAliases,
}

impl SignatureResolver {
    pub fn new(timestamp: TimestampMatcher, aliases: NamespaceAliases) -> Self {
        Self { timestamp, aliases }
    }

    pub fn timestamp(&self) -> &TimestampMatcher {
        &self.timestamp
    }

    pub fn aliases(&self) -> &NamespaceAliases {
        &self.aliases
    }

    pub fn is_signed(&self, line: &str) -> bool {
        self.timestamp.position_in(line).is_some()
    }

    fn user_links(&self, text: &str) -> Vec<UserLink> {
        WIKILINK
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let inner = captures.get(1)?.as_str();
                let target = inner.split('|').next().unwrap_or_default();
                let linked = self.aliases.linked_user(target)?;
                Some(UserLink {
                    start: whole.start(),
                    end: whole.end(),
                    name: linked.name,
                })
            })
            .collect()
    }

    /// Find who signed `line`.
    ///
    /// The last user link before the timestamp names the signer. Directly preceding links to the
    /// same user are part of the same signature, so the offset points at the first of them.
    pub fn resolve(&self, line: &str) -> Option<SignatureMatch> {
        let timestamp = self.timestamp.position_in(line)?;
        let links = self.user_links(&line[..timestamp.get()]);
        let (last, earlier) = links.split_last()?;

        let mut start = last.start;
        for link in earlier.iter().rev() {
            if link.name != last.name || start - link.end > SIGNATURE_GLUE_MAX {
                break;
            }
            start = link.start;
        }

        Some(SignatureMatch {
            byte_offset: ByteOffset(start),
            username: last.name.clone(),
        })
    }

    /// All users linked from `line`, in order.
    pub fn extract_users_from_line(&self, line: &str) -> Vec<CompactString> {
        self.user_links(line).into_iter().map(|l| l.name).collect()
    }

    /// Signer of each line mapped to the last signature they left in `text`.
    pub fn extract_signatures(&self, text: &str) -> FxHashMap<CompactString, String> {
        let mut signatures = FxHashMap::default();
        for line in text.split('\n') {
            if let Some(found) = self.resolve(line) {
                signatures.insert(found.username, line[found.byte_offset.get()..].to_string());
            }
        }
        signatures
    }

    pub fn is_signed_by(&self, text: &str, user: &str) -> bool {
        match (self.resolve(text), canonical_username(user)) {
            (Some(found), Some(user)) => found.username == user,
            _ => false,
        }
    }

    /// Cut `text` right before its signature, or before the timestamp if the signer is unknown.
    pub fn strip_signature<'t>(&self, text: &'t str) -> &'t str {
        if let Some(found) = self.resolve(text) {
            &text[..found.byte_offset.get()]
        } else if let Some(timestamp) = self.timestamp.position_in(text) {
            &text[..timestamp.get()]
        } else {
            text
        }
    }
}
