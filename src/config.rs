use serde::Deserialize;

use crate::signature::{NamespaceAliases, SignatureResolver, TimestampMatcher, TimestampRegexError};

/// Wiki settings the event generator consults on every revision.
pub trait Config {
    /// Mentions per revision above which no mention is notified.
    fn max_mentions(&self) -> usize;
    fn mention_status_notifications_enabled(&self) -> bool;
}

/// Engine settings as they appear in the surrounding application's configuration file.
///
/// Loading the file is up to the caller, any serde format works.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    #[serde(default = "default_max_mentions")]
    pub max_mentions: usize,
    /// Also notify the agent about which mentions succeeded or failed.
    #[serde(default)]
    pub mention_status_notifications: bool,
    /// A signature timestamp as this wiki renders it, e.g. `12:34, 5. Mär. 2020 (CET)`.
    /// Defaults to the English UTC format.
    #[serde(default)]
    pub timestamp_exemplar: Option<String>,
    /// Localized names of the User namespace, on top of the English one.
    #[serde(default)]
    pub user_namespace_aliases: Vec<String>,
    #[serde(default)]
    pub user_talk_namespace_aliases: Vec<String>,
    #[serde(default)]
    pub special_namespace_aliases: Vec<String>,
    #[serde(default)]
    pub contributions_aliases: Vec<String>,
}

fn default_max_mentions() -> usize {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_mentions: default_max_mentions(),
            mention_status_notifications: false,
            timestamp_exemplar: None,
            user_namespace_aliases: Vec::new(),
            user_talk_namespace_aliases: Vec::new(),
            special_namespace_aliases: Vec::new(),
            contributions_aliases: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn namespace_aliases(&self) -> NamespaceAliases {
        let aliases = self
            .user_namespace_aliases
            .iter()
            .fold(NamespaceAliases::english(), |a, alias| a.with_user(alias));
        let aliases = self
            .user_talk_namespace_aliases
            .iter()
            .fold(aliases, |a, alias| a.with_user_talk(alias));
        let aliases = self
            .special_namespace_aliases
            .iter()
            .fold(aliases, |a, alias| a.with_special(alias));
        self.contributions_aliases
            .iter()
            .fold(aliases, |a, alias| a.with_contributions(alias))
    }

    pub fn timestamp_matcher(&self) -> Result<TimestampMatcher, TimestampRegexError> {
        match &self.timestamp_exemplar {
            Some(exemplar) => TimestampMatcher::from_exemplar(exemplar),
            None => TimestampMatcher::utc(),
        }
    }

    /// Build the signature resolver once at startup; it is immutable afterwards.
    pub fn signature_resolver(&self) -> Result<SignatureResolver, TimestampRegexError> {
        Ok(SignatureResolver::new(
            self.timestamp_matcher()?,
            self.namespace_aliases(),
        ))
    }
}

impl Config for EngineConfig {
    fn max_mentions(&self) -> usize {
        self.max_mentions
    }

    fn mention_status_notifications_enabled(&self) -> bool {
        self.mention_status_notifications
    }
}
