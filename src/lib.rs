// SPDX-License-Identifier: MPL-2.0
//! # talkdiff
//!
//! Interprets revisions of wiki talk pages: which comments were added, in which section, who signed
//! them and whom they mention.
//!
//! ## Overview
//!
//! Given the text of a talk page before and after an edit, `talkdiff`
//!
//! - computes a line diff between the two texts (histogram diff via `imara-diff`),
//! - classifies every block of added lines as a comment in an existing section or as a new section,
//! - recovers the section around each comment and its title,
//! - finds signatures (a user link followed by a timestamp) and the byte offset they start at,
//! - extracts user links from added comments and sorts them into notifiable, unknown and anonymous
//!   mentions.
//!
//! The [`events::RevisionEventGenerator`] ties everything together and turns one revision into
//! notification events. Storage, identity lookup and event delivery stay outside of this crate and
//! are plugged in through the traits in [`events`].
//!
//! ## Basic Usage
//!
//! Interpreting a single edit:
//!
//! ```rust
//! use talkdiff::config::EngineConfig;
//! use talkdiff::interpret::{Annotation, DiffInterpreter};
//! use talkdiff::line_diff::ChangeSet;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig {
//!         timestamp_exemplar: Some("00:17, 7 May 2013 (UTC)".into()),
//!         ..Default::default()
//!     };
//!     let signatures = config.signature_resolver()?;
//!
//!     let old = "== Lunch ==\nPizza? [[User:Jorm|Jorm]] 12:00, 1 June 2024 (UTC)";
//!     let new = format!("{old}\n:Sure. [[User:Werdna|Werdna]] 12:05, 1 June 2024 (UTC)");
//!
//!     let changes = ChangeSet::compute(old, &new);
//!     let interpreter = DiffInterpreter::new(&signatures);
//!     let annotations = interpreter.interpret(&changes, "Werdna", "Talk:Food");
//!     assert!(matches!(annotations.as_slice(), [Annotation::AddComment { .. }]));
//!
//!     let summary = interpreter.detect_section_title_and_text(&annotations);
//!     assert_eq!(summary.section_title, "Lunch");
//!     assert_eq!(summary.section_text, "Sure.");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules and API
//!
//! ### `line_diff` Module
//!
//! **Purpose**: Line diff of two texts as `Add`, `Subtract` and `Change` operations with 1-based
//! line positions. Within a block of changed lines, removed and inserted lines are paired up
//! positionally and the surplus becomes one trailing `Subtract` or `Add`.
//!
//! ### `signature` Module
//!
//! **Purpose**: Timestamp recognition and signature detection. All offsets are byte offsets
//! ([`signature::ByteOffset`]).
//!
//! - `TimestampMatcher::from_exemplar` builds the timestamp regex from one rendered timestamp of the
//!   wiki, so localized formats work without further configuration.
//! - `NamespaceAliases` holds the localized names of the User, User talk and Special namespaces.
//!
//! ### `sections` Module
//!
//! **Purpose**: Header detection, section counting and section extraction by line number.
//!
//! ### `interpret` Module
//!
//! **Purpose**: Turns a [`line_diff::ChangeSet`] into [`interpret::Annotation`]s and summarizes
//! them into a section title and text.
//!
//! ### `mentions` Module
//!
//! **Purpose**: Mention extraction and classification. No mention ceiling is applied here.
//!
//! ### `events` Module
//!
//! **Purpose**: The per-revision orchestration and the collaborator traits (`RevisionStore`,
//! `IdentityResolver`, `EventSink`). An [`events::InterpretationCache`] can be passed in to avoid
//! diffing the same revision twice.
//!
//! ### `config` Module
//!
//! **Purpose**: [`config::EngineConfig`], deserializable with serde, and the [`config::Config`]
//! trait the generator reads its limits from.
//!
//! ## Logging and Error Handling
//!
//! - Uses the `tracing` crate. Nothing is logged above `info`; a subscriber has to be installed by
//!   the application.
//! - Malformed markup is never an error, it just does not match (e.g. a header split across two
//!   lines is no header). The only hard errors are a bad timestamp exemplar at startup and a
//!   revision whose text cannot be loaded, in which case no event of that revision is emitted.
//!
//! ## Dependencies
//!
//! - **`compact_str`**: Used in the public API for user names and page titles.
//! - **`serde_json`**: Event fields are JSON values.

pub mod config;
pub mod events;
pub mod interpret;
pub mod line_diff;
pub mod mentions;
pub mod sections;
pub mod signature;
#[cfg(test)]
mod test_support;
