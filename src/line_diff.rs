use std::ops::Range;

use imara_diff::{
    intern::{Interner, Token},
    Algorithm,
};

/// One unit of a line-level diff.
///
/// Contents are `\n`-joined runs of consecutive lines. Positions are 1-based line numbers of the
/// first line the op refers to, `left_pos` in the old document and `right_pos` in the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    Add {
        content: String,
        left_pos: usize,
        right_pos: usize,
    },
    Subtract {
        content: String,
        left_pos: usize,
        right_pos: usize,
    },
    Change {
        old_content: String,
        new_content: String,
        left_pos: usize,
        right_pos: usize,
    },
}

impl DiffOp {
    pub fn left_pos(&self) -> usize {
        match self {
            DiffOp::Add { left_pos, .. }
            | DiffOp::Subtract { left_pos, .. }
            | DiffOp::Change { left_pos, .. } => *left_pos,
        }
    }

    pub fn right_pos(&self) -> usize {
        match self {
            DiffOp::Add { right_pos, .. }
            | DiffOp::Subtract { right_pos, .. }
            | DiffOp::Change { right_pos, .. } => *right_pos,
        }
    }
}

/// The ops of a diff together with both documents split into lines.
#[derive(Debug, Clone)]
pub struct ChangeSet<'a> {
    pub ops: Vec<DiffOp>,
    pub old_lines: Vec<&'a str>,
    pub new_lines: Vec<&'a str>,
}

/// Split `text` on `\n`.
///
/// An empty text has no lines at all; otherwise every segment is kept, including the empty one
/// after a trailing newline.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut start = 0;
    for pos in memchr::memchr_iter(b'\n', text.as_bytes()) {
        lines.push(&text[start..pos]);
        start = pos + 1;
    }
    lines.push(&text[start..]);
    lines
}

/// Compute the line diff between `old` and `new`.
pub fn diff(old: &str, new: &str) -> Vec<DiffOp> {
    ChangeSet::compute(old, new).ops
}

impl<'a> ChangeSet<'a> {
    pub fn compute(old: &'a str, new: &'a str) -> Self {
        let old_lines = split_lines(old);
        let new_lines = split_lines(new);

        let mut interner = Interner::new(old_lines.len() + new_lines.len());
        let old_tokens: Vec<Token> = old_lines.iter().map(|l| interner.intern(*l)).collect();
        let new_tokens: Vec<Token> = new_lines.iter().map(|l| interner.intern(*l)).collect();

        let hunks = hunks(&old_tokens, &new_tokens, interner.num_tokens());

        let mut ops = Vec::new();
        for (before, after) in hunks {
            coalesce_hunk(&old_lines, &new_lines, before, after, &mut ops);
        }

        Self {
            ops,
            old_lines,
            new_lines,
        }
    }

    /// Rebuild the new document by applying the ops to the old one.
    pub fn replay(&self) -> String {
        let mut result: Vec<&str> = Vec::with_capacity(self.new_lines.len());
        let mut old_idx = 0;

        for op in &self.ops {
            let retained_until = op.left_pos() - 1;
            if retained_until > old_idx {
                result.extend_from_slice(&self.old_lines[old_idx..retained_until]);
                old_idx = retained_until;
            }

            match op {
                DiffOp::Add { content, .. } => result.extend(content.split('\n')),
                DiffOp::Subtract { content, .. } => old_idx += content.split('\n').count(),
                DiffOp::Change {
                    old_content,
                    new_content,
                    ..
                } => {
                    old_idx += old_content.split('\n').count();
                    result.extend(new_content.split('\n'));
                }
            }
        }

        if old_idx < self.old_lines.len() {
            result.extend_from_slice(&self.old_lines[old_idx..]);
        }

        result.join("\n")
    }
}

// maximal blocks of non-retained lines as (old range, new range), 0-based
fn hunks(old: &[Token], new: &[Token], num_tokens: u32) -> Vec<(Range<u32>, Range<u32>)> {
    let mut result: Vec<(Range<u32>, Range<u32>)> = Vec::new();

    imara_diff::diff_with_tokens(
        Algorithm::Histogram,
        old,
        new,
        num_tokens,
        |before: Range<u32>, after: Range<u32>| {
            if let Some((last_before, last_after)) = result.last_mut() {
                if last_before.end == before.start && last_after.end == after.start {
                    last_before.end = before.end;
                    last_after.end = after.end;
                    return;
                }
            }
            result.push((before, after));
        },
    );

    result
}

fn coalesce_hunk(
    old_lines: &[&str],
    new_lines: &[&str],
    before: Range<u32>,
    after: Range<u32>,
    ops: &mut Vec<DiffOp>,
) {
    let removed = &old_lines[before.start as usize..before.end as usize];
    let inserted = &new_lines[after.start as usize..after.end as usize];
    let old_start = before.start as usize;
    let new_start = after.start as usize;
    let paired = removed.len().min(inserted.len());

    for (i, (old_line, new_line)) in removed.iter().zip(inserted.iter()).enumerate() {
        ops.push(DiffOp::Change {
            old_content: (*old_line).to_string(),
            new_content: (*new_line).to_string(),
            left_pos: old_start + i + 1,
            right_pos: new_start + i + 1,
        });
    }

    if removed.len() > paired {
        ops.push(DiffOp::Subtract {
            content: removed[paired..].join("\n"),
            left_pos: old_start + paired + 1,
            right_pos: new_start + paired + 1,
        });
    }

    if inserted.len() > paired {
        ops.push(DiffOp::Add {
            content: inserted[paired..].join("\n"),
            left_pos: old_start + paired + 1,
            right_pos: new_start + paired + 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FOUR_LINES: &str = "line 1\nline 2\nline 3\nline 4";

    #[test]
    fn test_subtract() {
        let result = diff(FOUR_LINES, "line 1\nline 3\nline 4");
        assert_eq!(
            result,
            vec![DiffOp::Subtract {
                content: "line 2".into(),
                left_pos: 2,
                right_pos: 2,
            }]
        );
    }

    #[test]
    fn test_add() {
        let result = diff(FOUR_LINES, "line 1\nline 2\nline 2.5\nline 3\nline 4");
        assert_eq!(
            result,
            vec![DiffOp::Add {
                content: "line 2.5".into(),
                left_pos: 3,
                right_pos: 3,
            }]
        );
    }

    #[test]
    fn test_change() {
        let result = diff(FOUR_LINES, "line 1\nline b\nline 3\nline 4");
        assert_eq!(
            result,
            vec![DiffOp::Change {
                old_content: "line 2".into(),
                new_content: "line b".into(),
                left_pos: 2,
                right_pos: 2,
            }]
        );
    }

    #[test]
    fn test_change_with_surplus_add() {
        let result = diff(FOUR_LINES, "line 1\nline b\nline c\nline d\nline 3\nline 4");
        assert_eq!(
            result,
            vec![
                DiffOp::Change {
                    old_content: "line 2".into(),
                    new_content: "line b".into(),
                    left_pos: 2,
                    right_pos: 2,
                },
                DiffOp::Add {
                    content: "line c\nline d".into(),
                    left_pos: 3,
                    right_pos: 3,
                },
            ]
        );
    }

    #[test]
    fn test_change_with_surplus_subtract() {
        let result = diff(FOUR_LINES, "line x\nline 4");
        assert_eq!(
            result,
            vec![
                DiffOp::Change {
                    old_content: "line 1".into(),
                    new_content: "line x".into(),
                    left_pos: 1,
                    right_pos: 1,
                },
                DiffOp::Subtract {
                    content: "line 2\nline 3".into(),
                    left_pos: 2,
                    right_pos: 2,
                },
            ]
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert!(diff("", "").is_empty());
        assert_eq!(
            diff("", "== New ==\nhello"),
            vec![DiffOp::Add {
                content: "== New ==\nhello".into(),
                left_pos: 1,
                right_pos: 1,
            }]
        );
        assert_eq!(
            diff("gone", ""),
            vec![DiffOp::Subtract {
                content: "gone".into(),
                left_pos: 1,
                right_pos: 1,
            }]
        );
    }

    #[test]
    fn test_trailing_newline() {
        assert_eq!(
            diff("a", "a\n"),
            vec![DiffOp::Add {
                content: String::new(),
                left_pos: 2,
                right_pos: 2,
            }]
        );
        assert!(diff("a\n", "a\n").is_empty());
    }

    #[test]
    fn test_split_lines() {
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("\n"), vec!["", ""]);
        assert_eq!(split_lines("a\r\nb"), vec!["a\r", "b"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 10000,
            ..ProptestConfig::default()
        })]
        #[test]
        fn replay_reconstructs_new(
            old in "(a|b|c|== h ==|ä|\n|\n|\n)*",
            new in "(a|b|c|== h ==|ä|\n|\n|\n)*",
        ) {
            let change_set = ChangeSet::compute(&old, &new);
            prop_assert_eq!(change_set.replay(), new);
        }
    }

    proptest! {
        #[test]
        fn single_line_replacement_is_one_change(
            prefix in proptest::collection::vec("[a-z]{1,8}", 0..5),
            old_line in "[A-M]{1,8}",
            new_line in "[N-Z]{1,8}",
            suffix in proptest::collection::vec("[a-z]{1,8}", 0..5),
        ) {
            let mut old = prefix.clone();
            old.push(old_line.clone());
            old.extend(suffix.iter().cloned());
            let mut new = prefix.clone();
            new.push(new_line.clone());
            new.extend(suffix.iter().cloned());

            let ops = diff(&old.join("\n"), &new.join("\n"));
            prop_assert_eq!(ops.len(), 1);
            match &ops[0] {
                DiffOp::Change { left_pos, right_pos, old_content, new_content } => {
                    prop_assert_eq!(left_pos, right_pos);
                    prop_assert_eq!(*left_pos, prefix.len() + 1);
                    prop_assert_eq!(old_content, &old_line);
                    prop_assert_eq!(new_content, &new_line);
                }
                other => prop_assert!(false, "unexpected op {:?}", other),
            }
        }
    }
}
