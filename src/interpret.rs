use crate::{
    line_diff::{ChangeSet, DiffOp},
    sections::{extract_header, full_section, header_title, strip_header},
    signature::SignatureResolver,
};

fn starts_with_header(text: &str) -> bool {
    text.split('\n')
        .next()
        .is_some_and(|line| header_title(line.trim()).is_some())
}

// cut before every header line except a leading one
fn split_at_headers(content: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in content.split('\n') {
        if offset > start && header_title(line.trim()).is_some() {
            parts.push(&content[start..offset - 1]);
            start = offset;
        }
        offset += line.len() + 1;
    }
    parts.push(&content[start..]);

    parts
}

/// What an added block of text means on a talk page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// A comment added to an existing section. `full_section` is that section in the new revision.
    AddComment {
        content: String,
        full_section: String,
    },
    /// A new section, header and opening comment.
    NewSectionWithComment { content: String },
}

impl Annotation {
    pub fn content(&self) -> &str {
        match self {
            Annotation::AddComment { content, .. } => content,
            Annotation::NewSectionWithComment { content } => content,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Annotation::AddComment { .. } => "add-comment",
            Annotation::NewSectionWithComment { .. } => "new-section-with-comment",
        }
    }

    /// Title of the section this annotation belongs to.
    pub fn section_header(&self) -> Option<&str> {
        match self {
            Annotation::AddComment { full_section, .. } => extract_header(full_section),
            Annotation::NewSectionWithComment { content } => extract_header(content),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionSummary {
    pub section_title: String,
    pub section_text: String,
}

pub struct DiffInterpreter<'r> {
    signatures: &'r SignatureResolver,
}

impl<'r> DiffInterpreter<'r> {
    pub fn new(signatures: &'r SignatureResolver) -> Self {
        Self { signatures }
    }

    /// Turn the additions of a diff into annotations, in document order.
    ///
    /// Subtractions and changes never produce annotations. An added block is cut at every header
    /// line: each header-led part is a new section, text before the first header is a comment in
    /// the section around it. Only line starts are checked, so a reply that opens by quoting a
    /// heading is taken for a new section.
    pub fn interpret(
        &self,
        changes: &ChangeSet<'_>,
        acting_user: &str,
        title: &str,
    ) -> Vec<Annotation> {
        let _span = tracing::debug_span!("interpret", title, acting_user).entered();

        let mut annotations = Vec::new();
        for op in &changes.ops {
            let DiffOp::Add {
                content, right_pos, ..
            } = op
            else {
                continue;
            };

            for part in split_at_headers(content.trim()) {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }

                if starts_with_header(part) {
                    annotations.push(Annotation::NewSectionWithComment {
                        content: part.to_string(),
                    });
                } else {
                    annotations.push(Annotation::AddComment {
                        content: part.to_string(),
                        full_section: full_section(&changes.new_lines, *right_pos),
                    });
                }
            }
        }

        tracing::debug!(annotations = annotations.len(), "interpreted diff");
        annotations
    }

    /// The plain comment in `content`: no headers, no signature, no indentation markers.
    pub fn comment_body(&self, content: &str) -> String {
        let without_header = strip_header(content);
        let unsigned = self.signatures.strip_signature(&without_header);

        unsigned
            .split('\n')
            .map(|line| {
                line.trim_start_matches(|c| matches!(c, ':' | '*' | '#' | ';'))
                    .trim()
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The single section all annotations belong to, with their comment bodies.
    ///
    /// Both fields are empty if there are no annotations, if an annotation has no header (e.g. it
    /// sits below a header broken across lines) or if the annotations span different sections.
    pub fn detect_section_title_and_text(&self, annotations: &[Annotation]) -> SectionSummary {
        let mut title: Option<&str> = None;

        for annotation in annotations {
            let Some(header) = annotation.section_header() else {
                return SectionSummary::default();
            };
            match title {
                Some(title) if title != header => return SectionSummary::default(),
                _ => title = Some(header),
            }
        }

        let Some(title) = title else {
            return SectionSummary::default();
        };

        let bodies: Vec<String> = annotations
            .iter()
            .map(|annotation| self.comment_body(annotation.content()))
            .filter(|body| !body.is_empty())
            .collect();

        SectionSummary {
            section_title: title.to_string(),
            section_text: bodies.join("\n"),
        }
    }
}
