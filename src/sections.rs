use std::ops::Range;

/// Title of a header line like `== Title ==`, or `None` if `line` is not a header.
///
/// A header opens with two or more `=`, is followed by something other than `=` and closes with
/// the same number of `=`. The title is whatever lies between, trimmed.
pub fn header_title(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    let level = bytes.iter().take_while(|&&b| b == b'=').count();

    if level < 2 || bytes.len() < 2 * level + 1 || bytes[level] == b'=' {
        return None;
    }
    if !bytes[bytes.len() - level..].iter().all(|&b| b == b'=') {
        return None;
    }

    Some(line[level..line.len() - level].trim())
}

fn is_header_line(line: &str) -> bool {
    header_title(line.trim()).is_some()
}

/// Number of header lines in `text`, at any level.
pub fn section_count(text: &str) -> usize {
    text.trim()
        .split('\n')
        .filter(|line| header_title(line).is_some())
        .count()
}

/// Lines of the section that contains `line_number` (1-based), as a range of 1-based line numbers.
///
/// The section starts at the nearest header at or before the line (line 1 if there is none) and
/// ends before the next header line of any level.
pub fn section_span(lines: &[&str], line_number: usize) -> Range<usize> {
    let offset = line_number.clamp(1, lines.len().max(1));

    let start = (0..offset)
        .rev()
        .find(|&i| lines.get(i).is_some_and(|l| is_header_line(l)))
        .unwrap_or(0);
    let end = (offset..lines.len())
        .find(|&i| is_header_line(lines[i]))
        .unwrap_or(lines.len());

    start + 1..end + 1
}

/// Text of the section that contains `line_number` (1-based).
pub fn full_section(lines: &[&str], line_number: usize) -> String {
    let span = section_span(lines, line_number);
    let section = lines
        .get(span.start - 1..span.end - 1)
        .unwrap_or_default()
        .join("\n");

    section.trim_matches('\n').to_string()
}

/// Title of the last header in `text`.
pub fn extract_header(text: &str) -> Option<&str> {
    text.trim().split('\n').filter_map(header_title).last()
}

/// `text` with the content of every header line removed.
pub fn strip_header(text: &str) -> String {
    text.split('\n')
        .map(|line| if header_title(line).is_some() { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}
