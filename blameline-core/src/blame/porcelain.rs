//! Parser for `git blame --porcelain` / `--line-porcelain` output
//!
//! The format is line oriented:
//!
//! ```text
//! <40-hex revision> <source line> <final line> [<group size>]
//! author <name>
//! author-mail <<email>>
//! author-time <epoch seconds>
//! summary <text>
//! \t<line content>
//! ```
//!
//! Plain `--porcelain` omits the metadata lines for a revision it has already
//! described, so the accumulator keeps the last seen values until they are
//! overwritten. Unknown line kinds are skipped.

use crate::types::{AnnotationMap, AnnotationRecord};

/// Fields collected since the last header line.
#[derive(Default)]
struct Accumulator {
    revision: String,
    author: String,
    author_email: String,
    author_time: i64,
    summary: String,
    final_line: u32,
}

impl Accumulator {
    fn record(&self) -> Option<AnnotationRecord> {
        if self.revision.is_empty() || self.final_line == 0 {
            return None;
        }
        Some(AnnotationRecord {
            revision: self.revision.clone(),
            author: self.author.clone(),
            author_email: self.author_email.clone(),
            author_time: self.author_time,
            summary: self.summary.clone(),
            line_number: self.final_line,
        })
    }
}

/// Parse porcelain blame output into per-line annotations.
///
/// Never fails: empty or malformed input produces an empty map.
pub fn parse_porcelain(output: &str) -> AnnotationMap {
    let mut map = AnnotationMap::new();
    let mut acc = Accumulator::default();

    for raw in output.split('\n') {
        // Content lines keep their trailing characters; everything else may carry `\r`.
        if raw.starts_with('\t') {
            if let Some(record) = acc.record() {
                map.insert(record);
            }
            continue;
        }

        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some((revision, final_line)) = parse_header(line) {
            acc.revision = revision.to_string();
            acc.final_line = final_line;
        } else if let Some(mail) = line.strip_prefix("author-mail ") {
            acc.author_email = strip_angle_brackets(mail).to_string();
        } else if let Some(time) = line.strip_prefix("author-time ") {
            if let Ok(time) = time.trim().parse() {
                acc.author_time = time;
            }
        } else if let Some(author) = line.strip_prefix("author ") {
            acc.author = author.to_string();
        } else if let Some(summary) = line.strip_prefix("summary ") {
            acc.summary = summary.to_string();
        }
    }

    map
}

/// Returns the revision and the final (destination) line number of a header line.
///
/// A header whose third field is missing or not a number still starts a new
/// block, with line number 0 so no record is emitted for it.
fn parse_header(line: &str) -> Option<(&str, u32)> {
    let revision = line.get(..40)?;
    if !revision.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return None;
    }

    let mut fields = line.split_whitespace();
    let first = fields.next()?;
    if first.len() != 40 {
        return None;
    }
    let final_line = fields.nth(1).and_then(|f| f.parse().ok()).unwrap_or(0);
    Some((revision, final_line))
}

fn strip_angle_brackets(mail: &str) -> &str {
    let mail = mail.strip_prefix('<').unwrap_or(mail);
    mail.strip_suffix('>').unwrap_or(mail)
}
