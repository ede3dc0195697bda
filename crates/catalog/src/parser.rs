//! Parser for the lab catalog CSV.
//!
//! Format: comma-separated, first row = field names, e.g.
//!
//! ```text
//! Name,Link,Summary,Lab Description
//! S3 Basics,https://...,"intro to storage, buckets",...
//! ```
//!
//! Fields may be wrapped in double quotes; inside quotes a doubled `""` is a
//! literal quote and commas/newlines are data. Rows end with LF or CRLF and
//! blank lines are skipped. Parsing is all-or-nothing: the first malformed
//! row fails the whole catalog.

use crate::error::{CatalogLoadError, Result};
use crate::types::{Catalog, Record};

/// One physical row, with the line it started on (1-based)
#[derive(Debug, PartialEq)]
struct RawRow {
    line: usize,
    fields: Vec<String>,
}

/// Parse catalog text into records, preserving row order
pub fn parse_catalog(text: &str) -> Result<Catalog> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = split_rows(text)?.into_iter();

    let header = match rows.next() {
        Some(header) => header.fields,
        None => return Ok(Catalog::new()),
    };

    let mut catalog = Catalog::new();
    for row in rows {
        if row.fields.len() != header.len() {
            return Err(CatalogLoadError::FieldCountMismatch {
                expected: header.len(),
                found: row.fields.len(),
                line: row.line,
            });
        }

        let record: Record = header.iter().cloned().zip(row.fields).collect();
        catalog.push(record);
    }

    Ok(catalog)
}

/// Split text into rows of fields, honoring quotes
fn split_rows(text: &str) -> Result<Vec<RawRow>> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();

    let mut line = 1;
    let mut row_line = 1;
    let mut in_quotes = false;
    // A quoted empty field ("") still counts as a field, so a row holding
    // only that is not a blank line
    let mut quoted = false;
    let mut at_field_start = true;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                // CRLF counts once, on its '\n'
                '\r' if chars.peek() != Some(&'\n') => {
                    line += 1;
                    field.push(c);
                }
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if at_field_start => {
                in_quotes = true;
                quoted = true;
                at_field_start = false;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                at_field_start = true;
            }
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                finish_row(&mut rows, &mut fields, &mut field, quoted, row_line);
                quoted = false;
                at_field_start = true;
                line += 1;
                row_line = line;
            }
            _ => {
                field.push(c);
                at_field_start = false;
            }
        }
    }

    if in_quotes {
        return Err(CatalogLoadError::Parse {
            line: row_line,
            reason: "Unterminated quoted field".to_string(),
        });
    }
    finish_row(&mut rows, &mut fields, &mut field, quoted, row_line);

    Ok(rows)
}

fn finish_row(
    rows: &mut Vec<RawRow>,
    fields: &mut Vec<String>,
    field: &mut String,
    quoted: bool,
    line: usize,
) {
    // Blank line: nothing was read since the last row break
    if fields.is_empty() && field.is_empty() && !quoted {
        return;
    }
    fields.push(std::mem::take(field));
    rows.push(RawRow {
        line,
        fields: std::mem::take(fields),
    });
}
