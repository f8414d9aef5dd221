//! CSV parsing of the published spreadsheet.
//!
//! The feed is read positionally: the first line names the columns and every
//! following line becomes one [`CouponRecord`]. Quoting is only honoured far
//! enough to keep commas inside `"..."` from splitting a field.

use crate::models::CouponRecord;

const QUOTE: char = '"';
const DELIMITER: char = ',';

/// Parser for the spreadsheet feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse feed text into records, one per non-header line.
    ///
    /// Empty or header-only input yields an empty vector.
    pub fn parse(&self, text: &str) -> Vec<CouponRecord> {
        let mut lines = text.trim().split('\n');
        let Some(header_line) = lines.next() else {
            return Vec::new();
        };

        let headers: Vec<&str> = header_line
            .split(DELIMITER)
            .map(str::trim)
            .collect();

        lines
            .map(|line| {
                let values = self.split_line(line);
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        let value = values.get(i).map_or("", |v| clean_value(v));
                        (*header, value)
                    })
                    .collect()
            })
            .collect()
    }

    /// Split a line on delimiters that sit outside a quoted section.
    ///
    /// A delimiter counts only when an even number of quotes precede it on the line.
    fn split_line<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let mut fields = Vec::new();
        let mut quotes = 0usize;
        let mut start = 0;

        for (i, ch) in line.char_indices() {
            if ch == QUOTE {
                quotes += 1;
            } else if ch == DELIMITER && quotes % 2 == 0 {
                fields.push(&line[start..i]);
                start = i + ch.len_utf8();
            }
        }
        fields.push(&line[start..]);
        fields
    }
}

/// Trim, drop one leading and one trailing quote, trim again.
fn clean_value(raw: &str) -> &str {
    let value = raw.trim();
    let value = value.strip_prefix(QUOTE).unwrap_or(value);
    let value = value.strip_suffix(QUOTE).unwrap_or(value);
    value.trim()
}

/// Parse with a default parser.
pub fn parse_csv(text: &str) -> Vec<CouponRecord> {
    CsvParser::new().parse(text)
}
