//! CSV ingestion
//!
//! Turns the provider export into row maps keyed by the (trimmed) header
//! row. Parsing is deliberately forgiving: the export is not under our
//! control, so nothing here returns an error.
//!
//! Rules:
//! - `,` separates cells, `\n` or `\r` ends a row outside quotes
//! - `"` toggles quoted mode; `""` inside quotes is a literal quote
//! - blank lines produce no row
//! - an unterminated quote swallows the rest of the input into one cell

use std::collections::HashMap;
use tracing::warn;

/// One data row, looked up by header name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvRow {
    cells: HashMap<String, String>,
}

impl CsvRow {
    /// Cell value for `column`; empty when the column or cell is missing
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    /// Non-empty cell value for `column`
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        Some(self.get(column)).filter(|v| !v.is_empty())
    }

    /// Build a row directly from pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Split raw text into records of raw (untrimmed) cells
fn split_records(text: &str) -> (Vec<Vec<String>>, bool) {
    let mut records = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => current.push(std::mem::take(&mut cell)),
            '\n' | '\r' if !in_quotes => {
                if !cell.is_empty() || !current.is_empty() {
                    current.push(std::mem::take(&mut cell));
                    records.push(std::mem::take(&mut current));
                }
            }
            _ => cell.push(ch),
        }
    }

    if !cell.is_empty() || !current.is_empty() {
        current.push(cell);
        records.push(current);
    }

    (records, in_quotes)
}

/// Parse CSV text into rows keyed by the first (header) row
///
/// Rows whose cells are all blank are dropped. Missing trailing cells read
/// as empty strings; cells beyond the header width are ignored.
pub fn parse_csv(text: &str) -> Vec<CsvRow> {
    let (records, unterminated) = split_records(text);
    if unterminated {
        warn!("CSV input ends inside a quoted field; last cell runs to end of input");
    }

    let mut records = records.into_iter();
    let Some(header) = records.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    records
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|cells| CsvRow {
            cells: headers
                .iter()
                .enumerate()
                .map(|(idx, h)| {
                    let value = cells.get(idx).map(|c| c.trim()).unwrap_or("");
                    (h.clone(), value.to_string())
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_comma_and_escaped_quote() {
        let rows = parse_csv("name,city\n\"Smith, John\"\"\",Winnipeg\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), "Smith, John\"");
        assert_eq!(rows[0].get("city"), "Winnipeg");
    }

    #[test]
    fn test_embedded_newline_in_quotes() {
        let rows = parse_csv("entries_address,x\n\"12 Oak St\nWinnipeg MB\",1");
        assert_eq!(rows[0].get("entries_address"), "12 Oak St\nWinnipeg MB");
        assert_eq!(rows[0].get("x"), "1");
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let rows = parse_csv("a,b\r\n1,2\r\n\r\n\r\n3,4\r\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("a"), "3");
        assert_eq!(rows[1].get("b"), "4");
    }

    #[test]
    fn test_trailing_row_without_newline() {
        let rows = parse_csv("a\nlast");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), "last");
    }

    #[test]
    fn test_blank_rows_dropped() {
        let rows = parse_csv("a,b\n , \n,\n5,\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), "5");
        assert_eq!(rows[0].get("b"), "");
    }

    #[test]
    fn test_short_rows_padded_and_trimmed() {
        let rows = parse_csv(" a , b ,c\n  x  \n");
        assert_eq!(rows[0].get("a"), "x");
        assert_eq!(rows[0].get("b"), "");
        assert_eq!(rows[0].get("c"), "");
        assert_eq!(rows[0].get("missing"), "");
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let rows = parse_csv("a,b\n\"open,1\n2,3\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), "open,1\n2,3");
        assert_eq!(rows[0].get("b"), "");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("only,headers\n").is_empty());
    }
}
