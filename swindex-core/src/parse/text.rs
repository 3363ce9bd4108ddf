//! Line-level helpers shared by the text parsers.

use super::ParseError;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Lines numbered from 1 with trailing whitespace (and `\r`) removed.
pub(crate) fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().map(|(i, l)| (i + 1, l.trim_end()))
}

pub(crate) fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Numbered lines that are neither blank nor comments.
pub(crate) fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    numbered_lines(text).filter(|(_, l)| !is_blank(l) && !is_comment(l))
}

/// Fixed-column slice `[start, end)`; `None` for an open end.
pub(crate) fn columns(line: &str, start: usize, end: Option<usize>) -> Option<&str> {
    match end {
        Some(end) => line.get(start..end.min(line.len())).filter(|_| start < line.len()),
        None => line.get(start..),
    }
}

pub(crate) fn number(
    format: &'static str,
    line_no: usize,
    line: &str,
    token: &str,
) -> Result<f64, ParseError> {
    let token = token.trim();
    token
        .parse::<f64>()
        .map_err(|_| ParseError::malformed(format, line_no, line, format!("bad number '{token}'")))
}

/// Month number from an English abbreviation such as `May`.
pub(crate) fn month_number(abbrev: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = abbrev.trim().to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

/// `:Issued:` header, in either `2024 May 06 2205 UTC` or `0225 UT 07 May 2024` layout.
pub(crate) fn issued(text: &str) -> Option<NaiveDateTime> {
    let rest = numbered_lines(text)
        .find_map(|(_, l)| l.trim_start().strip_prefix(":Issued:"))?
        .trim();
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    match tokens.as_slice() {
        [y, mon, d, hm, ..] if y.len() == 4 && y.chars().all(|c| c.is_ascii_digit()) => {
            NaiveDateTime::parse_from_str(&format!("{y} {mon} {d} {hm}"), "%Y %b %d %H%M").ok()
        }
        [hm, _ut, d, mon, y, ..] => {
            NaiveDateTime::parse_from_str(&format!("{y} {mon} {d} {hm}"), "%Y %b %d %H%M").ok()
        }
        _ => None,
    }
}

/// Place a day and month without a year in the year nearest to `reference`.
pub(crate) fn nearest_year(day: u32, month: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let y = reference.year();
    [y - 1, y, y + 1]
        .into_iter()
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .min_by_key(|d| (*d - reference).num_days().abs())
}

/// A `:Name:` section of an SWPC colon-header product.
#[derive(Debug)]
pub(crate) struct Block<'a> {
    pub name: &'a str,
    /// Line number of the header.
    pub line: usize,
    /// Text after the closing colon on the header line.
    pub header_rest: &'a str,
    /// Content rows up to the next header, comments and blanks removed.
    pub rows: Vec<(usize, &'a str)>,
}

pub(crate) fn colon_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks: Vec<Block<'_>> = Vec::new();
    for (no, line) in numbered_lines(text) {
        let trimmed = line.trim_start();
        if let Some(after) = trimmed.strip_prefix(':') {
            if let Some(end) = after.find(':') {
                blocks.push(Block {
                    name: &after[..end],
                    line: no,
                    header_rest: &after[end + 1..],
                    rows: Vec::new(),
                });
                continue;
            }
        }
        if is_blank(line) || is_comment(line) {
            continue;
        }
        if let Some(block) = blocks.last_mut() {
            block.rows.push((no, line));
        }
    }
    blocks
}

pub(crate) fn block<'b, 'a>(blocks: &'b [Block<'a>], name: &str) -> Option<&'b Block<'a>> {
    blocks.iter().find(|b| b.name == name)
}
