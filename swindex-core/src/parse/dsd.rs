//! SWPC daily solar data: `daily-solar-indices.txt` and the yearly or
//! quarterly `*_DSD.txt` archives.
//!
//! The column set changed over the years. The number of tokens after the
//! date tells the layouts apart:
//!
//! | tokens | columns |
//! |---|---|
//! | 13 | f107 ssn area new smf bkgd C M X S 1 2 3 |
//! | 12 | f107 ssn area new smf bkgd C M X 1 2 3 |
//! | 9  | f107 ssn area new smf bkgd C M X |
//! | 8  | f107 ssn area smf bkgd 1 2 3 (1994) |
//! | 5  | f107 ssn area smf bkgd (1994) |
//!
//! Columns absent from a layout are stored as fill.

use super::text;
use super::{ParseContext, ParseError, Parsed};
use crate::domain::{day_start, FieldMeta, Record, SeriesBuilder, Value};
use chrono::{Duration, NaiveDate};

pub const FORMAT: &str = "swpc_dsd";

const SEPARATOR: &str = "#---";
const MISSING: &str = "*";

/// Field name, output index, units and description per column.
const COLUMNS: [(&str, &str, &str, &str); 13] = [
    ("f107", "f107", "SFU", "Daily 10.7 cm solar radio flux"),
    ("ssn", "ssn", "", "SESC sunspot number"),
    ("ss_area", "ssn", "10e-6 hemisphere", "Sunspot area"),
    ("new_reg", "ssn", "", "New regions"),
    ("smf", "sbfield", "G", "Stanford mean solar magnetic field"),
    ("goes_bgd_flux", "flare", "W/m^2", "GOES X-ray background flux class"),
    ("c_flare", "flare", "", "Daily C-class X-ray flare count"),
    ("m_flare", "flare", "", "Daily M-class X-ray flare count"),
    ("x_flare", "flare", "", "Daily X-class X-ray flare count"),
    ("os_flare", "flare", "", "Daily S-class optical flare count"),
    ("o1_flare", "flare", "", "Daily class 1 optical flare count"),
    ("o2_flare", "flare", "", "Daily class 2 optical flare count"),
    ("o3_flare", "flare", "", "Daily class 3 optical flare count"),
];

/// Column positions present in each layout, keyed by token count.
fn layout(tokens: usize) -> Option<&'static [usize]> {
    const WITH_S: [usize; 13] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
    const OPTICAL: [usize; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12];
    const NO_OPTICAL: [usize; 9] = [0, 1, 2, 3, 4, 5, 6, 7, 8];
    const OLD_OPTICAL: [usize; 8] = [0, 1, 2, 4, 5, 10, 11, 12];
    const OLD: [usize; 5] = [0, 1, 2, 4, 5];
    match tokens {
        13 => Some(&WITH_S),
        12 => Some(&OPTICAL),
        9 => Some(&NO_OPTICAL),
        8 => Some(&OLD_OPTICAL),
        5 => Some(&OLD),
        _ => None,
    }
}

/// Split a data line into its date and the remaining tokens.
///
/// Recent files write `2024 04 07`, files up to 1996 write `07 Apr 94`.
fn split_date<'l>(tokens: &[&'l str]) -> Option<(NaiveDate, Vec<&'l str>)> {
    let head = tokens.get(..3)?.join(" ");
    let date = NaiveDate::parse_from_str(&head, "%Y %m %d")
        .or_else(|_| NaiveDate::parse_from_str(&head, "%d %b %y"))
        .ok()?;
    Some((date, tokens[3..].to_vec()))
}

/// Parse a daily solar data file into `f107`, `ssn`, `flare` and `sbfield`.
pub fn parse_daily_solar_data(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    let lines: Vec<(usize, &str)> = text::numbered_lines(payload).collect();
    let data_start = lines
        .iter()
        .position(|(_, l)| l.trim_start().starts_with(SEPARATOR))
        .map(|i| i + 1)
        .unwrap_or(0);
    if data_start == 0 && !lines.iter().any(|(_, l)| text::is_comment(l)) {
        return Err(ParseError::missing(FORMAT, SEPARATOR));
    }

    let day = Duration::days(1);
    let mut builders: Vec<SeriesBuilder> = ["f107", "ssn", "flare", "sbfield"]
        .iter()
        .map(|index| SeriesBuilder::new(index, ctx.source(index), day))
        .collect();
    let slot = |index: &str| match index {
        "f107" => 0,
        "ssn" => 1,
        "flare" => 2,
        _ => 3,
    };
    for (field, index, units, desc) in COLUMNS {
        let meta = if field == "goes_bgd_flux" {
            FieldMeta::new(units, desc, MISSING)
        } else {
            ctx.meta(FORMAT, field, units, desc)
        };
        builders[slot(index)].declare(field, meta);
    }

    let rows = lines[data_start..]
        .iter()
        .filter(|(_, l)| !text::is_blank(l) && !text::is_comment(l) && !l.starts_with(':'));
    for &(no, line) in rows {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (date, values) = split_date(&tokens)
            .ok_or_else(|| ParseError::malformed(FORMAT, no, line, "bad date"))?;
        let present = layout(values.len()).ok_or_else(|| {
            ParseError::malformed(FORMAT, no, line, format!("unknown layout with {} columns", values.len()))
        })?;

        let time = day_start(date);
        let mut records: Vec<Record> = (0..builders.len()).map(|_| Record::new(time)).collect();
        for (&column, token) in present.iter().zip(&values) {
            let (field, index, _, _) = COLUMNS[column];
            let value = if field == "goes_bgd_flux" {
                Value::from(*token)
            } else if *token == MISSING {
                Value::from(ctx.fill.get(FORMAT, field))
            } else {
                Value::from(text::number(FORMAT, no, line, token)?)
            };
            records[slot(index)].set(field, value);
        }
        for (builder, record) in builders.iter_mut().zip(records) {
            builder.push(record);
        }
    }

    let mut out = Parsed::new();
    for builder in builders {
        out.insert(
            builder
                .build()
                .map_err(|source| ParseError::Series { format: FORMAT, source })?,
        );
    }
    Ok(out)
}
