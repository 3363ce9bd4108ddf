//! ACE real-time solar wind text files, from SWPC (`ace-magnetometer.txt`)
//! or the NASA daily archive (`20240506_ace_mag_1m.txt`).
//!
//! Every data line is `YYYY MM DD HHMM MJD SEC` followed by the instrument
//! columns. Status columns follow the ACE convention: 0 nominal, 1 to 8 bad
//! record, 9 no data.

use super::text;
use super::{ParseContext, ParseError, Parsed};
use crate::domain::{FieldMeta, Record, Series, SeriesBuilder, Value};
use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::warn;

pub const FORMAT: &str = "ace_text";

const SEPARATOR: &str = "#-----------------";
const FILL_HEADER: &str = "Missing data values:";
const NOT_FOUND: &str = "not found on this server";
const NO_DATA_STATUS: f64 = 9.0;

/// One ACE instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AceKind {
    Mag,
    Swepam,
    Epam,
    Sis,
}

/// `(name, units, description)`
type Column = (&'static str, &'static str, &'static str);

const MAG: [Column; 7] = [
    ("status", "", "Status flag"),
    ("bx_gsm", "nT", "1-min averaged IMF Bx (GSM)"),
    ("by_gsm", "nT", "1-min averaged IMF By (GSM)"),
    ("bz_gsm", "nT", "1-min averaged IMF Bz (GSM)"),
    ("bt_gsm", "nT", "1-min averaged IMF Bt"),
    ("lat_gsm", "degrees", "GSM latitude of the magnetic field"),
    ("lon_gsm", "degrees", "GSM longitude of the magnetic field"),
];
const SWEPAM: [Column; 4] = [
    ("status", "", "Status flag"),
    ("sw_proton_dens", "p/cc", "Solar wind proton density"),
    ("sw_bulk_speed", "km/s", "Solar wind bulk speed"),
    ("sw_ion_temp", "K", "Solar wind ion temperature"),
];
const EPAM: [Column; 10] = [
    ("status_e", "", "Electron status flag"),
    ("eflux_38-53", "particles/cm2-s-ster-MeV", "38-53 keV differential electron flux"),
    ("eflux_175-315", "particles/cm2-s-ster-MeV", "175-315 keV differential electron flux"),
    ("status_p", "", "Proton status flag"),
    ("pflux_47-68", "particles/cm2-s-ster-MeV", "47-68 keV differential proton flux"),
    ("pflux_115-195", "particles/cm2-s-ster-MeV", "115-195 keV differential proton flux"),
    ("pflux_310-580", "particles/cm2-s-ster-MeV", "310-580 keV differential proton flux"),
    ("pflux_795-1193", "particles/cm2-s-ster-MeV", "795-1193 keV differential proton flux"),
    ("pflux_1060-1900", "particles/cm2-s-ster-MeV", "1060-1900 keV differential proton flux"),
    ("anis_ind", "", "Ratio of sectored to unsectored 115-195 keV proton flux"),
];
const SIS: [Column; 4] = [
    ("status_10", "", "Status flag for the >10 MeV flux"),
    ("int_pflux_10MeV", "p/cs2-sec-ster", "Integral proton flux >10 MeV"),
    ("status_30", "", "Status flag for the >30 MeV flux"),
    ("int_pflux_30MeV", "p/cs2-sec-ster", "Integral proton flux >30 MeV"),
];

impl AceKind {
    pub const ALL: [AceKind; 4] = [AceKind::Mag, AceKind::Swepam, AceKind::Epam, AceKind::Sis];

    pub fn name(self) -> &'static str {
        match self {
            AceKind::Mag => "mag",
            AceKind::Swepam => "swepam",
            AceKind::Epam => "epam",
            AceKind::Sis => "sis",
        }
    }

    pub fn from_name(name: &str) -> Option<AceKind> {
        AceKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Series index, e.g. `ace_mag`.
    pub fn index(self) -> &'static str {
        match self {
            AceKind::Mag => "ace_mag",
            AceKind::Swepam => "ace_swepam",
            AceKind::Epam => "ace_epam",
            AceKind::Sis => "ace_sis",
        }
    }

    /// Sample spacing in minutes.
    pub fn cadence_minutes(self) -> i64 {
        match self {
            AceKind::Mag | AceKind::Swepam => 1,
            AceKind::Epam | AceKind::Sis => 5,
        }
    }

    fn columns(self) -> &'static [Column] {
        match self {
            AceKind::Mag => &MAG,
            AceKind::Swepam => &SWEPAM,
            AceKind::Epam => &EPAM,
            AceKind::Sis => &SIS,
        }
    }

    /// Each status field and the data fields it vouches for.
    pub fn status_groups(self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            AceKind::Mag => &[(
                "status",
                &["bx_gsm", "by_gsm", "bz_gsm", "bt_gsm", "lat_gsm", "lon_gsm"],
            )],
            AceKind::Swepam => &[("status", &["sw_proton_dens", "sw_bulk_speed", "sw_ion_temp"])],
            AceKind::Epam => &[
                ("status_e", &["eflux_38-53", "eflux_175-315"]),
                (
                    "status_p",
                    &["pflux_47-68", "pflux_115-195", "pflux_310-580", "pflux_795-1193", "pflux_1060-1900"],
                ),
            ],
            AceKind::Sis => &[("status_10", &["int_pflux_10MeV"]), ("status_30", &["int_pflux_30MeV"])],
        }
    }

    /// Measurement fields: everything that is not a status flag.
    pub fn data_fields(self) -> impl Iterator<Item = &'static str> {
        self.columns()
            .iter()
            .map(|(name, _, _)| *name)
            .filter(|name| !name.starts_with("status"))
    }
}

/// Fill values announced by the `# Missing data values:` header.
///
/// The header either gives one value for every column or labels them, as in
/// `Density and Speed = -9999.9, Temp. = -1.00e+05`.
fn header_fills(payload: &str, kind: AceKind) -> BTreeMap<&'static str, f64> {
    let mut fills = BTreeMap::new();
    let Some(listed) = text::numbered_lines(payload)
        .filter(|(_, l)| text::is_comment(l))
        .find_map(|(_, l)| l.split_once(FILL_HEADER).map(|(_, rest)| rest))
    else {
        return fills;
    };

    for part in listed.split(',') {
        let (label, value) = match part.split_once('=') {
            Some((label, value)) => (label.trim().to_ascii_lowercase(), value),
            None => (String::new(), part),
        };
        let Ok(value) = value.trim().parse::<f64>() else {
            continue;
        };
        for field in kind.data_fields() {
            let matched = label.is_empty()
                || (label.contains("dens") && field.contains("dens"))
                || (label.contains("speed") && field.contains("speed"))
                || (label.contains("temp") && field.contains("temp"))
                || (label.contains("anis") && field == "anis_ind");
            if matched {
                // labelled entries override the catch-all
                if label.is_empty() {
                    fills.entry(field).or_insert(value);
                } else {
                    fills.insert(field, value);
                }
            }
        }
    }
    fills
}

/// Parse one ACE file. The instrument comes from `ctx.variant`.
pub fn parse_ace(payload: &str, ctx: &ParseContext<'_>) -> Result<Parsed, ParseError> {
    let kind = AceKind::from_name(ctx.variant)
        .ok_or_else(|| ParseError::invalid(FORMAT, format!("unknown ACE instrument '{}'", ctx.variant)))?;
    let index = kind.index();
    let mut builder = SeriesBuilder::new(index, ctx.source(index), Duration::minutes(kind.cadence_minutes()))
        .field("jd", FieldMeta::new("days", "Modified Julian Day", f64::NAN))
        .field("sec", FieldMeta::new("s", "Seconds of the Julian day", f64::NAN));
    let fills = header_fills(payload, kind);
    for &(name, units, desc) in kind.columns() {
        let meta = if name.starts_with("status") {
            FieldMeta::new(units, desc, NO_DATA_STATUS).with_range(0.0, NO_DATA_STATUS)
        } else {
            match fills.get(name) {
                Some(&fill) => FieldMeta::new(units, desc, fill),
                None => ctx.meta(FORMAT, name, units, desc),
            }
        };
        builder.declare(name, meta);
    }

    let lines: Vec<(usize, &str)> = text::numbered_lines(payload).collect();
    if lines.iter().any(|(_, l)| l.contains(NOT_FOUND)) {
        warn!(instrument = kind.name(), "ACE file not found on server");
        return finish(builder).map(Parsed::single);
    }
    let data_start = lines
        .iter()
        .position(|(_, l)| l.starts_with(SEPARATOR))
        .ok_or_else(|| ParseError::missing(FORMAT, SEPARATOR))?;

    let columns = kind.columns();
    let expected = 6 + columns.len();
    for &(no, line) in &lines[data_start + 1..] {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() || text::is_comment(line) {
            continue;
        }
        if tokens.len() != expected {
            return Err(ParseError::malformed(
                FORMAT,
                no,
                line,
                format!("expected {expected} columns, found {}", tokens.len()),
            ));
        }
        let time = NaiveDateTime::parse_from_str(&tokens[..4].join(" "), "%Y %m %d %H%M")
            .map_err(|_| ParseError::malformed(FORMAT, no, line, "bad timestamp"))?;
        let mut record = Record::new(Utc.from_utc_datetime(&time))
            .with("jd", text::number(FORMAT, no, line, tokens[4])?)
            .with("sec", text::number(FORMAT, no, line, tokens[5])?);
        for (&(name, _, _), token) in columns.iter().zip(&tokens[6..]) {
            record.set(name, text::number(FORMAT, no, line, token)?);
        }
        builder.push(record);
    }

    finish(builder).map(Parsed::single)
}

fn finish(builder: SeriesBuilder) -> Result<Series, ParseError> {
    builder
        .build()
        .map_err(|source| ParseError::Series { format: FORMAT, source })
}

/// Apply the status flags: data vouched for by a status above `max_status`
/// becomes fill, then records without any valid data are dropped.
pub fn apply_status(series: Series, kind: AceKind, max_status: u8) -> Series {
    let max_status = f64::from(max_status);
    let masked = series.map_values(|_, fields, values| {
        for (status_field, data_fields) in kind.status_groups() {
            let status = values.get(*status_field).and_then(Value::as_f64);
            if status.map_or(true, |s| s <= max_status) {
                continue;
            }
            for field in data_fields.iter() {
                if let Some(meta) = fields.get(*field) {
                    values.insert(field.to_string(), meta.fill.clone());
                }
            }
        }
    });
    masked.retain(|record| {
        kind.data_fields().any(|field| {
            let meta = masked.field(field);
            record
                .get(field)
                .zip(meta)
                .is_some_and(|(v, m)| m.valid_f64(v).is_some())
        })
    })
}
