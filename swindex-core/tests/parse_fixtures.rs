//! Every mirror fixture parses through the registry under its product's format.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::PathBuf;
use swindex_core::config::FillDefaults;
use swindex_core::download::Product;
use swindex_core::parse::{AceKind, ParseContext, ParserRegistry};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mirror").join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

/// A fixture, the indices it yields and one checked value.
struct Case {
    product: Product,
    file: &'static str,
    tag: &'static str,
    indices: &'static [&'static str],
    /// Index, field, record position and expected valid value.
    check: (&'static str, &'static str, usize, Option<f64>),
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            product: Product::GfzKpWdc { definitive: true },
            file: "Kp_def2024.wdc",
            tag: "def",
            indices: &["ap", "cp", "kp"],
            check: ("kp", "Kp", 9, Some(1.0 / 3.0)),
        },
        Case {
            product: Product::GfzKpWdc { definitive: false },
            file: "Kp_now2024.wdc",
            tag: "now",
            indices: &["ap", "cp", "kp"],
            check: ("kp", "Kp", 0, Some(2.0)),
        },
        Case {
            product: Product::GfzJson { index: "Hp30", definitive: false },
            file: "Hp30_now_2024-05-01.json",
            tag: "30min",
            indices: &["hpo"],
            check: ("hpo", "Hp30", 1, Some(1.667)),
        },
        Case {
            product: Product::NoaaDst,
            file: "dst2024.txt",
            tag: "noaa",
            indices: &["dst"],
            check: ("dst", "dst", 6, Some(-22.0)),
        },
        Case {
            product: Product::SwpcDailySolarData,
            file: "daily-solar-indices.txt",
            tag: "daily",
            indices: &["f107", "flare", "sbfield", "ssn"],
            check: ("f107", "f107", 0, Some(219.0)),
        },
        Case {
            product: Product::SwpcOldDsd { quarterly: false },
            file: "2023_DSD.txt",
            tag: "prelim",
            indices: &["f107", "flare", "sbfield", "ssn"],
            check: ("f107", "f107", 1, Some(151.0)),
        },
        Case {
            product: Product::LisirdJson { dataset: "noaa_radio_flux" },
            file: "noaa_radio_flux_2024-05-01.json",
            tag: "historic",
            indices: &["f107"],
            check: ("f107", "f107", 1, None),
        },
        Case {
            product: Product::Lasp96Hour { index: "dst" },
            file: "dst_last_96_hrs.txt",
            tag: "lasp",
            indices: &["dst"],
            check: ("dst", "dst", 0, Some(-12.5)),
        },
        Case {
            product: Product::SwpcSolarGeomagPredictions,
            file: "3-day-solar-geomag-predictions.txt",
            tag: "prediction",
            indices: &["ap", "f107", "flare", "kp", "polarcap", "stormprob"],
            check: ("ap", "daily_Ap", 0, Some(8.0)),
        },
        Case {
            product: Product::SwpcGeomagForecast,
            file: "3-day-geomag-forecast.txt",
            tag: "forecast",
            indices: &["ap", "kp", "stormprob"],
            check: ("kp", "Kp", 6, Some(5.0)),
        },
        Case {
            product: Product::SwpcDailyGeomagIndices,
            file: "daily-geomagnetic-indices.txt",
            tag: "recent",
            indices: &["ap", "kp"],
            check: ("ap", "daily_Ap", 0, Some(6.0)),
        },
        Case {
            product: Product::Swpc45DayForecast,
            file: "45-day-ap-forecast.txt",
            tag: "45day",
            indices: &["ap", "f107"],
            check: ("f107", "f107", 5, Some(145.0)),
        },
        Case {
            product: Product::AceText { kind: AceKind::Swepam, realtime: true },
            file: "ace-swepam.txt",
            tag: "realtime",
            indices: &["ace_swepam"],
            check: ("ace_swepam", "sw_bulk_speed", 0, Some(412.5)),
        },
        Case {
            product: Product::NorpDaily,
            file: "TYKW-NoRP_dailyflux.txt",
            tag: "daily",
            indices: &["norp"],
            check: ("norp", "3.75_GHz", 2, Some(181.2)),
        },
    ]
}

#[test]
fn mirror_fixtures_parse_to_known_values() {
    let parsers = ParserRegistry::standard();
    let fill = FillDefaults::default();
    let file_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    for case in cases() {
        let name = case.file;
        let ctx = ParseContext::new(&fill, case.tag, file_date).with_variant(case.product.variant());
        let parsed = parsers
            .parse(case.product.format(), &fixture(name), &ctx)
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(parsed.indices().collect::<Vec<_>>(), case.indices.to_vec(), "{name}");
        for index in case.indices {
            let series = parsed.get(index).unwrap();
            assert!(!series.is_empty(), "{name}: {index} is empty");
            assert_eq!(series.source().as_str(), format!("{index}_{}", case.tag));
        }

        let (index, field, pos, expected) = case.check;
        let series = parsed.get(index).unwrap();
        let got = series.valid_f64(&series.records()[pos], field);
        match (got, expected) {
            (Some(g), Some(e)) => assert!((g - e).abs() < 1e-9, "{name}: {field}[{pos}] = {g}, expected {e}"),
            _ => assert_eq!(got, expected, "{name}: {field}[{pos}]"),
        }
    }
}

#[test]
fn every_registered_format_has_a_fixture() {
    let covered: BTreeSet<&str> = cases().iter().map(|c| c.product.format()).collect();
    let registered: BTreeSet<&str> = ParserRegistry::standard().formats().collect();
    assert_eq!(covered, registered);
}
