//! swindex core: space-weather index adapters.
//!
//! This crate holds everything between a remote product file and a tidy
//! time series:
//! - Domain types (values with fill markers, records, series, source priorities)
//! - Format parsers, one per remote product
//! - Download adapters (HTTP and mirror sources, payload cache, batch driver)
//! - Source combiner and index unit converters
//! - Instrument registry tying the above together
//! - Configuration and export

pub mod combine;
pub mod config;
pub mod convert;
pub mod domain;
pub mod download;
pub mod export;
pub mod parse;
pub mod registry;
