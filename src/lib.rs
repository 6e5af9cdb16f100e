//! Hamilton property-record aggregator.
//!
//! Builds one in-memory record of everything the City of Hamilton's public
//! web services know about a property (geocoded location, ward, zoning,
//! temporary-use applications, building permits, and property-tax history),
//! starting from either a street address or a tax roll number.
//!
//! # Modules
//!
//! - `address`: street-type/direction normalization and address strings.
//! - `config`: endpoint URLs and transport tuning.
//! - `errors`: error handling types.
//! - `models`: the property record and its parts.
//! - `property`: the record assembler.
//! - `scrape`: structural table-scan helpers for the legacy HTML pages.
//! - `services`: geocoder, spatial-query, and permit-portal clients.
//! - `tax`: the legacy tax-inquiry scraper.
//! - `transport`: shared HTTP client with timeout and bounded retry.

pub mod address;
pub mod config;
pub mod errors;
pub mod models;
pub mod property;
pub mod scrape;
pub mod services;
pub mod tax;
pub mod transport;
