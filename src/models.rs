use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A coordinate pair in some spatial reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

/// A geocoded location. Either both coordinate pairs are present or the
/// location is unresolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "EPSG:4326", skip_serializing_if = "Option::is_none")]
    pub epsg_4326: Option<Coordinates>,
    #[serde(rename = "EPSG:3857", skip_serializing_if = "Option::is_none")]
    pub epsg_3857: Option<Coordinates>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.epsg_4326.is_none() || self.epsg_3857.is_none()
    }
}

/// Municipal tax-account identifier for one assessed property unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollNumber(pub String);

impl fmt::Display for RollNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the "Current Year Assessment" table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentYear {
    pub year: String,
    #[serde(rename = "class")]
    pub tax_class: String,
    pub description: String,
    /// Dollar amount with thousands separators stripped.
    pub amount: String,
}

/// One instalment of the current levy year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// MM/DD/YYYY.
    pub date: String,
    pub amount: String,
}

/// One billed tax year. The first entry of `Tax::levy_years` is the current
/// year and is the only one carrying a full amount breakdown and the
/// instalment schedule; older years only have "total".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevyYear {
    pub year: String,
    /// Category label (lower-cased, underscore-joined) to amount string.
    pub amount: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub installments: Vec<Installment>,
}

/// Tax data for one roll number. Levy data is only populated for
/// non-exempt properties; exempt properties keep an explicit empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tax {
    pub roll_number: RollNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_tax_exempt: Option<bool>,
    pub assessment_years: Vec<AssessmentYear>,
    pub levy_years: Vec<LevyYear>,
}

impl Tax {
    pub fn new(roll_number: RollNumber) -> Self {
        Self {
            roll_number,
            is_tax_exempt: None,
            assessment_years: Vec::new(),
            levy_years: Vec::new(),
        }
    }
}

/// A building-permit application from the permit portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingPermit {
    pub application_number: String,
    pub description: String,
    pub status: String,
}

/// The root aggregate: everything the city knows about one property.
/// Constructed fresh per query, fully populated before being handed to the
/// caller, never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub address: Address,
    pub location: Location,
    pub ward: Option<String>,
    pub zoning: serde_json::Map<String, serde_json::Value>,
    pub temp_use: serde_json::Map<String, serde_json::Value>,
    pub building_permits: Vec<BuildingPermit>,
    pub taxes: Vec<Tax>,
}
