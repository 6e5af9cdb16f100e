use serde::{Deserialize, Serialize};
use std::fmt;

/// Street-type abbreviation table, in match order. Each abbreviation is
/// listed in upper case and title case because the upstream services emit
/// both. First matching rule wins; matching is case-sensitive over the
/// whole token.
pub const STREET_TYPES: &[(&str, &str)] = &[
    ("ST", "STREET"),
    ("St", "Street"),
    ("AVE", "AVENUE"),
    ("Ave", "Avenue"),
    ("BLVD", "BOULEVARD"),
    ("Blvd", "Boulevard"),
    ("CIR", "CIRCLE"),
    ("Cir", "Circle"),
    ("CRT", "COURT"),
    ("Crt", "Court"),
    ("CRES", "CRESCENT"),
    ("Cres", "Crescent"),
    ("DR", "DRIVE"),
    ("Dr", "Drive"),
    ("GDN", "GARDEN"),
    ("Gdn", "Garden"),
    ("HTS", "HEIGHTS"),
    ("Hts", "Heights"),
    ("HWY", "HIGHWAY"),
    ("Hwy", "Highway"),
    ("PKY", "PARKWAY"),
    ("Pky", "Parkway"),
    ("PL", "PLACE"),
    ("Pl", "Place"),
    ("RD", "ROAD"),
    ("Rd", "Road"),
    ("SQ", "SQUARE"),
    ("Sq", "Square"),
    ("TERR", "TERRACE"),
    ("Terr", "Terrace"),
    ("EXWY", "EXPRESSWAY"),
    ("Exwy", "Expressway"),
];

/// Direction abbreviation table, same matching policy as `STREET_TYPES`.
pub const DIRECTIONS: &[(&str, &str)] = &[
    ("N", "North"),
    ("S", "South"),
    ("E", "East"),
    ("W", "West"),
];

/// Expands an abbreviated street-type token ("ST" -> "STREET"). An
/// unrecognized token is returned unchanged; absence of a match is not an
/// error.
pub fn expand_type(token: &str) -> String {
    lookup(STREET_TYPES, token, false)
}

/// Contracts a long street-type token ("STREET" -> "ST").
pub fn contract_type(token: &str) -> String {
    lookup(STREET_TYPES, token, true)
}

/// Expands a direction token ("S" -> "South").
pub fn expand_direction(token: &str) -> String {
    lookup(DIRECTIONS, token, false)
}

/// Contracts a direction token ("South" -> "S").
pub fn contract_direction(token: &str) -> String {
    lookup(DIRECTIONS, token, true)
}

fn lookup(table: &[(&str, &str)], token: &str, reverse: bool) -> String {
    for (short, long) in table {
        let (from, to) = if reverse { (long, short) } else { (short, long) };
        if *from == token {
            return to.to_string();
        }
    }
    token.to_string()
}

/// The lower-tier municipalities the tax-inquiry application recognizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum City {
    Hamilton,
    Ancaster,
    Dundas,
    Flamborough,
    Glanbrook,
    #[serde(rename = "Stoney Creek")]
    StoneyCreek,
    #[default]
    Unknown,
}

impl City {
    /// Case-insensitive name lookup; the legacy inquiry pages render
    /// municipality names in upper case.
    pub fn parse(name: &str) -> City {
        match name.trim().to_ascii_uppercase().as_str() {
            "HAMILTON" => City::Hamilton,
            "ANCASTER" => City::Ancaster,
            "DUNDAS" => City::Dundas,
            "FLAMBOROUGH" => City::Flamborough,
            "GLANBROOK" => City::Glanbrook,
            "STONEY CREEK" => City::StoneyCreek,
            _ => City::Unknown,
        }
    }

    /// Community code the tax-inquiry search form expects. An unknown or
    /// missing city searches all communities.
    pub fn community_code(&self) -> &'static str {
        match self {
            City::Hamilton => "ham010081",
            City::Ancaster => "anc140140",
            City::Dundas => "dun260260",
            City::Flamborough => "fla301303",
            City::Glanbrook => "gla901902",
            City::StoneyCreek => "scr003003",
            City::Unknown => "all000999",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            City::Hamilton => "Hamilton",
            City::Ancaster => "Ancaster",
            City::Dundas => "Dundas",
            City::Flamborough => "Flamborough",
            City::Glanbrook => "Glanbrook",
            City::StoneyCreek => "Stoney Creek",
            City::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// A municipal street address. Short/long street type and direction are
/// mutually derivable; `normalized` fills in whichever half is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub street_number: String,
    pub street_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_type_short: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_type_long: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_direction_short: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_direction_long: Option<String>,
    pub city: City,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Set true only after a successful geocode match.
    pub validated: bool,
}

impl Address {
    /// Builds a normalized address from a house number, a free-form
    /// long-form road string ("Tisdale Street South"), and a city. This is
    /// the shape upstream geocoder payloads deliver an address in.
    pub fn from_parts(street_number: &str, road: &str, city: City) -> Address {
        let parsed = parse_road(road);
        Address {
            street_number: street_number.to_string(),
            street_name: parsed.street_name,
            street_type_long: parsed.street_type_long,
            street_direction_long: parsed.street_direction_long,
            city,
            ..Default::default()
        }
        .normalized()
    }

    /// Returns a copy with the missing half of each short/long pair derived
    /// from the present half. Pairs where both halves are already set are
    /// never touched; absent pairs stay absent.
    pub fn normalized(&self) -> Address {
        let mut address = self.clone();

        match (&address.street_type_short, &address.street_type_long) {
            (Some(short), None) => address.street_type_long = Some(expand_type(short)),
            (None, Some(long)) => address.street_type_short = Some(contract_type(long)),
            _ => {}
        }
        match (
            &address.street_direction_short,
            &address.street_direction_long,
        ) {
            (Some(short), None) => address.street_direction_long = Some(expand_direction(short)),
            (None, Some(long)) => address.street_direction_short = Some(contract_direction(long)),
            _ => {}
        }
        address
    }

    /// Single-line form the geocoder expects:
    /// `"{number} {name} {type_long} [{direction_long}] [{city}]"`.
    pub fn single_line(&self) -> String {
        let mut parts = vec![self.street_number.clone(), self.street_name.clone()];
        if let Some(ref t) = self.street_type_long {
            parts.push(t.clone());
        }
        if let Some(ref d) = self.street_direction_long {
            parts.push(d.clone());
        }
        if self.city != City::Unknown {
            parts.push(self.city.to_string());
        }
        parts.join(" ")
    }

    /// Street string the tax-inquiry search form expects. The form chokes
    /// on long street types and directions, so this uses the short forms:
    /// `"{name} {type_short} [{direction_short}]"`.
    pub fn tax_search_street(&self) -> String {
        let mut s = self.street_name.clone();
        if let Some(ref t) = self.street_type_short {
            s.push(' ');
            s.push_str(t);
        }
        if let Some(ref d) = self.street_direction_short {
            s.push(' ');
            s.push_str(d);
        }
        s
    }

    /// Semicolon-joined address key the permit portal's search posts:
    /// `"{number};{city};{name}[;{direction_long}];"`. The portal only
    /// covers the amalgamated city, so an unknown city falls back to
    /// HAMILTON.
    pub fn permit_search_key(&self) -> String {
        let city = if self.city == City::Unknown {
            "HAMILTON".to_string()
        } else {
            self.city.to_string()
        };
        let mut key = format!("{};{};{}", self.street_number, city, self.street_name);
        if let Some(ref d) = self.street_direction_long {
            key.push(';');
            key.push_str(d);
        }
        key.push(';');
        key
    }
}

/// A street string split into its parts by [`parse_road`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoad {
    pub street_name: String,
    pub street_type_long: Option<String>,
    pub street_direction_long: Option<String>,
}

/// Splits a free-form road string ("Tisdale Street South") into street
/// name, long street type, and optional long direction. The direction, if
/// present, is the trailing token; the type is the token before it.
pub fn parse_road(road: &str) -> ParsedRoad {
    let tokens: Vec<&str> = road.split_whitespace().collect();
    let is_direction =
        |t: &str| DIRECTIONS.iter().any(|(_, long)| *long == t);

    match tokens.as_slice() {
        [] => ParsedRoad {
            street_name: String::new(),
            street_type_long: None,
            street_direction_long: None,
        },
        [only] => ParsedRoad {
            street_name: (*only).to_string(),
            street_type_long: None,
            street_direction_long: None,
        },
        [.., _second_last, last] if is_direction(last) => ParsedRoad {
            street_name: tokens[..tokens.len() - 2].join(" "),
            street_type_long: Some(tokens[tokens.len() - 2].to_string()),
            street_direction_long: Some((*last).to_string()),
        },
        [..] => ParsedRoad {
            street_name: tokens[..tokens.len() - 1].join(" "),
            street_type_long: Some(tokens[tokens.len() - 1].to_string()),
            street_direction_long: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_and_contract_round_trip() {
        for (short, long) in STREET_TYPES {
            assert_eq!(contract_type(&expand_type(short)), *short);
            assert_eq!(expand_type(&contract_type(long)), *long);
        }
        for (short, long) in DIRECTIONS {
            assert_eq!(contract_direction(&expand_direction(short)), *short);
            assert_eq!(expand_direction(&contract_direction(long)), *long);
        }
    }

    #[test]
    fn expansion_is_idempotent_on_long_forms() {
        for (_, long) in STREET_TYPES {
            assert_eq!(expand_type(long), *long);
            assert_eq!(expand_type(&expand_type(long)), expand_type(long));
        }
        for (_, long) in DIRECTIONS {
            assert_eq!(expand_direction(long), *long);
        }
    }

    #[test]
    fn unrecognized_tokens_pass_through() {
        assert_eq!(expand_type("XYZZY"), "XYZZY");
        assert_eq!(contract_type("XYZZY"), "XYZZY");
        assert_eq!(expand_direction("Q"), "Q");
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(expand_type("st"), "st");
        assert_eq!(expand_type("St"), "Street");
        assert_eq!(expand_type("ST"), "STREET");
    }

    #[test]
    fn normalized_fills_missing_long_forms() {
        let address = Address {
            street_number: "73".to_string(),
            street_name: "Tisdale".to_string(),
            street_type_short: Some("ST".to_string()),
            street_direction_short: Some("S".to_string()),
            city: City::Hamilton,
            ..Default::default()
        };
        let normalized = address.normalized();
        assert_eq!(normalized.street_type_long.as_deref(), Some("STREET"));
        assert_eq!(normalized.street_direction_long.as_deref(), Some("South"));
        assert_eq!(normalized.street_type_short.as_deref(), Some("ST"));
    }

    #[test]
    fn normalized_fills_missing_short_forms() {
        let address = Address {
            street_number: "17".to_string(),
            street_name: "Discovery".to_string(),
            street_type_long: Some("Drive".to_string()),
            city: City::Hamilton,
            ..Default::default()
        };
        let normalized = address.normalized();
        assert_eq!(normalized.street_type_short.as_deref(), Some("Dr"));
        assert!(normalized.street_direction_short.is_none());
        assert!(normalized.street_direction_long.is_none());
    }

    #[test]
    fn normalized_never_touches_complete_pairs() {
        let address = Address {
            street_number: "1".to_string(),
            street_name: "Main".to_string(),
            street_type_short: Some("ST".to_string()),
            street_type_long: Some("Boulevard".to_string()),
            ..Default::default()
        };
        let normalized = address.normalized();
        assert_eq!(normalized.street_type_short.as_deref(), Some("ST"));
        assert_eq!(normalized.street_type_long.as_deref(), Some("Boulevard"));
    }

    #[test]
    fn community_codes() {
        assert_eq!(City::Hamilton.community_code(), "ham010081");
        assert_eq!(City::StoneyCreek.community_code(), "scr003003");
        assert_eq!(City::Unknown.community_code(), "all000999");
        assert_eq!(City::parse("Nowheresville"), City::Unknown);
        assert_eq!(City::parse("Stoney Creek"), City::StoneyCreek);
    }

    #[test]
    fn city_parse_ignores_case() {
        assert_eq!(City::parse("HAMILTON"), City::Hamilton);
        assert_eq!(City::parse("STONEY CREEK"), City::StoneyCreek);
        assert_eq!(City::parse(" dundas "), City::Dundas);
    }

    #[test]
    fn single_line_includes_direction_and_city() {
        let address = Address {
            street_number: "73".to_string(),
            street_name: "Tisdale".to_string(),
            street_type_short: Some("ST".to_string()),
            street_direction_short: Some("S".to_string()),
            city: City::Hamilton,
            ..Default::default()
        }
        .normalized();
        assert_eq!(address.single_line(), "73 Tisdale STREET South Hamilton");
        assert_eq!(address.tax_search_street(), "Tisdale ST S");
        assert_eq!(address.permit_search_key(), "73;Hamilton;Tisdale;South;");
    }

    #[test]
    fn from_parts_splits_road_and_contracts() {
        let address = Address::from_parts("73", "Tisdale Street South", City::Hamilton);
        assert_eq!(address.street_name, "Tisdale");
        assert_eq!(address.street_type_long.as_deref(), Some("Street"));
        assert_eq!(address.street_type_short.as_deref(), Some("St"));
        assert_eq!(address.street_direction_short.as_deref(), Some("S"));
        assert_eq!(address.single_line(), "73 Tisdale Street South Hamilton");
        assert_eq!(address.tax_search_street(), "Tisdale St S");

        let address = Address::from_parts("689", "West 5th Street", City::Hamilton);
        assert_eq!(address.street_name, "West 5th");
        assert!(address.street_direction_long.is_none());
    }

    #[test]
    fn parse_road_with_direction() {
        let parsed = parse_road("Tisdale Street South");
        assert_eq!(parsed.street_name, "Tisdale");
        assert_eq!(parsed.street_type_long.as_deref(), Some("Street"));
        assert_eq!(parsed.street_direction_long.as_deref(), Some("South"));
    }

    #[test]
    fn parse_road_without_direction() {
        // "West 5th" starts with a direction word; only the trailing token
        // counts as one.
        let parsed = parse_road("West 5th Street");
        assert_eq!(parsed.street_name, "West 5th");
        assert_eq!(parsed.street_type_long.as_deref(), Some("Street"));
        assert!(parsed.street_direction_long.is_none());
    }

    #[test]
    fn parse_road_degenerate_inputs() {
        assert_eq!(parse_road("").street_name, "");
        let single = parse_road("Broadway");
        assert_eq!(single.street_name, "Broadway");
        assert!(single.street_type_long.is_none());
    }
}
