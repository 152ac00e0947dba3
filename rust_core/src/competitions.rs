//! Competition catalogue.
//!
//! This module provides:
//! - The static list of competitions the desktop client offers
//! - Lookup by code, numeric id or name (case-insensitive)
//! - Canonical codes so `matches 2021` and `matches PL` share a cache entry

use serde::Serialize;
use serde_json::{json, Value};

/// A competition known to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Competition {
    /// Provider code (e.g., "PL", "BL1")
    pub code: &'static str,
    /// Provider numeric id
    pub id: u32,
    pub name: &'static str,
    pub area: &'static str,
}

pub static COMPETITIONS: &[Competition] = &[
    Competition {
        code: "PL",
        id: 2021,
        name: "Premier League",
        area: "England",
    },
    Competition {
        code: "PD",
        id: 2014,
        name: "La Liga",
        area: "Spain",
    },
    Competition {
        code: "BL1",
        id: 2002,
        name: "Bundesliga",
        area: "Germany",
    },
    Competition {
        code: "SA",
        id: 2019,
        name: "Serie A",
        area: "Italy",
    },
    Competition {
        code: "CL",
        id: 2001,
        name: "Champions League",
        area: "Europe",
    },
];

/// Get a competition by code, id or name.
pub fn get_competition(key: &str) -> Option<&'static Competition> {
    let key = key.trim();
    if let Ok(id) = key.parse::<u32>() {
        return COMPETITIONS.iter().find(|c| c.id == id);
    }
    COMPETITIONS
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(key) || c.name.eq_ignore_ascii_case(key))
}

/// Provider code for a known competition; unknown identifiers pass through unchanged.
pub fn canonical_competition(key: &str) -> String {
    match get_competition(key) {
        Some(c) => c.code.to_string(),
        None => key.to_string(),
    }
}

/// Reply body for the `competitions` command.
pub fn catalogue_json() -> Value {
    json!({ "competitions": COMPETITIONS })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_competition() {
        let pl = get_competition("PL").unwrap();
        assert_eq!(pl.id, 2021);
        assert_eq!(pl.name, "Premier League");
    }

    #[test]
    fn test_case_insensitivity() {
        assert!(get_competition("bl1").is_some());
        assert!(get_competition("BL1").is_some());
        assert!(get_competition("serie a").is_some());
    }

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(get_competition("2014").map(|c| c.code), Some("PD"));
        assert!(get_competition("9999").is_none());
    }

    #[test]
    fn test_canonical_competition() {
        assert_eq!(canonical_competition("2021"), "PL");
        assert_eq!(canonical_competition("pl"), "PL");
        assert_eq!(canonical_competition("ELC"), "ELC");
    }

    #[test]
    fn test_catalogue_json() {
        let body = catalogue_json();
        let list = body["competitions"].as_array().unwrap();
        assert_eq!(list.len(), COMPETITIONS.len());
        assert_eq!(list[0]["code"], "PL");
        assert_eq!(list[0]["id"], 2021);
        assert_eq!(list[4]["code"], "CL");
    }
}
