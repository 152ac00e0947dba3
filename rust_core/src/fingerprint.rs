//! Deterministic cache keys for upstream requests.

use std::fmt;

/// Canonical identity of a request: operation name plus its parameters.
///
/// Parameters are sorted by name (then value) before they are joined, so the
/// order in which a caller assembles them never changes the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new<I, K, V>(operation: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (escape(k.as_ref()), escape(v.as_ref())))
            .collect();
        pairs.sort();

        let mut key = escape(&operation.to_ascii_lowercase());
        for (i, (k, v)) in pairs.iter().enumerate() {
            key.push(if i == 0 { '?' } else { '&' });
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Keeps separators inside names and values from colliding with the key syntax.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            '?' => out.push_str("%3F"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_order_does_not_matter() {
        let a = Fingerprint::new("matches", [("competition", "PL"), ("days", "7")]);
        let b = Fingerprint::new("matches", [("days", "7"), ("competition", "PL")]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "matches?competition=PL&days=7");
    }

    #[test]
    fn test_distinct_parameters_distinct_keys() {
        let week = Fingerprint::new("matches", [("competition", "PL"), ("days", "7")]);
        let month = Fingerprint::new("matches", [("competition", "PL"), ("days", "30")]);
        let standings = Fingerprint::new("standings", [("competition", "PL")]);
        assert_ne!(week, month);
        assert_ne!(week, standings);
    }

    #[test]
    fn test_no_params() {
        let fp = Fingerprint::new::<_, &str, &str>("health", []);
        assert_eq!(fp.to_string(), "health");
    }

    #[test]
    fn test_separators_are_escaped() {
        let tricky = Fingerprint::new("team", [("id", "1&days=7")]);
        let plain = Fingerprint::new("team", [("id", "1"), ("days", "7")]);
        assert_ne!(tricky, plain);
    }
}
