//! Coarse region inference for free-text found locations.
//!
//! There is no geocoder here. A found location such as
//! `"1100 E 12th St in Austin (TX) 78702"` is reduced to a short label by
//! walking an ordered list of [`Rule`]s and taking the first match. The
//! function is pure: the same address always yields the same label.

use once_cell::sync::Lazy;
use regex::Regex;

static POSTAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(78[67]\d{2})\b").expect("valid regex"));

pub const UNKNOWN_REGION: &str = "Unknown";

pub const EAST: &str = "East Austin";
pub const WEST: &str = "West Austin";
pub const NORTH: &str = "North Austin";
pub const SOUTH: &str = "South Austin";

/// Directional buckets in quadrant order, used by the heatmap hash fallback.
pub const QUADRANTS: [&str; 4] = [NORTH, EAST, SOUTH, WEST];

const NEIGHBORHOODS: &[(&str, &str)] = &[
    ("mueller", "Mueller"),
    ("zilker", "Zilker"),
    ("barton hills", "Barton Hills"),
    ("hyde park", "Hyde Park"),
    ("clarksville", "Clarksville"),
    ("downtown", "Downtown Austin"),
    ("travis heights", "Travis Heights"),
    ("bouldin", "Bouldin Creek"),
    ("montopolis", "Montopolis"),
    ("windsor park", "Windsor Park"),
    ("del valle", "Del Valle"),
    ("pflugerville", "Pflugerville"),
    ("manor", "Manor"),
];

const EAST_CODES: &[&str] = &[
    "78617", "78702", "78721", "78722", "78723", "78724", "78725", "78741", "78742", "78744",
];
const WEST_CODES: &[&str] = &[
    "78703", "78730", "78731", "78732", "78733", "78734", "78735", "78736", "78738", "78746",
];
const NORTH_CODES: &[&str] = &[
    "78660", "78664", "78681", "78705", "78726", "78727", "78728", "78729", "78750", "78751",
    "78752", "78753", "78754", "78756", "78757", "78758", "78759",
];
const SOUTH_CODES: &[&str] = &[
    "78610", "78652", "78704", "78739", "78745", "78747", "78748", "78749",
];

/// Central codes shared by several neighborhoods; a street keyword decides.
const POSTAL_OVERRIDES: &[(&str, &str, &str)] = &[
    ("78701", "congress", "Downtown Austin"),
    ("78702", "cesar chavez", "East Cesar Chavez"),
    ("78704", "barton springs", "Zilker"),
    ("78704", "s congress", "Travis Heights"),
    ("78705", "guadalupe", "West Campus"),
    ("78751", "duval", "Hyde Park"),
];

/// A location string prepared once for every rule: lowercased, with the
/// first in-area postal code pulled out.
#[derive(Debug, Clone)]
pub struct Address {
    lower: String,
    postal: Option<String>,
}

impl Address {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        let postal = extract_postal_code(&lower);
        Self { lower, postal }
    }

    pub fn postal(&self) -> Option<&str> {
        self.postal.as_deref()
    }
}

/// First standalone 5-digit run inside the Austin service area (786xx/787xx).
pub fn extract_postal_code(s: &str) -> Option<String> {
    POSTAL_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// One predicate -> label pair in the inference chain.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Case-insensitive substring of the whole address.
    Keyword {
        needle: &'static str,
        label: &'static str,
    },
    /// Postal code plus a secondary keyword.
    PostalOverride {
        code: &'static str,
        needle: &'static str,
        label: &'static str,
    },
    /// Postal code belongs to a fixed set.
    Postal {
        codes: &'static [&'static str],
        label: &'static str,
    },
    /// Bare directional word anywhere in the address.
    Direction {
        word: &'static str,
        label: &'static str,
    },
}

impl Rule {
    pub fn label(&self) -> &'static str {
        match self {
            Rule::Keyword { label, .. }
            | Rule::PostalOverride { label, .. }
            | Rule::Postal { label, .. }
            | Rule::Direction { label, .. } => *label,
        }
    }

    pub fn matches(&self, addr: &Address) -> bool {
        match self {
            Rule::Keyword { needle, .. } => addr.lower.contains(needle),
            Rule::PostalOverride { code, needle, .. } => {
                addr.postal() == Some(*code) && addr.lower.contains(needle)
            }
            Rule::Postal { codes, .. } => addr.postal().is_some_and(|p| codes.iter().any(|c| *c == p)),
            Rule::Direction { word, .. } => addr.lower.contains(word),
        }
    }
}

/// The production chain. Overrides sit ahead of the plain postal lookup
/// because evaluation stops at the first match.
pub static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let mut rules: Vec<Rule> = NEIGHBORHOODS
        .iter()
        .map(|&(needle, label)| Rule::Keyword { needle, label })
        .collect();
    rules.extend(
        POSTAL_OVERRIDES
            .iter()
            .map(|&(code, needle, label)| Rule::PostalOverride { code, needle, label }),
    );
    rules.extend([
        Rule::Postal { codes: EAST_CODES, label: EAST },
        Rule::Postal { codes: WEST_CODES, label: WEST },
        Rule::Postal { codes: NORTH_CODES, label: NORTH },
        Rule::Postal { codes: SOUTH_CODES, label: SOUTH },
        Rule::Direction { word: "east", label: EAST },
        Rule::Direction { word: "west", label: WEST },
        Rule::Direction { word: "north", label: NORTH },
        Rule::Direction { word: "south", label: SOUTH },
    ]);
    rules
});

pub fn infer_region_with(rules: &[Rule], address: &str) -> Option<&'static str> {
    if address.trim().is_empty() {
        return None;
    }
    let addr = Address::parse(address);
    rules.iter().find(|r| r.matches(&addr)).map(Rule::label)
}

/// Infer a region label, or `None` when no rule matches.
pub fn infer_region(address: &str) -> Option<&'static str> {
    infer_region_with(&RULES, address)
}

/// Deterministic directional bucket for an address no rule could place.
pub fn hash_quadrant(address: &str) -> &'static str {
    let h = crate::util::stable_hash(address.trim());
    QUADRANTS[h.unsigned_abs() as usize % QUADRANTS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighborhood_keywords_win_first() {
        assert_eq!(infer_region("4300 Mueller Blvd 78723"), Some("Mueller"));
        assert_eq!(infer_region("ZILKER PARK in Austin (TX)"), Some("Zilker"));
        assert_eq!(infer_region("Del Valle (TX)"), Some("Del Valle"));
    }

    #[test]
    fn postal_codes_map_to_directions() {
        assert_eq!(infer_region("1100 E 12th St in Austin (TX) 78702"), Some(EAST));
        assert_eq!(infer_region("2200 Exposition Blvd 78703"), Some(WEST));
        assert_eq!(infer_region("12400 Metric Blvd 78758"), Some(NORTH));
        assert_eq!(infer_region("9300 Slaughter Ln 78748-1234"), Some(SOUTH));
    }

    #[test]
    fn overrides_apply_only_inside_their_postal_code() {
        assert_eq!(
            infer_region("2100 Barton Springs Rd 78704"),
            Some("Zilker")
        );
        assert_eq!(infer_region("1500 S Congress Ave 78704"), Some("Travis Heights"));
        assert_eq!(infer_region("2400 Guadalupe St 78705"), Some("West Campus"));
        // Same street, different code: the plain postal rule applies.
        assert_eq!(infer_region("8000 Guadalupe St 78752"), Some(NORTH));
    }

    #[test]
    fn out_of_area_codes_are_ignored() {
        assert_eq!(extract_postal_code("po box 12345"), None);
        assert_eq!(extract_postal_code("suite 787021"), None);
        assert_eq!(extract_postal_code("austin 78745"), Some("78745".to_string()));
        assert_eq!(
            extract_postal_code("unit 786221, austin, tx 78610."),
            Some("78610".to_string())
        );
        assert_eq!(infer_region("100 Main St 90210"), None);
    }

    #[test]
    fn directional_words_are_the_last_resort() {
        assert_eq!(infer_region("E 7th St & Pleasant Valley, east side"), Some(EAST));
        assert_eq!(infer_region("North Lamar in Austin (TX)"), Some(NORTH));
        assert_eq!(infer_region("7201 Levander Loop in Austin (TX)"), None);
        assert_eq!(infer_region(""), None);
    }

    #[test]
    fn inference_is_pure() {
        let addr = "1156 W Cesar Chavez St 78703";
        let first = infer_region(addr);
        for _ in 0..100 {
            assert_eq!(infer_region(addr), first);
        }
        assert_eq!(first, Some(WEST));
    }

    #[test]
    fn rules_can_be_reordered() {
        let directions_first = [
            Rule::Direction { word: "east", label: EAST },
            Rule::Keyword { needle: "mueller", label: "Mueller" },
        ];
        assert_eq!(
            infer_region_with(&directions_first, "Mueller, east austin"),
            Some(EAST)
        );
        assert_eq!(infer_region("Mueller, east austin"), Some("Mueller"));
    }

    #[test]
    fn hash_quadrant_is_stable() {
        let label = hash_quadrant("7201 Levander Loop in Austin (TX)");
        assert!(QUADRANTS.contains(&label));
        assert_eq!(label, hash_quadrant("7201 Levander Loop in Austin (TX)"));
    }
}
