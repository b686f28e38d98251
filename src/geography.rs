//! U.S. states, the federal district and territories.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 50 U.S. states, one federal district and five U.S. territories, by postal code.
pub const US_STATES: &[(&str, &str)] = &[
    ("AK", "Alaska"),
    ("AL", "Alabama"),
    ("AR", "Arkansas"),
    ("AS", "American Samoa"),
    ("AZ", "Arizona"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DC", "District of Columbia"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("GU", "Guam"),
    ("HI", "Hawaii"),
    ("IA", "Iowa"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("MA", "Massachusetts"),
    ("MD", "Maryland"),
    ("ME", "Maine"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MO", "Missouri"),
    ("MP", "Northern Mariana Islands"),
    ("MS", "Mississippi"),
    ("MT", "Montana"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("NE", "Nebraska"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NV", "Nevada"),
    ("NY", "New York"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("PR", "Puerto Rico"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VA", "Virginia"),
    ("VI", "U.S. Virgin Islands"),
    ("VT", "Vermont"),
    ("WA", "Washington"),
    ("WI", "Wisconsin"),
    ("WV", "West Virginia"),
    ("WY", "Wyoming"),
];

pub const TERRITORIES: &[&str] = &["AS", "GU", "MP", "PR", "VI"];

/// Spellings the Department of Labor uses besides the names above.
const NAME_ALIASES: &[(&str, &str)] = &[("Virgin Islands", "VI")];

/// Uppercased full name → postal code, including aliases.
static BY_NAME: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    US_STATES
        .iter()
        .map(|(code, name)| (name.to_uppercase(), *code))
        .chain(NAME_ALIASES.iter().map(|(name, code)| (name.to_uppercase(), *code)))
        .collect()
});

/// Full names (uppercased) ordered longest first, for prefix matching.
static NAMES_LONGEST_FIRST: Lazy<Vec<(String, &'static str)>> = Lazy::new(|| {
    let mut names: Vec<(String, &'static str)> =
        BY_NAME.iter().map(|(name, code)| (name.clone(), *code)).collect();
    names.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    names
});

pub fn us_states() -> &'static [(&'static str, &'static str)] {
    US_STATES
}

pub fn is_postal_code(code: &str) -> bool {
    US_STATES.iter().any(|(c, _)| *c == code)
}

pub fn state_name(code: &str) -> Option<&'static str> {
    US_STATES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code.trim()))
        .map(|(_, name)| *name)
}

/// Postal code for either a postal code or a full name, case-insensitively.
pub fn postal_code(name_or_code: &str) -> Option<&'static str> {
    let upper = name_or_code.trim().to_uppercase();
    if let Some((code, _)) = US_STATES.iter().find(|(c, _)| *c == upper) {
        return Some(*code);
    }
    BY_NAME.get(&upper).copied()
}

/// If `upper` starts with a full state name, return the code and the rest.
pub(crate) fn strip_state_name_prefix(upper: &str) -> Option<(&'static str, &str)> {
    NAMES_LONGEST_FIRST
        .iter()
        .find(|(name, _)| upper.starts_with(name.as_str()))
        .map(|(name, code)| (*code, &upper[name.len()..]))
}
