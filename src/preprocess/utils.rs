use once_cell::sync::Lazy;
use regex::Regex;

static FY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)FY_?(\d{2,4})(?:[^0-9]|$)").expect("valid regex"));
static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])(20\d{2})(?:[^0-9]|$)").expect("valid regex"));

/// Extracts the fiscal year from a filename, trying:
///  - `FY<digits>` (two-digit years are 2000-based, `FY14` → 2014)
///  - a standalone four-digit `20xx`
pub fn fiscal_year_from_filename(filename: &str) -> Option<i32> {
    if let Some(caps) = FY_PATTERN.captures(filename) {
        let year: i32 = caps[1].parse().ok()?;
        return Some(if year < 2000 { year + 2000 } else { year });
    }
    YEAR_PATTERN
        .captures(filename)
        .and_then(|caps| caps[1].parse().ok())
}

/// Trim whitespace; empty strings become `None`.
pub fn clean_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fiscal_year_variants() {
        assert_eq!(fiscal_year_from_filename("PERM_Disclosure_Data_FY2020.xlsx"), Some(2020));
        assert_eq!(fiscal_year_from_filename("PERM_FY14.xlsx"), Some(2014));
        assert_eq!(fiscal_year_from_filename("Perm_Disclosure_Data_fy_2009.xlsx"), Some(2009));
        assert_eq!(fiscal_year_from_filename("perm_2021.xlsx"), Some(2021));
        assert_eq!(fiscal_year_from_filename("PERM_Disclosure_Data_FY2019_Q4.xlsx"), Some(2019));
        assert_eq!(fiscal_year_from_filename("perm_disclosure.xlsx"), None);
        assert_eq!(fiscal_year_from_filename("perm_120215.xlsx"), None);
    }

    #[test]
    fn fy_digits_must_end_the_number() {
        assert_eq!(fiscal_year_from_filename("PERM_FY123456.xlsx"), None);
        assert_eq!(fiscal_year_from_filename("PERM_FY2018Q2.xlsx"), Some(2018));
        assert_eq!(fiscal_year_from_filename("FY19"), Some(2019));
        // An overlong FY run falls back to a standalone year elsewhere in the name.
        assert_eq!(fiscal_year_from_filename("FY123456_2017.xlsx"), Some(2017));
    }

    #[test]
    fn clean_str_trims() {
        assert_eq!(clean_str("  CA "), Some("CA".to_string()));
        assert_eq!(clean_str("   "), None);
    }
}
