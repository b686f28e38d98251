// src/preprocess/canonical.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::geography;
use crate::preprocess::{
    policy::{ColumnKind, ColumnPolicy},
    table::{empty_table, ColumnData, PermTable},
};

static POSTAL_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,5}").expect("valid regex"));

const UNITS_OF_PAY: &[(&str, &str)] = &[
    ("YEAR", "YR"),
    ("MONTH", "MTH"),
    ("BI-WEEKLY", "BI"),
    ("WEEK", "WK"),
    ("HOUR", "HR"),
];

/// Values nulled out by canonicalization, counted per `(column, original value)`.
pub type Unrecognized = BTreeMap<(String, String), usize>;

/// Uppercase two-letter postal code for a state entry such as `California`,
/// `ny 10001` or `WEST VIRGINIA`.
pub fn canonical_state(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c == ' ' || c.is_ascii_digit());
    let upper = trimmed.to_uppercase();
    let replaced = match geography::strip_state_name_prefix(&upper) {
        Some((code, rest)) => format!("{}{}", code, rest),
        None => upper,
    };
    let first = replaced.split_whitespace().next()?;
    geography::is_postal_code(first).then(|| first.to_string())
}

/// First run of up to five digits, zero-padded: `2139` → `02139`, `02139-4307` → `02139`.
pub fn canonical_postal_code(raw: &str) -> Option<String> {
    POSTAL_DIGITS
        .find(raw)
        .map(|m| format!("{:0>5}", m.as_str()))
}

/// Wage amount with thousands separators and a leading `$` removed.
pub fn canonical_wage(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().trim_start_matches('$').chars().filter(|c| *c != ',').collect();
    canonical_number(&cleaned)
}

pub fn canonical_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Short unit of pay (`Year` → `YR`, `Hour` → `HR`); anything not in the
/// short set after prefix replacement is rejected.
pub fn canonical_unit_of_pay(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    let replaced = UNITS_OF_PAY
        .iter()
        .find(|(long, _)| upper.starts_with(long))
        .map(|(long, short)| format!("{}{}", short, &upper[long.len()..]))
        .unwrap_or(upper);
    UNITS_OF_PAY
        .iter()
        .any(|(_, short)| *short == replaced)
        .then_some(replaced)
}

enum Canonical {
    Text(Option<String>),
    Number(Option<f64>),
}

fn canonicalize_value(kind: ColumnKind, raw: &str) -> Canonical {
    match kind {
        ColumnKind::Text => Canonical::Text(Some(raw.to_uppercase())),
        ColumnKind::Status => Canonical::Text(Some(raw.to_string())),
        ColumnKind::State => Canonical::Text(canonical_state(raw)),
        ColumnKind::PostalCode => Canonical::Text(canonical_postal_code(raw)),
        ColumnKind::UnitOfPay => Canonical::Text(canonical_unit_of_pay(raw)),
        ColumnKind::Numeric => Canonical::Number(canonical_number(raw)),
        ColumnKind::Wage => Canonical::Number(canonical_wage(raw)),
    }
}

/// Convert selected rows (policy column order) into the typed table.
pub fn canonicalize_rows(rows: &[Vec<Option<String>>], policy: &ColumnPolicy) -> (PermTable, Unrecognized) {
    let mut table = empty_table(policy);
    let mut unrecognized = Unrecognized::new();

    for (c, col) in policy.columns.iter().enumerate() {
        let column = &mut table.columns[c];
        // Duplicates were resolved on the raw key, so it is stored verbatim.
        let is_key = col.name == policy.key;
        for row in rows {
            let value = row[c].as_deref().map(|raw| {
                if is_key {
                    Canonical::Text(Some(raw.to_string()))
                } else {
                    canonicalize_value(col.kind, raw)
                }
            });
            let recognized = match (&mut *column, value) {
                (ColumnData::Text(out), Some(Canonical::Text(v))) => {
                    let ok = v.is_some();
                    out.push(v);
                    ok
                }
                (ColumnData::Number(out), Some(Canonical::Number(v))) => {
                    let ok = v.is_some();
                    out.push(v);
                    ok
                }
                (ColumnData::Text(out), None) => {
                    out.push(None);
                    true
                }
                (ColumnData::Number(out), None) => {
                    out.push(None);
                    true
                }
                // empty_table and canonicalize_value both follow ColumnKind::arrow_type
                _ => unreachable!("column type follows its kind"),
            };
            if !recognized {
                if let Some(raw) = &row[c] {
                    *unrecognized.entry((col.name.clone(), raw.clone())).or_default() += 1;
                }
            }
        }
    }

    (table, unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states() {
        assert_eq!(canonical_state("California").as_deref(), Some("CA"));
        assert_eq!(canonical_state("ny 10001").as_deref(), Some("NY"));
        assert_eq!(canonical_state(" West Virginia").as_deref(), Some("WV"));
        assert_eq!(canonical_state("VIRGIN ISLANDS").as_deref(), Some("VI"));
        assert_eq!(canonical_state("DISTRICT OF COLUMBIA").as_deref(), Some("DC"));
        assert_eq!(canonical_state("tx").as_deref(), Some("TX"));
        assert_eq!(canonical_state("ONTARIO"), None);
        assert_eq!(canonical_state("12345"), None);
    }

    #[test]
    fn postal_codes() {
        assert_eq!(canonical_postal_code("2139").as_deref(), Some("02139"));
        assert_eq!(canonical_postal_code("02139-4307").as_deref(), Some("02139"));
        assert_eq!(canonical_postal_code("941031234").as_deref(), Some("94103"));
        assert_eq!(canonical_postal_code("N/A"), None);
    }

    #[test]
    fn wages_and_numbers() {
        assert_eq!(canonical_wage("85,000.50"), Some(85000.5));
        assert_eq!(canonical_wage("$120,000"), Some(120000.0));
        assert_eq!(canonical_wage("see attached"), None);
        assert_eq!(canonical_number("NaN"), None);
        assert_eq!(canonical_number(" 12 "), Some(12.0));
    }

    #[test]
    fn units_of_pay() {
        assert_eq!(canonical_unit_of_pay("Year").as_deref(), Some("YR"));
        assert_eq!(canonical_unit_of_pay("hour").as_deref(), Some("HR"));
        assert_eq!(canonical_unit_of_pay("Bi-Weekly").as_deref(), Some("BI"));
        assert_eq!(canonical_unit_of_pay("wk").as_deref(), Some("WK"));
        assert_eq!(canonical_unit_of_pay("Hourly"), None);
        assert_eq!(canonical_unit_of_pay("Annual"), None);
    }

    #[test]
    fn rows_become_typed_columns() {
        let policy = ColumnPolicy::default();
        let n = policy.columns.len();
        let mut row = vec![None; n];
        let set = |row: &mut Vec<Option<String>>, name: &str, v: &str| {
            row[policy.index_of(name).unwrap()] = Some(v.to_string());
        };
        set(&mut row, "case_number", "a-100");
        set(&mut row, "case_status", "certified");
        set(&mut row, "fiscal_year", "2020");
        set(&mut row, "job_state", "Massachusetts");
        set(&mut row, "employer_state", "Narnia");
        set(&mut row, "prevailing_wage", "101,000");
        set(&mut row, "worker_education_level", "Doctorate");

        let (table, unrecognized) = canonicalize_rows(&[row], &policy);
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.text("case_number").unwrap()[0].as_deref(), Some("a-100"));
        assert_eq!(table.text("case_status").unwrap()[0].as_deref(), Some("certified"));
        assert_eq!(table.number("fiscal_year").unwrap()[0], Some(2020.0));
        assert_eq!(table.text("job_state").unwrap()[0].as_deref(), Some("MA"));
        assert_eq!(table.text("employer_state").unwrap()[0], None);
        assert_eq!(table.number("prevailing_wage").unwrap()[0], Some(101000.0));
        assert_eq!(table.text("worker_education_level").unwrap()[0].as_deref(), Some("DOCTORATE"));
        assert_eq!(
            unrecognized.get(&("employer_state".to_string(), "Narnia".to_string())),
            Some(&1)
        );
        assert_eq!(unrecognized.len(), 1);
    }
}
