// Column-name heuristics.
//
// Source exports never agree on column names, so every fuzzy match the
// aggregators rely on lives here as a named predicate. All name checks are
// case-insensitive substring tests on the column name.
use crate::types::{Record, Scalar};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

pub const GENDER_FIELD: &str = "Gender";
/// Gender column left behind by an upstream join of two sheets.
pub const GENDER_FALLBACK_FIELD: &str = "Gender_x";
pub const REGION_FIELDS: &[&str] = &["Region Name", "Region"];
pub const DISTRICT_FIELDS: &[&str] = &["District Name", "District"];
pub const BLOCK_FIELDS: &[&str] = &["Block Name", "Block"];
pub const STATE_FIELDS: &[&str] = &["State Name", "State"];
pub const AGE_BAND_FIELDS: &[&str] = &["Age Band", "AgeBand"];
pub const YEAR_FIELD: &str = "Year";
pub const YEAR_FIELDS: &[&str] = &[YEAR_FIELD];
pub const ENROLLMENT_STATUS_FIELDS: &[&str] = &[
    "If enrolled, enrollment status",
    "Enrollment Status",
    "Educational Status",
];
pub const CURRENTLY_IN_SCHOOL: &str = "currently going to school";

static YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").unwrap());

static STATE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Jammu & Kashmir", "Jammu and Kashmir"),
        ("J&K", "Jammu and Kashmir"),
        ("Jammu And Kashmir", "Jammu and Kashmir"),
        ("AP", "Andhra Pradesh"),
        ("MP", "Madhya Pradesh"),
        ("UP", "Uttar Pradesh"),
        ("WB", "West Bengal"),
        ("TN", "Tamil Nadu"),
        ("Orissa", "Odisha"),
        ("Mumbai", "Maharashtra"),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Boy,
    Girl,
}

/// Classify a free-text gender value. Unknown spellings return `None` and
/// count toward neither bucket.
pub fn classify_gender(value: &str) -> Option<Gender> {
    match value.trim().to_lowercase().as_str() {
        "male" | "boy" => Some(Gender::Boy),
        "female" | "girl" => Some(Gender::Girl),
        _ => None,
    }
}

pub fn gender_of(record: &Record) -> Option<Gender> {
    record.text(GENDER_FIELD).and_then(classify_gender)
}

/// Looser classification used when building summary documents: also takes
/// the one-letter `m` / `f` codes some exports use.
pub fn classify_reported_gender(value: &str) -> Option<Gender> {
    match value.trim().to_lowercase().as_str() {
        "m" => Some(Gender::Boy),
        "f" => Some(Gender::Girl),
        other => classify_gender(other),
    }
}

/// Gender as summary documents count it: the `Gender` column when present,
/// otherwise `Gender_x`.
pub fn reported_gender_of(record: &Record) -> Option<Gender> {
    record
        .get(GENDER_FIELD)
        .or_else(|| record.get(GENDER_FALLBACK_FIELD))
        .and_then(Scalar::as_str)
        .and_then(classify_reported_gender)
}

/// Pre-summed boys column: "Total Boys", "Boys Enrolled", but never an
/// adolescent-only count.
pub fn is_boys_total_field(name: &str) -> bool {
    let n = name.to_lowercase();
    n.contains("boys") && (n.contains("total") || n.contains("enrolled")) && !n.contains("adolescent")
}

pub fn is_girls_total_field(name: &str) -> bool {
    let n = name.to_lowercase();
    n.contains("girls") && (n.contains("total") || n.contains("enrolled")) && !n.contains("adolescent")
}

pub fn is_underweight_field(name: &str) -> bool {
    name.to_lowercase().contains("underweight")
}

pub fn is_stunting_field(name: &str) -> bool {
    let n = name.to_lowercase();
    n.contains("stunting") || n.contains("stunted")
}

pub fn is_wasting_field(name: &str) -> bool {
    let n = name.to_lowercase();
    n.contains("wasting") || n.contains("wasted")
}

pub fn is_normal_nutrition_field(name: &str) -> bool {
    let n = name.to_lowercase();
    n.contains("normal") && (n.contains("nutrition") || n.contains("weight"))
}

pub fn is_date_like_field(name: &str) -> bool {
    let n = name.to_lowercase();
    n.contains("date") || n.contains("year") || n.contains("period")
}

/// Date layouts seen in the exports, including two-digit years.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d/%m/%y", "%d-%m-%y"];

/// Year of `text`: a whole date in a known layout first, otherwise the first
/// `20xx` appearing anywhere in it.
pub fn extract_year(text: &str) -> Option<i32> {
    let text = text.trim();
    let parsed = DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .map(|d| d.year())
            .filter(|y| (2000..=2099).contains(y))
    });
    parsed.or_else(|| YEAR_PATTERN.find(text).and_then(|m| m.as_str().parse().ok()))
}

/// Year of a record: the `Year` column if it holds one, otherwise the first
/// date/year-like column, in source column order, that does.
pub fn detect_year(record: &Record) -> Option<i32> {
    let explicit = record
        .get(YEAR_FIELD)
        .and_then(Scalar::as_key_string)
        .and_then(|text| extract_year(&text));
    explicit.or_else(|| {
        record
            .fields()
            .filter(|(name, _)| is_date_like_field(name))
            .filter_map(|(_, value)| value.as_key_string())
            .find_map(|text| extract_year(&text))
    })
}

/// Broad "facility has it" test used for infrastructure columns.
pub fn is_truthy_attribute(value: &Scalar) -> bool {
    match value {
        Scalar::Text(s) => s.trim().to_lowercase().starts_with("yes") || s == "Available",
        Scalar::Bool(b) => *b,
        Scalar::Number(n) => *n == 1.0,
        Scalar::Null => false,
    }
}

pub fn is_currently_enrolled(record: &Record) -> bool {
    ENROLLMENT_STATUS_FIELDS
        .iter()
        .filter_map(|f| record.text(f))
        .any(|s| s.to_lowercase().contains(CURRENTLY_IN_SCHOOL))
}

/// Common abbreviations and historic spellings mapped to one state name.
pub fn canonical_state_name(name: &str) -> String {
    let name = name.trim();
    STATE_ALIASES.get(name).copied().unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_matching_is_case_insensitive_and_exact() {
        assert_eq!(classify_gender("Male"), Some(Gender::Boy));
        assert_eq!(classify_gender(" GIRL "), Some(Gender::Girl));
        assert_eq!(classify_gender("female"), Some(Gender::Girl));
        assert_eq!(classify_gender("M"), None);
        assert_eq!(classify_gender("other"), None);
    }

    #[test]
    fn aggregate_columns_exclude_adolescents() {
        assert!(is_boys_total_field("Total Boys"));
        assert!(is_boys_total_field("No. of boys enrolled"));
        assert!(!is_boys_total_field("Total Adolescent Boys"));
        assert!(!is_boys_total_field("Boys with special needs"));
        assert!(is_girls_total_field("TOTAL GIRLS"));
        assert!(!is_girls_total_field("Total Boys"));
    }

    #[test]
    fn nutrition_columns() {
        assert!(is_underweight_field("Children Underweight"));
        assert!(is_stunting_field("Stunted children"));
        assert!(is_wasting_field("Severely wasted"));
        assert!(is_normal_nutrition_field("Normal Weight"));
        assert!(is_normal_nutrition_field("normal nutrition status"));
        assert!(!is_normal_nutrition_field("Normal delivery"));
    }

    #[test]
    fn year_extraction() {
        assert_eq!(extract_year("Periodicity 2024-25"), Some(2024));
        assert_eq!(extract_year("31/03/2023"), Some(2023));
        assert_eq!(extract_year("1999"), None);
        assert_eq!(extract_year("31/03/24"), Some(2024));
        assert_eq!(extract_year("1999-04-01"), None);

        let record: Record = [("Reporting Date", "2024-03-31"), ("Name", "x")].into_iter().collect();
        assert_eq!(detect_year(&record), Some(2024));
        let record: Record = [("Year", 2023.0)].into_iter().collect();
        assert_eq!(detect_year(&record), Some(2023));
    }

    #[test]
    fn year_column_wins_over_other_dates() {
        let mut record = Record::new();
        record.insert("Date of Survey", "05/01/2024");
        record.insert("Year", 2023.0);
        assert_eq!(detect_year(&record), Some(2023));

        let mut record = Record::new();
        record.insert("Periodicity", "2024-25");
        record.insert("Admission Date", "2022-06-01");
        assert_eq!(detect_year(&record), Some(2024));
    }

    #[test]
    fn reported_gender_accepts_codes_and_fallback_column() {
        assert_eq!(classify_reported_gender("M"), Some(Gender::Boy));
        assert_eq!(classify_reported_gender("f"), Some(Gender::Girl));
        assert_eq!(classify_reported_gender("Girl"), Some(Gender::Girl));
        assert_eq!(classify_reported_gender("x"), None);

        let joined: Record = [("Gender_x", "male")].into_iter().collect();
        assert_eq!(reported_gender_of(&joined), Some(Gender::Boy));
        assert_eq!(gender_of(&joined), None);

        let both: Record = [("Gender", "F"), ("Gender_x", "male")].into_iter().collect();
        assert_eq!(reported_gender_of(&both), Some(Gender::Girl));
    }

    #[test]
    fn truthy_attributes() {
        assert!(is_truthy_attribute(&Scalar::from("Yes")));
        assert!(is_truthy_attribute(&Scalar::from("yes, functional")));
        assert!(is_truthy_attribute(&Scalar::from("Available")));
        assert!(is_truthy_attribute(&Scalar::Bool(true)));
        assert!(is_truthy_attribute(&Scalar::Number(1.0)));
        assert!(!is_truthy_attribute(&Scalar::from("No")));
        assert!(!is_truthy_attribute(&Scalar::from("Not Available")));
        assert!(!is_truthy_attribute(&Scalar::Number(2.0)));
        assert!(!is_truthy_attribute(&Scalar::Null));
    }

    #[test]
    fn state_aliases() {
        assert_eq!(canonical_state_name("Orissa"), "Odisha");
        assert_eq!(canonical_state_name(" UP "), "Uttar Pradesh");
        assert_eq!(canonical_state_name("Bihar"), "Bihar");
    }
}
