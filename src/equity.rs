use crate::fields::{gender_of, Gender};
use crate::types::{EquityMetrics, Record, RecordShape};
use crate::util::{round2, OrderedGroups};

pub const DEFAULT_CATEGORY_FIELD: &str = "Location Type";

#[derive(Debug, Default)]
struct Tally {
    boys: u64,
    girls: u64,
}

/// Boys, girls and share of girls per value of `category_field`
/// (e.g. Rural / Urban), largest group first.
///
/// Only individual rows are counted; aggregate rows are skipped. Rows
/// without a text category fall under "Unknown".
pub fn analyze_equity(records: &[Record], category_field: &str) -> Vec<EquityMetrics> {
    let mut groups: OrderedGroups<Tally> = OrderedGroups::default();
    for record in records {
        if RecordShape::classify(record) != RecordShape::Individual {
            continue;
        }
        let category = record
            .text(category_field)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown");
        let tally = groups.entry(category);
        match gender_of(record) {
            Some(Gender::Boy) => tally.boys += 1,
            Some(Gender::Girl) => tally.girls += 1,
            None => {}
        }
    }

    let mut out: Vec<EquityMetrics> = groups
        .into_entries()
        .into_iter()
        .map(|(category, t)| {
            let total = t.boys + t.girls;
            let gender_ratio = if total == 0 {
                0.0
            } else {
                round2(t.girls as f64 / total as f64 * 100.0)
            };
            EquityMetrics {
                category,
                boys: t.boys,
                girls: t.girls,
                total_children: total,
                gender_ratio,
            }
        })
        .collect();
    out.sort_by(|a, b| b.total_children.cmp(&a.total_children));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(location_type: &str, gender: &str) -> Record {
        [("Location Type", location_type), ("Gender", gender)].into_iter().collect()
    }

    #[test]
    fn groups_and_sorts_by_children() {
        let records = vec![
            child("Urban", "Male"),
            child("Rural", "Female"),
            child("Rural", "Female"),
            child("Rural", "Male"),
        ];
        let equity = analyze_equity(&records, DEFAULT_CATEGORY_FIELD);
        assert_eq!(equity.len(), 2);
        assert_eq!(equity[0].category, "Rural");
        assert_eq!(equity[0].total_children, 3);
        assert_eq!(equity[0].gender_ratio, 66.67);
        assert_eq!(equity[1].category, "Urban");
        assert_eq!(equity[1].gender_ratio, 0.0);
    }

    #[test]
    fn aggregate_rows_are_ignored() {
        let mut school = Record::new();
        school.insert("Location Type", "Rural");
        school.insert("Total Girls", 50.0);
        let equity = analyze_equity(&[school], DEFAULT_CATEGORY_FIELD);
        assert!(equity.is_empty());
    }

    #[test]
    fn missing_category_is_unknown() {
        let r: Record = [("Gender", "girl")].into_iter().collect();
        let equity = analyze_equity(&[r], "Social Category");
        assert_eq!(equity[0].category, "Unknown");
        assert_eq!(equity[0].gender_ratio, 100.0);
    }
}
