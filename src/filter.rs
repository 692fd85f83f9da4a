use crate::fields::{DISTRICT_FIELDS, REGION_FIELDS, STATE_FIELDS, YEAR_FIELDS};
use crate::types::{FilterCriteria, Record};
use tracing::debug;

/// Keep the records matching every criterion that is set.
///
/// Matching is exact and case-sensitive. A record without the column a
/// criterion names does not match it.
pub fn filter_data(records: &[Record], criteria: &FilterCriteria) -> Vec<Record> {
    if criteria.is_empty() {
        return records.to_vec();
    }

    let checks: Vec<(&[&str], &str)> = [
        (REGION_FIELDS, criteria.region.as_deref()),
        (DISTRICT_FIELDS, criteria.district.as_deref()),
        (STATE_FIELDS, criteria.state.as_deref()),
        (YEAR_FIELDS, criteria.year.as_deref()),
    ]
    .into_iter()
    .filter_map(|(fields, wanted)| wanted.map(|w| (fields, w)))
    .collect();

    let kept: Vec<Record> = records
        .iter()
        .filter(|r| {
            checks
                .iter()
                .all(|(fields, wanted)| r.first_key_string(fields).as_deref() == Some(*wanted))
        })
        .cloned()
        .collect();
    debug!(input = records.len(), kept = kept.len(), "filtered records");
    kept
}
