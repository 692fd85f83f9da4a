use crate::fields::{
    canonical_state_name, gender_of, is_boys_total_field, is_girls_total_field, reported_gender_of, Gender,
    AGE_BAND_FIELDS, DISTRICT_FIELDS, REGION_FIELDS, STATE_FIELDS, YEAR_FIELDS,
};
use crate::types::{
    CategoryCount, DatasetSummary, FilterCriteria, GenderCounts, Record, RecordShape, SummaryStats, YearlyCounts,
};
use crate::util::{round2, to_count, OrderedGroups};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

pub(crate) const UNKNOWN: &str = "Unknown";

/// Rows kept per year in a summary's `sampleRecords`.
pub const SAMPLES_PER_YEAR: usize = 100;

const PROJECT_FIELDS: &[&str] = &["Project", "Project Name"];
const FACILITY_TYPE_FIELDS: &[&str] = &["Facility Type", "FacilityType"];
const LOCATION_TYPE_FIELDS: &[&str] = &["Location Type", "LocationType"];
const SOCIAL_CATEGORY_FIELDS: &[&str] = &["Social Category", "SocialCategory"];
const RELIGION_FIELDS: &[&str] = &["Religion"];
const EDUCATIONAL_STATUS_FIELDS: &[&str] = &["Educational Status", "EducationalStatus"];
const DROPOUT_REASON_FIELDS: &[&str] = &["Dropout Reason", "DropoutReason"];
const SPECIAL_NEED_FIELDS: &[&str] = &["Special Need", "SpecialNeed"];

/// Dropout reason placeholders that mean "no reason recorded".
const NO_DROPOUT_REASON: &[&str] = &["nan", "none", "null", "unknown"];
const SPECIAL_NEED_YES: &[&str] = &["yes", "y", "true", "1"];

/// Headline counts over a collection of rows.
///
/// Individual rows count one child each by their `Gender`; aggregate rows
/// contribute their pre-summed boys/girls columns. The boys and girls column
/// rules are checked independently, so a column matching both feeds both.
/// `total_children` is always `total_boys + total_girls`, whatever total
/// column the source carried.
pub fn summarize(records: &[Record]) -> SummaryStats {
    let mut boys = 0.0_f64;
    let mut girls = 0.0_f64;
    let mut regions: HashSet<&str> = HashSet::new();
    let mut districts: HashSet<&str> = HashSet::new();

    for record in records {
        match RecordShape::classify(record) {
            RecordShape::Individual => match gender_of(record) {
                Some(Gender::Boy) => boys += 1.0,
                Some(Gender::Girl) => girls += 1.0,
                None => {}
            },
            RecordShape::Aggregate => {
                for (name, value) in record.fields() {
                    let Some(n) = value.as_f64() else { continue };
                    if is_boys_total_field(name) {
                        boys += n;
                    }
                    if is_girls_total_field(name) {
                        girls += n;
                    }
                }
            }
        }
        if let Some(region) = record.first_text(REGION_FIELDS) {
            regions.insert(region);
        }
        if let Some(district) = record.first_text(DISTRICT_FIELDS) {
            districts.insert(district);
        }
    }

    let total_boys = to_count(boys);
    let total_girls = to_count(girls);
    debug!(records = records.len(), total_boys, total_girls, "summarized records");
    SummaryStats {
        total_records: records.len(),
        total_children: total_boys + total_girls,
        total_boys,
        total_girls,
        regions: sorted(regions),
        districts: sorted(districts),
    }
}

fn sorted(set: HashSet<&str>) -> Vec<String> {
    let mut out: Vec<String> = set.into_iter().map(str::to_string).collect();
    out.sort();
    out
}

/// The location bucket a filter selects in a summary document.
enum Scope<'a> {
    All,
    Location {
        totals: Option<&'a GenderCounts>,
        years: Option<&'a YearlyCounts>,
    },
}

/// Summary documents keep one location level per bucket, so only the most
/// specific location criterion (district, then region, then state) selects
/// counts. A district outside the requested region selects nothing.
fn scope<'a>(summary: &'a DatasetSummary, criteria: &FilterCriteria) -> Scope<'a> {
    if let Some(district) = &criteria.district {
        if let Some(region) = &criteria.region {
            if !region_has_district(summary, region, district) {
                return Scope::Location { totals: None, years: None };
            }
        }
        return Scope::Location {
            totals: summary.by_district.get(district),
            years: summary.district_year_data.get(district),
        };
    }
    if let Some(region) = &criteria.region {
        return Scope::Location {
            totals: summary.by_region.get(region),
            years: summary.region_year_data.get(region),
        };
    }
    if let Some(state) = &criteria.state {
        let state = canonical_state_name(state);
        return Scope::Location {
            totals: summary.by_state.get(&state),
            years: summary.state_year_data.get(&state),
        };
    }
    Scope::All
}

fn region_has_district(summary: &DatasetSummary, region: &str, district: &str) -> bool {
    summary
        .region_district_map
        .get(region)
        .is_some_and(|districts| districts.iter().any(|d| d == district))
}

/// Whether `key` has rows in `year` according to a per-location year table.
/// Documents without the table cannot say, and keep every key.
fn seen_in_year(data: &BTreeMap<String, YearlyCounts>, key: &str, year: Option<&str>) -> bool {
    match year {
        Some(y) if !data.is_empty() => data.get(key).is_some_and(|years| years.contains_key(y)),
        _ => true,
    }
}

/// Per-year counts for the location a filter selects; the whole document's
/// `byYear` when no location criterion is set.
pub fn yearly_counts(summary: &DatasetSummary, criteria: &FilterCriteria) -> YearlyCounts {
    match scope(summary, criteria) {
        Scope::All => summary.by_year.clone(),
        Scope::Location { years, .. } => years.cloned().unwrap_or_default(),
    }
}

/// Headline counts read from a pre-aggregated summary document instead of
/// raw rows, narrowed by `criteria` as far as the document allows.
///
/// Region and district lists exclude `Unknown` buckets. A region filter
/// narrows districts through `regionDistrictMap`, and a year filter keeps
/// only locations with rows in that year. A state filter selects counts but
/// cannot narrow the lists, since summaries carry no state to region link.
pub fn summary_stats_from_summary(summary: &DatasetSummary, criteria: &FilterCriteria) -> SummaryStats {
    let year = criteria.year.as_deref();
    let counts = match (year, scope(summary, criteria)) {
        (Some(y), Scope::All) => summary.by_year.get(y).copied().unwrap_or_default(),
        (Some(y), Scope::Location { years, .. }) => years.and_then(|m| m.get(y)).copied().unwrap_or_default(),
        (None, Scope::All) => {
            let mut all = summary.by_year.values().fold(GenderCounts::default(), |mut acc, c| {
                acc.add(c);
                acc
            });
            all.count = summary.total_records;
            all
        }
        (None, Scope::Location { totals, .. }) => totals.copied().unwrap_or_default(),
    };

    let regions: Vec<String> = summary
        .by_region
        .keys()
        .filter(|r| r.as_str() != UNKNOWN)
        .filter(|r| criteria.region.as_ref().map_or(true, |want| want == *r))
        .filter(|r| {
            criteria
                .district
                .as_ref()
                .map_or(true, |d| region_has_district(summary, r, d))
        })
        .filter(|r| seen_in_year(&summary.region_year_data, r, year))
        .cloned()
        .collect();
    let districts: Vec<String> = summary
        .by_district
        .keys()
        .filter(|d| d.as_str() != UNKNOWN)
        .filter(|d| criteria.district.as_ref().map_or(true, |want| want == *d))
        .filter(|d| {
            criteria
                .region
                .as_ref()
                .map_or(true, |r| region_has_district(summary, r, d))
        })
        .filter(|d| seen_in_year(&summary.district_year_data, d, year))
        .cloned()
        .collect();

    SummaryStats {
        total_records: counts.count as usize,
        total_children: counts.boys + counts.girls,
        total_boys: counts.boys,
        total_girls: counts.girls,
        regions,
        districts,
    }
}

/// Build the pre-aggregated summary document from individual rows.
///
/// Rows missing a year or location land in an `Unknown` bucket so per-key
/// counts always add up to `total_records`. Gender is read the way summary
/// documents have always counted it: `Gender` or `Gender_x`, including the
/// `m` / `f` codes.
pub fn build_dataset_summary(records: &[Record]) -> DatasetSummary {
    let mut summary = DatasetSummary {
        total_records: records.len() as u64,
        ..Default::default()
    };
    let mut region_districts: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut samples: OrderedGroups<Vec<Record>> = OrderedGroups::default();

    for record in records {
        let gender = reported_gender_of(record);
        let year = label(record, YEAR_FIELDS);
        let state = record
            .first_text(STATE_FIELDS)
            .map(canonical_state_name)
            .unwrap_or_else(|| UNKNOWN.to_string());
        let region = label(record, REGION_FIELDS);
        let district = label(record, DISTRICT_FIELDS);

        tally(summary.by_year.entry(year.clone()).or_default(), gender);
        tally(summary.by_state.entry(state.clone()).or_default(), gender);
        tally(summary.by_region.entry(region.clone()).or_default(), gender);
        tally(summary.by_district.entry(district.clone()).or_default(), gender);
        tally(summary.by_project.entry(label(record, PROJECT_FIELDS)).or_default(), gender);
        tally(year_bucket(&mut summary.state_year_data, &state, &year), gender);
        tally(year_bucket(&mut summary.region_year_data, &region, &year), gender);
        tally(year_bucket(&mut summary.district_year_data, &district, &year), gender);

        if region != UNKNOWN && district != UNKNOWN {
            region_districts.entry(region).or_default().insert(district);
        }

        bump(&mut summary.by_age_band, label(record, AGE_BAND_FIELDS));
        bump(&mut summary.by_facility_type, label(record, FACILITY_TYPE_FIELDS));
        bump(&mut summary.by_location_type, label(record, LOCATION_TYPE_FIELDS));
        bump(&mut summary.by_social_category, label(record, SOCIAL_CATEGORY_FIELDS));
        bump(&mut summary.by_religion, label(record, RELIGION_FIELDS));
        bump(&mut summary.by_educational_status, label(record, EDUCATIONAL_STATUS_FIELDS));
        if let Some(reason) = dropout_reason(record) {
            bump(&mut summary.by_dropout_reason, reason);
        }

        let special = record
            .first_key_string(SPECIAL_NEED_FIELDS)
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if SPECIAL_NEED_YES.contains(&special.as_str()) {
            summary.special_needs.yes += 1;
        } else {
            summary.special_needs.no += 1;
        }

        let sample = samples.entry(&year);
        if sample.len() < SAMPLES_PER_YEAR {
            sample.push(record.clone());
        }
    }

    summary.region_district_map = region_districts
        .into_iter()
        .map(|(region, districts)| (region, districts.into_iter().collect()))
        .collect();
    summary.sample_records = samples.into_entries().into_iter().flat_map(|(_, rows)| rows).collect();
    debug!(
        records = summary.total_records,
        years = summary.by_year.len(),
        districts = summary.by_district.len(),
        "built dataset summary"
    );
    summary
}

/// Trimmed text of the first present column among `keys`, or `Unknown`.
fn label(record: &Record, keys: &[&str]) -> String {
    record
        .first_key_string(keys)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn dropout_reason(record: &Record) -> Option<String> {
    let reason = record.first_key_string(DROPOUT_REASON_FIELDS)?;
    let reason = reason.trim();
    if reason.is_empty() || NO_DROPOUT_REASON.contains(&reason.to_lowercase().as_str()) {
        return None;
    }
    Some(reason.to_string())
}

fn year_bucket<'a>(data: &'a mut BTreeMap<String, YearlyCounts>, key: &str, year: &str) -> &'a mut GenderCounts {
    data.entry(key.to_string()).or_default().entry(year.to_string()).or_default()
}

fn tally(counts: &mut GenderCounts, gender: Option<Gender>) {
    counts.count += 1;
    match gender {
        Some(Gender::Boy) => counts.boys += 1,
        Some(Gender::Girl) => counts.girls += 1,
        None => {}
    }
}

fn bump(counter: &mut BTreeMap<String, u64>, key: String) {
    *counter.entry(key).or_default() += 1;
}

/// Rows of a categorical counter, largest first, with each share of the
/// counter's total.
pub fn category_counts(counter: &BTreeMap<String, u64>) -> Vec<CategoryCount> {
    let total: u64 = counter.values().sum();
    let mut rows: Vec<CategoryCount> = counter
        .iter()
        .map(|(category, count)| CategoryCount {
            category: category.clone(),
            count: *count,
            share: if total == 0 {
                0.0
            } else {
                round2(*count as f64 / total as f64 * 100.0)
            },
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}
