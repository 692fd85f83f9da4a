// Malnutrition indicators per location.
//
// Rows are grouped by location and their underweight / stunting / wasting /
// normal columns summed. When a location has none of those columns, the
// percentages come from a `SyntheticEstimator` and the row is marked
// `MetricSource::Estimated`; such rows are placeholders, not measurements.
use crate::fields::{
    detect_year, is_normal_nutrition_field, is_stunting_field, is_underweight_field, is_wasting_field,
};
use crate::metrics::percent_change;
use crate::types::{
    GroupBy, MetricChange, MetricSource, NutritionComparison, NutritionMetrics, NutritionTrend, Record,
};
use crate::util::{round2, OrderedGroups};
use std::collections::HashMap;
use tracing::{debug, warn};

/// First of the two reporting years. Later years are follow-ups.
pub const BASELINE_YEAR: i32 = 2023;

/// Percentage-point change inside which a metric counts as stable.
const STABLE_BAND: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingPeriod {
    Baseline,
    FollowUp,
}

impl ReportingPeriod {
    pub fn for_year(year: Option<i32>) -> Self {
        match year {
            Some(y) if y > BASELINE_YEAR => ReportingPeriod::FollowUp,
            _ => ReportingPeriod::Baseline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutritionEstimate {
    pub underweight: f64,
    pub stunting: f64,
    pub wasting: f64,
}

/// Source of placeholder percentages for locations without indicator data.
pub trait SyntheticEstimator {
    /// Bumped whenever the output for any input changes.
    fn version(&self) -> u32;

    fn estimate(&self, location: &str, period: ReportingPeriod) -> NutritionEstimate;
}

/// Inclusive clamp range applied to estimated percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

pub const UNDERWEIGHT_BOUNDS: Bounds = Bounds { min: 15.0, max: 40.0 };
pub const STUNTING_BOUNDS: Bounds = Bounds { min: 18.0, max: 45.0 };
pub const WASTING_BOUNDS: Bounds = Bounds { min: 8.0, max: 25.0 };

/// Deterministic estimator seeded from the location name.
///
/// Three character hashes of the name each seed a sine-based generator.
/// Baselines fall in 18–35 (underweight), 22–41 (stunting) and 10–21
/// (wasting); follow-up years add a delta of at most ±6, ±7 and ±5
/// respectively and are clamped to the published bounds. The arithmetic is
/// frozen for version 1: any change alters every dashboard that shows it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashSeededEstimator;

impl HashSeededEstimator {
    pub const VERSION: u32 = 1;

    fn hashes(location: &str) -> [u32; 3] {
        let mut positional = 0u32;
        let mut rolling = 0u32;
        let mut squared = 0u32;
        for (i, c) in location.chars().enumerate() {
            let code = c as u32;
            let i = i as u32;
            positional = positional.wrapping_add(code.wrapping_mul(i.wrapping_add(1)));
            rolling = rolling.wrapping_mul(31).wrapping_add(code);
            squared = squared.wrapping_add(code.wrapping_mul(code).wrapping_add(i.wrapping_mul(7)));
        }
        [positional, rolling, squared]
    }

    /// Fractional part of `sin(seed) * 10000`, in `[0, 1)`.
    fn unit(seed: f64) -> f64 {
        let x = seed.sin() * 10_000.0;
        x - x.floor()
    }

    fn spread(seed: f64, max_delta: f64) -> f64 {
        (Self::unit(seed) - 0.5) * 2.0 * max_delta
    }
}

impl SyntheticEstimator for HashSeededEstimator {
    fn version(&self) -> u32 {
        Self::VERSION
    }

    fn estimate(&self, location: &str, period: ReportingPeriod) -> NutritionEstimate {
        let [h1, h2, h3] = Self::hashes(location).map(f64::from);
        let mut underweight = 18.0 + Self::unit(h1) * 17.0;
        let mut stunting = 22.0 + Self::unit(h2) * 19.0;
        let mut wasting = 10.0 + Self::unit(h3) * 11.0;

        if period == ReportingPeriod::FollowUp {
            underweight += Self::spread(h1 + 101.0, 6.0);
            stunting += Self::spread(h2 + 211.0, 7.0);
            wasting += Self::spread(h3 + 307.0, 5.0);
        }

        NutritionEstimate {
            underweight: round2(underweight.clamp(UNDERWEIGHT_BOUNDS.min, UNDERWEIGHT_BOUNDS.max)),
            stunting: round2(stunting.clamp(STUNTING_BOUNDS.min, STUNTING_BOUNDS.max)),
            wasting: round2(wasting.clamp(WASTING_BOUNDS.min, WASTING_BOUNDS.max)),
        }
    }
}

#[derive(Debug, Default)]
struct Indicators {
    underweight: f64,
    stunting: f64,
    wasting: f64,
    normal: f64,
}

impl Indicators {
    fn add(&mut self, record: &Record) {
        for (name, value) in record.fields() {
            let Some(n) = value.as_f64() else { continue };
            // Each indicator is matched on its own; "Underweight or Wasted"
            // counts toward both.
            if is_underweight_field(name) {
                self.underweight += n;
            }
            if is_stunting_field(name) {
                self.stunting += n;
            }
            if is_wasting_field(name) {
                self.wasting += n;
            }
            if is_normal_nutrition_field(name) {
                self.normal += n;
            }
        }
    }

    fn total(&self) -> f64 {
        self.underweight + self.stunting + self.wasting + self.normal
    }
}

/// Nutrition metrics per location using the default estimator as fallback.
///
/// `year` overrides the year read from the first record's date-like columns.
pub fn analyze_nutrition(records: &[Record], group_by: GroupBy, year: Option<i32>) -> Vec<NutritionMetrics> {
    analyze_nutrition_with(records, group_by, year, Some(&HashSeededEstimator))
}

/// Nutrition metrics per location with an explicit estimator. With `None`,
/// locations lacking indicator columns are left out instead of estimated.
pub fn analyze_nutrition_with(
    records: &[Record],
    group_by: GroupBy,
    year: Option<i32>,
    estimator: Option<&dyn SyntheticEstimator>,
) -> Vec<NutritionMetrics> {
    let year = year.or_else(|| records.first().and_then(detect_year));
    let period = ReportingPeriod::for_year(year);

    let mut groups: OrderedGroups<Indicators> = OrderedGroups::default();
    for record in records {
        if let Some(location) = group_by.key_of(record) {
            groups.entry(location).add(record);
        }
    }
    debug!(locations = groups.len(), ?year, ?period, "grouped nutrition indicators");

    groups
        .into_entries()
        .into_iter()
        .filter_map(|(location, acc)| {
            let total = acc.total();
            if total > 0.0 {
                return Some(NutritionMetrics {
                    location,
                    year,
                    underweight_percent: round2(acc.underweight / total * 100.0),
                    stunting_percent: round2(acc.stunting / total * 100.0),
                    wasting_percent: round2(acc.wasting / total * 100.0),
                    normal_percent: round2(acc.normal / total * 100.0),
                    underweight: acc.underweight,
                    stunting: acc.stunting,
                    wasting: acc.wasting,
                    normal: acc.normal,
                    source: MetricSource::Measured,
                });
            }
            let estimator = estimator?;
            warn!(
                location = %location,
                estimator_version = estimator.version(),
                "no nutrition indicators for location, using estimated values"
            );
            let est = estimator.estimate(&location, period);
            Some(NutritionMetrics {
                location,
                year,
                underweight: 0.0,
                stunting: 0.0,
                wasting: 0.0,
                normal: 0.0,
                underweight_percent: est.underweight,
                stunting_percent: est.stunting,
                wasting_percent: est.wasting,
                normal_percent: round2((100.0 - est.underweight - est.stunting - est.wasting).max(0.0)),
                source: MetricSource::Estimated,
            })
        })
        .collect()
}

/// Per-location change between two years of nutrition metrics.
///
/// Only locations present in both inputs are compared; the rest are dropped.
pub fn compare_nutrition_years(baseline: &[NutritionMetrics], current: &[NutritionMetrics]) -> Vec<NutritionComparison> {
    let current_by_location: HashMap<&str, &NutritionMetrics> =
        current.iter().map(|m| (m.location.as_str(), m)).collect();

    baseline
        .iter()
        .filter_map(|base| {
            let cur = current_by_location.get(base.location.as_str())?;
            Some(NutritionComparison {
                location: base.location.clone(),
                underweight: metric_change(base.underweight_percent, cur.underweight_percent),
                stunting: metric_change(base.stunting_percent, cur.stunting_percent),
                wasting: metric_change(base.wasting_percent, cur.wasting_percent),
                estimated: base.is_estimated() || cur.is_estimated(),
            })
        })
        .collect()
}

fn metric_change(baseline: f64, current: f64) -> MetricChange {
    let delta = round2(current - baseline);
    // Lower prevalence is an improvement.
    let trend = if delta < -STABLE_BAND {
        NutritionTrend::Improved
    } else if delta > STABLE_BAND {
        NutritionTrend::Worsened
    } else {
        NutritionTrend::Stable
    };
    MetricChange {
        baseline,
        current,
        delta,
        percent_change: percent_change(baseline, current),
        trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn district_row(district: &str, pairs: &[(&str, f64)]) -> Record {
        let mut r = Record::new();
        r.insert("District Name", district);
        for (k, v) in pairs {
            r.insert(*k, *v);
        }
        r
    }

    #[test]
    fn measured_percentages_share_the_total() {
        let records = vec![
            district_row("Gaya", &[("Underweight", 10.0), ("Stunted", 20.0)]),
            district_row("Gaya", &[("Wasting", 10.0), ("Normal Weight", 60.0)]),
        ];
        let metrics = analyze_nutrition(&records, GroupBy::District, Some(2024));
        assert_eq!(metrics.len(), 1);
        let m = &metrics[0];
        assert_eq!(m.source, MetricSource::Measured);
        assert_eq!(m.year, Some(2024));
        assert_eq!(m.underweight, 10.0);
        assert_eq!(m.underweight_percent, 10.0);
        assert_eq!(m.stunting_percent, 20.0);
        assert_eq!(m.wasting_percent, 10.0);
        assert_eq!(m.normal_percent, 60.0);
    }

    #[test]
    fn combined_indicator_columns_count_for_each_indicator() {
        let records = vec![district_row("Gaya", &[("Underweight or Wasted", 20.0), ("Normal Weight", 60.0)])];
        let m = &analyze_nutrition(&records, GroupBy::District, Some(2023))[0];
        assert_eq!(m.underweight, 20.0);
        assert_eq!(m.wasting, 20.0);
        assert_eq!(m.stunting, 0.0);
        assert_eq!(m.underweight_percent, 20.0);
        assert_eq!(m.wasting_percent, 20.0);
        assert_eq!(m.normal_percent, 60.0);
    }

    #[test]
    fn missing_indicators_are_estimated_and_flagged() {
        let records = vec![district_row("Patna", &[("Total Boys", 12.0)])];
        let metrics = analyze_nutrition(&records, GroupBy::District, None);
        assert_eq!(metrics.len(), 1);
        assert!(metrics[0].is_estimated());
        assert_eq!(metrics[0].underweight, 0.0);

        let again = analyze_nutrition(&records, GroupBy::District, None);
        assert_eq!(metrics, again);
    }

    #[test]
    fn estimator_can_be_disabled() {
        let records = vec![
            district_row("Patna", &[]),
            district_row("Gaya", &[("Underweight", 5.0)]),
        ];
        let metrics = analyze_nutrition_with(&records, GroupBy::District, None, None);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].location, "Gaya");
    }

    #[test]
    fn year_is_read_from_first_record() {
        let mut r = district_row("Patna", &[("Underweight", 1.0)]);
        r.insert("Periodicity", "April 2024 - March 2025");
        let metrics = analyze_nutrition(&[r.clone()], GroupBy::District, None);
        assert_eq!(metrics[0].year, Some(2024));

        let metrics = analyze_nutrition(&[r], GroupBy::District, Some(2023));
        assert_eq!(metrics[0].year, Some(2023));
    }

    #[test]
    fn estimates_stay_in_their_ranges() {
        let est = HashSeededEstimator;
        for name in ["Patna", "Gaya", "Darbhanga", "", "Ludhiana", "Ranchi"] {
            let b = est.estimate(name, ReportingPeriod::Baseline);
            assert!((18.0..=35.0).contains(&b.underweight), "{name}: {b:?}");
            assert!((22.0..=41.0).contains(&b.stunting), "{name}: {b:?}");
            assert!((10.0..=21.0).contains(&b.wasting), "{name}: {b:?}");

            let f = est.estimate(name, ReportingPeriod::FollowUp);
            assert!((f.underweight - b.underweight).abs() <= 6.02);
            assert!((f.stunting - b.stunting).abs() <= 7.02);
            assert!((f.wasting - b.wasting).abs() <= 5.02);
        }
        assert_eq!(est.version(), 1);
    }

    #[test]
    fn periods_follow_the_baseline_year() {
        assert_eq!(ReportingPeriod::for_year(None), ReportingPeriod::Baseline);
        assert_eq!(ReportingPeriod::for_year(Some(2023)), ReportingPeriod::Baseline);
        assert_eq!(ReportingPeriod::for_year(Some(2024)), ReportingPeriod::FollowUp);
    }

    fn metrics(location: &str, u: f64, s: f64, w: f64, source: MetricSource) -> NutritionMetrics {
        NutritionMetrics {
            location: location.to_string(),
            year: None,
            underweight: 0.0,
            stunting: 0.0,
            wasting: 0.0,
            normal: 0.0,
            underweight_percent: u,
            stunting_percent: s,
            wasting_percent: w,
            normal_percent: 100.0 - u - s - w,
            source,
        }
    }

    #[test]
    fn comparison_uses_a_one_point_dead_zone() {
        let base = vec![metrics("A", 30.0, 30.0, 15.0, MetricSource::Measured)];
        let cur = vec![metrics("A", 27.0, 31.0, 16.5, MetricSource::Measured)];
        let cmp = compare_nutrition_years(&base, &cur);
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp[0].underweight.delta, -3.0);
        assert_eq!(cmp[0].underweight.percent_change, -10.0);
        assert_eq!(cmp[0].underweight.trend, NutritionTrend::Improved);
        assert_eq!(cmp[0].stunting.trend, NutritionTrend::Stable);
        assert_eq!(cmp[0].wasting.trend, NutritionTrend::Worsened);
        assert!(!cmp[0].estimated);
    }

    #[test]
    fn comparison_drops_unmatched_locations() {
        let base = vec![
            metrics("A", 30.0, 30.0, 15.0, MetricSource::Measured),
            metrics("B", 30.0, 30.0, 15.0, MetricSource::Measured),
        ];
        let cur = vec![
            metrics("B", 30.0, 30.0, 15.0, MetricSource::Estimated),
            metrics("C", 30.0, 30.0, 15.0, MetricSource::Measured),
        ];
        let cmp = compare_nutrition_years(&base, &cur);
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp[0].location, "B");
        assert!(cmp[0].estimated);
    }
}
