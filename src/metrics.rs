use crate::types::{GenderCounts, Trend, TrendData, YearlyCounts};
use crate::util::round2;

/// Signed percentage change from `base` to `current`, rounded to 2 places.
///
/// Growth from a zero baseline is reported as a flat 100 rather than
/// infinity; no growth from zero is 0.
pub fn percent_change(base: f64, current: f64) -> f64 {
    if base == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    round2((current - base) / base * 100.0)
}

pub fn trend(base: f64, current: f64) -> Trend {
    if current > base {
        Trend::Up
    } else if current < base {
        Trend::Down
    } else {
        Trend::Stable
    }
}

pub fn trend_data(metric: &str, base: f64, current: f64) -> TrendData {
    TrendData {
        metric: metric.to_string(),
        base_value: base,
        current_value: current,
        change_percent: percent_change(base, current),
        trend: trend(base, current),
    }
}

/// Records, boys and girls compared between two years of a per-year series,
/// such as a summary's `byYear`. A year missing from the series reads as zero.
pub fn year_over_year(series: &YearlyCounts, base_year: i32, current_year: i32) -> Vec<TrendData> {
    let lookup = |year: i32| series.get(&year.to_string()).copied().unwrap_or_default();
    let base: GenderCounts = lookup(base_year);
    let current: GenderCounts = lookup(current_year);
    vec![
        trend_data("records", base.count as f64, current.count as f64),
        trend_data("boys", base.boys as f64, current.boys as f64),
        trend_data("girls", base.girls as f64, current.girls as f64),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_change_examples() {
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 5.0), 100.0);
        assert_eq!(percent_change(0.0, -5.0), 0.0);
        assert_eq!(percent_change(100.0, 150.0), 50.0);
        assert_eq!(percent_change(100.0, 50.0), -50.0);
        assert_eq!(percent_change(3.0, 4.0), 33.33);
    }

    #[test]
    fn trend_examples() {
        assert_eq!(trend(1.0, 2.0), Trend::Up);
        assert_eq!(trend(2.0, 1.0), Trend::Down);
        assert_eq!(trend(7.5, 7.5), Trend::Stable);
    }

    #[test]
    fn year_over_year_from_series() {
        let mut series = YearlyCounts::new();
        series.insert("2023".into(), GenderCounts { count: 200, boys: 120, girls: 80 });
        series.insert("2024".into(), GenderCounts { count: 250, boys: 120, girls: 130 });

        let rows = year_over_year(&series, 2023, 2024);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].metric, "records");
        assert_eq!(rows[0].change_percent, 25.0);
        assert_eq!(rows[0].trend, Trend::Up);
        assert_eq!(rows[1].trend, Trend::Stable);
        assert_eq!(rows[2].change_percent, 62.5);

        let missing = year_over_year(&series, 2022, 2023);
        assert_eq!(missing[0].change_percent, 100.0);
    }
}
