use crate::types::{GroupBy, LocationPerformance, LocationRanking, RankCategory, Record};
use crate::util::OrderedGroups;
use std::cmp::Ordering;
use tracing::debug;

pub const DEFAULT_TOP_N: usize = 10;

/// Best and worst locations by an accumulated metric.
///
/// A record adds its numeric `metric_field` to its location's total; when the
/// field is absent or not numeric the record counts as 1, so an unknown
/// metric ranks locations by row count. Records without the grouping key are
/// skipped.
///
/// `top` is descending with rank 1 first. `bottom` takes the `top_n` lowest
/// values, ranks them from the lowest (rank 1) upward, then reverses the
/// slice: it reads highest-to-lowest and ends with rank 1.
pub fn rank_locations(records: &[Record], metric_field: &str, group_by: GroupBy, top_n: usize) -> LocationRanking {
    let mut groups: OrderedGroups<f64> = OrderedGroups::default();
    for record in records {
        let Some(location) = group_by.key_of(record) else { continue };
        *groups.entry(location) += record.number(metric_field).unwrap_or(1.0);
    }
    debug!(locations = groups.len(), %group_by, metric = metric_field, "grouped locations");
    if groups.is_empty() {
        return LocationRanking::default();
    }

    let mut ranked = groups.into_entries();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    // Bottom comes from the tail of the same ordering so the two lists stay
    // disjoint whenever there are more than 2 * top_n locations, even on ties.
    let mut bottom: Vec<LocationPerformance> = ranked
        .iter()
        .rev()
        .take(top_n)
        .enumerate()
        .map(|(idx, (location, value))| {
            performance(idx + 1, location.clone(), metric_field, *value, RankCategory::Bottom)
        })
        .collect();
    bottom.reverse();

    let top = ranked
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(idx, (location, value))| performance(idx + 1, location, metric_field, value, RankCategory::Top))
        .collect();

    LocationRanking { top, bottom }
}

fn performance(rank: usize, location: String, metric: &str, value: f64, category: RankCategory) -> LocationPerformance {
    LocationPerformance {
        rank,
        location,
        metric: metric.to_string(),
        value,
        category,
    }
}
