// Small numeric and grouping helpers shared by the aggregators.
use num_format::{Locale, ToFormattedString};
use std::collections::HashMap;

/// Round to two decimal places, the precision every percentage is reported at.
pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

pub fn average(sum: f64, count: usize) -> f64 {
    // Returns 0 for an empty group instead of NaN.
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// Convert an accumulated float count into a whole, non-negative count.
pub fn to_count(n: f64) -> u64 {
    if n.is_finite() && n > 0.0 {
        n.round() as u64
    } else {
        0
    }
}

/// Accumulators keyed by group name, iterated in first-seen order.
///
/// Ranking ties fall back to this order, so it has to be deterministic;
/// a plain `HashMap` traversal is not.
#[derive(Debug)]
pub struct OrderedGroups<T> {
    index: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T> Default for OrderedGroups<T> {
    fn default() -> Self {
        Self { index: HashMap::new(), entries: Vec::new() }
    }
}

impl<T: Default> OrderedGroups<T> {
    pub fn entry(&mut self, key: &str) -> &mut T {
        let idx = match self.index.get(key) {
            Some(i) => *i,
            None => {
                self.entries.push((key.to_string(), T::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }
}

impl<T> OrderedGroups<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, T)> {
        self.entries
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round2(33.33333), 33.33);
        assert_eq!(round2(-12.345678), -12.35);
        assert_eq!(round2(50.0), 50.0);
    }

    #[test]
    fn ordered_groups_keep_first_seen_order() {
        let mut groups: OrderedGroups<u32> = OrderedGroups::default();
        for key in ["b", "a", "b", "c", "a", "b"] {
            *groups.entry(key) += 1;
        }
        assert_eq!(groups.len(), 3);
        let entries = groups.into_entries();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(entries[0].1, 3);
    }

    #[test]
    fn counts_and_formatting() {
        assert_eq!(to_count(2.6), 3);
        assert_eq!(to_count(-4.0), 0);
        assert_eq!(to_count(f64::NAN), 0);
        assert_eq!(average(10.0, 4), 2.5);
        assert_eq!(average(10.0, 0), 0.0);
        assert_eq!(format_int(9855u64), "9,855");
    }
}
