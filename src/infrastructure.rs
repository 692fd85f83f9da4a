use crate::fields::{is_currently_enrolled, is_truthy_attribute, DISTRICT_FIELDS};
use crate::types::{InfrastructureImpact, Record};
use crate::util::{average, round2};
use std::collections::HashMap;
use tracing::debug;

/// School facility columns compared by default.
pub const DEFAULT_INFRASTRUCTURE_ATTRIBUTES: &[&str] = &[
    "Toilet for children",
    "Separate Toilet for Girls",
    "Availablity of Drinking Water",
    "Availability of Electricity",
    "Libraray available",
    "Playground available",
];

#[derive(Debug, Default)]
struct Partition {
    facilities: usize,
    enrolled: f64,
}

impl Partition {
    fn average(&self) -> f64 {
        average(self.enrolled, self.facilities)
    }
}

/// How enrollment differs between facilities with and without each
/// attribute.
///
/// Each facility is credited with the number of children in its district
/// whose enrollment status is "currently going to school". `impact` is the
/// percentage difference of the "with" average over the "without" average,
/// and 0 whenever either side would divide by zero.
pub fn correlate_infrastructure(
    facilities: &[Record],
    enrollment: &[Record],
    attributes: &[&str],
) -> Vec<InfrastructureImpact> {
    let mut enrolled_by_district: HashMap<&str, f64> = HashMap::new();
    for record in enrollment.iter().filter(|r| is_currently_enrolled(r)) {
        if let Some(district) = record.first_text(DISTRICT_FIELDS) {
            *enrolled_by_district.entry(district).or_default() += 1.0;
        }
    }
    debug!(
        facilities = facilities.len(),
        districts = enrolled_by_district.len(),
        "joined enrollment to facilities"
    );

    attributes
        .iter()
        .map(|attribute| {
            let mut with = Partition::default();
            let mut without = Partition::default();
            for facility in facilities {
                let enrolled = facility
                    .first_text(DISTRICT_FIELDS)
                    .and_then(|d| enrolled_by_district.get(d))
                    .copied()
                    .unwrap_or(0.0);
                let has = facility.get(attribute).is_some_and(is_truthy_attribute);
                let side = if has { &mut with } else { &mut without };
                side.facilities += 1;
                side.enrolled += enrolled;
            }

            let (avg_with, avg_without) = (with.average(), without.average());
            let impact = if with.facilities == 0 || without.facilities == 0 || avg_without == 0.0 {
                0.0
            } else {
                round2((avg_with - avg_without) / avg_without * 100.0)
            };
            InfrastructureImpact {
                attribute: attribute.to_string(),
                facilities_with: with.facilities,
                facilities_without: without.facilities,
                avg_enrollment_with: round2(avg_with),
                avg_enrollment_without: round2(avg_without),
                impact,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facility(district: &str, toilet: &str) -> Record {
        [("District Name", district), ("Toilet for children", toilet)].into_iter().collect()
    }

    fn student(district: &str, status: &str) -> Record {
        [("District Name", district), ("If enrolled, enrollment status", status)]
            .into_iter()
            .collect()
    }

    #[test]
    fn compares_partitions() {
        let facilities = vec![facility("A", "Yes"), facility("B", "No"), facility("C", "yes")];
        let enrollment = vec![
            student("A", "Currently going to school"),
            student("A", "Currently going to school"),
            student("A", "Dropped out"),
            student("B", "currently going to school"),
            student("C", "Currently going to school"),
            student("C", "Currently going to school"),
        ];
        let impacts = correlate_infrastructure(&facilities, &enrollment, &["Toilet for children"]);
        assert_eq!(impacts.len(), 1);
        let toilet = &impacts[0];
        assert_eq!(toilet.facilities_with, 2);
        assert_eq!(toilet.facilities_without, 1);
        assert_eq!(toilet.avg_enrollment_with, 2.0);
        assert_eq!(toilet.avg_enrollment_without, 1.0);
        assert_eq!(toilet.impact, 100.0);
    }

    #[test]
    fn empty_partition_has_no_impact() {
        let facilities = vec![facility("A", "Yes")];
        let enrollment = vec![student("A", "Currently going to school")];
        let impacts = correlate_infrastructure(&facilities, &enrollment, &["Toilet for children"]);
        assert_eq!(impacts[0].facilities_without, 0);
        assert_eq!(impacts[0].impact, 0.0);
    }

    #[test]
    fn zero_baseline_has_no_impact() {
        let facilities = vec![facility("A", "Yes"), facility("B", "No")];
        let enrollment = vec![student("A", "Currently going to school")];
        let impacts = correlate_infrastructure(&facilities, &enrollment, &["Toilet for children"]);
        assert_eq!(impacts[0].avg_enrollment_without, 0.0);
        assert_eq!(impacts[0].impact, 0.0);
    }

    #[test]
    fn missing_attribute_counts_as_without() {
        let mut plain = Record::new();
        plain.insert("District Name", "A");
        let impacts = correlate_infrastructure(&[plain], &[], DEFAULT_INFRASTRUCTURE_ATTRIBUTES);
        assert_eq!(impacts.len(), DEFAULT_INFRASTRUCTURE_ATTRIBUTES.len());
        assert!(impacts.iter().all(|i| i.facilities_without == 1 && i.impact == 0.0));
    }
}
