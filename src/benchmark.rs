// Program reach per state set against national nutrition survey figures.
use crate::fields::{canonical_state_name, gender_of, Gender, DISTRICT_FIELDS, STATE_FIELDS};
use crate::summary::UNKNOWN;
use crate::types::{DatasetSummary, NationalBenchmark, NutritionPrevalence, Record, StateCorrelation, StateProgram};
use crate::util::round2;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Children, boys, girls and districts per state, counted from rows.
/// Rows without a state are skipped.
pub fn state_programs(records: &[Record]) -> BTreeMap<String, StateProgram> {
    let mut programs: BTreeMap<String, StateProgram> = BTreeMap::new();
    let mut districts: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();

    for record in records {
        let Some(state) = record.first_text(STATE_FIELDS).map(canonical_state_name) else {
            continue;
        };
        if let Some(district) = record.first_text(DISTRICT_FIELDS) {
            districts.entry(state.clone()).or_default().insert(district);
        }
        let program = programs.entry(state).or_default();
        program.total_children += 1;
        match gender_of(record) {
            Some(Gender::Boy) => program.boys += 1,
            Some(Gender::Girl) => program.girls += 1,
            None => {}
        }
    }

    for (state, names) in districts {
        if let Some(program) = programs.get_mut(&state) {
            program.districts = names.into_iter().map(str::to_string).collect();
        }
    }
    programs
}

/// Same counts read from a summary document, which carries no district
/// breakdown per state.
pub fn state_programs_from_summary(summary: &DatasetSummary) -> BTreeMap<String, StateProgram> {
    summary
        .by_state
        .iter()
        .filter(|(state, _)| state.as_str() != UNKNOWN)
        .map(|(state, counts)| {
            let program = StateProgram {
                total_children: counts.count,
                boys: counts.boys,
                girls: counts.girls,
                districts: Vec::new(),
            };
            (state.clone(), program)
        })
        .collect()
}

/// Pair each state with its benchmark figures and its distance from the
/// national average. State names match case-insensitively after alias
/// resolution; states with no benchmark entry are left out.
pub fn correlate_states(
    programs: &BTreeMap<String, StateProgram>,
    benchmark: &NationalBenchmark,
) -> Vec<StateCorrelation> {
    let avg = benchmark.india_average;
    let mut out = Vec::new();

    for (state, program) in programs {
        let Some(figures) = benchmark_for(benchmark, state) else {
            warn!(state = %state, "no benchmark figures for state");
            continue;
        };
        out.push(StateCorrelation {
            state: state.clone(),
            children: program.total_children,
            boys: program.boys,
            girls: program.girls,
            underweight: round2(figures.underweight),
            stunting: round2(figures.stunting),
            wasting: round2(figures.wasting),
            underweight_vs_avg: round2(figures.underweight - avg.underweight),
            stunting_vs_avg: round2(figures.stunting - avg.stunting),
            wasting_vs_avg: round2(figures.wasting - avg.wasting),
            districts: program.districts.clone(),
        });
    }

    debug!(states = programs.len(), matched = out.len(), "correlated states with benchmark");
    out
}

fn benchmark_for<'a>(benchmark: &'a NationalBenchmark, state: &str) -> Option<&'a NutritionPrevalence> {
    let wanted = canonical_state_name(state).to_lowercase();
    benchmark
        .state_data
        .iter()
        .find(|(name, _)| name.to_lowercase() == wanted)
        .map(|(_, figures)| figures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenderCounts;

    fn row(state: &str, district: &str, gender: &str) -> Record {
        [("State Name", state), ("District Name", district), ("Gender", gender)]
            .into_iter()
            .collect()
    }

    fn benchmark() -> NationalBenchmark {
        NationalBenchmark {
            india_average: NutritionPrevalence {
                underweight: 32.1,
                stunting: 35.5,
                wasting: 19.3,
            },
            state_data: BTreeMap::from([
                (
                    "bihar".to_string(),
                    NutritionPrevalence {
                        underweight: 41.0,
                        stunting: 42.9,
                        wasting: 22.9,
                    },
                ),
                (
                    "Jammu and Kashmir".to_string(),
                    NutritionPrevalence {
                        underweight: 21.0,
                        stunting: 26.9,
                        wasting: 19.0,
                    },
                ),
            ]),
        }
    }

    #[test]
    fn rows_are_grouped_by_canonical_state() {
        let records = vec![
            row("J&K", "Srinagar", "Male"),
            row("Jammu & Kashmir", "Anantnag", "Female"),
            row("Jammu and Kashmir", "Srinagar", "other"),
            row("", "Nowhere", "Male"),
        ];
        let programs = state_programs(&records);
        assert_eq!(programs.len(), 1);
        let jk = &programs["Jammu and Kashmir"];
        assert_eq!((jk.total_children, jk.boys, jk.girls), (3, 1, 1));
        assert_eq!(jk.districts, vec!["Anantnag", "Srinagar"]);
    }

    #[test]
    fn states_match_case_insensitively_with_deltas() {
        let programs = state_programs(&[row("Bihar", "Gaya", "Female"), row("Atlantis", "X", "Male")]);
        let rows = correlate_states(&programs, &benchmark());
        assert_eq!(rows.len(), 1);
        let bihar = &rows[0];
        assert_eq!(bihar.state, "Bihar");
        assert_eq!(bihar.girls, 1);
        assert_eq!(bihar.underweight, 41.0);
        assert_eq!(bihar.underweight_vs_avg, 8.9);
        assert_eq!(bihar.stunting_vs_avg, 7.4);
        assert_eq!(bihar.wasting_vs_avg, 3.6);
        assert_eq!(bihar.districts, vec!["Gaya"]);
    }

    #[test]
    fn summary_states_skip_unknown() {
        let mut summary = DatasetSummary::default();
        summary.by_state.insert(
            "J&K".to_string(),
            GenderCounts {
                count: 5,
                boys: 2,
                girls: 3,
            },
        );
        summary.by_state.insert(UNKNOWN.to_string(), GenderCounts::default());
        let programs = state_programs_from_summary(&summary);
        assert_eq!(programs.len(), 1);

        let rows = correlate_states(&programs, &benchmark());
        assert_eq!(rows[0].children, 5);
        assert_eq!(rows[0].stunting_vs_avg, -8.6);
        assert!(rows[0].districts.is_empty());
    }

    #[test]
    fn empty_benchmark_matches_nothing() {
        let programs = state_programs(&[row("Bihar", "Gaya", "Male")]);
        assert!(correlate_states(&programs, &NationalBenchmark::default()).is_empty());
    }
}
