// Child protection risk scoring.
//
// Each child in a risk's cohort gets a weighted score built from enrollment,
// household and migration columns, capped at 100 and bucketed into a level.
// Rows are expected to carry the household columns already joined in.
use crate::fields::{classify_gender, Gender, AGE_BAND_FIELDS, DISTRICT_FIELDS, GENDER_FIELD, REGION_FIELDS};
use crate::types::{
    GroupRisk, ProtectionAnalysis, ProtectionRisk, Record, RiskAssessment, RiskCase, RiskLevel, RiskProfile,
};
use crate::util::{average, round2, OrderedGroups};
use std::collections::BTreeMap;
use tracing::debug;

pub const MAX_SCORE: u32 = 100;

/// Cases listed per risk in `ProtectionAnalysis::highest_risk`.
pub const HIGHEST_RISK_CASES: usize = 20;

pub const SCHOOL_AGE_BANDS: &[&str] = &["6-10Y", "11-14Y", "15-18Y"];
const ADOLESCENT_BANDS: &[&str] = &["11-14Y", "15-18Y"];

const BENEFICIARY_ID: &str = "Beneficiary Id";
const ENROLLMENT_STATUS: &str = "Enrollment status";
const ECONOMIC_ACTIVITY: &str =
    "Is the child involved in any Economic activities? (with or without wage/ monetary compensation for the child)";
const BONDED_LABOUR: &str = "Bonded labour involvement";
const CHILD_MIGRATED: &str = "Child migrated in the last 3 months?";
const HOUSEHOLD_MIGRATES: &str = "Whether Household migrates every year";
const CHILD_MISSING: &str = "Is any child missing?";
const RATION_CARD: &str = "Type of Ration card";
const EARNER_ILL: &str = "Whether the primary bread-earner of the HH is terminally/seriously ill";
const PARENTLESS_HOUSEHOLD: &[&str] = &[
    "Whether the HH is headed by a single parent",
    "Whether the HH is headed by grand parents",
    "Whether headed by children (18 years and below)",
];

impl RiskLevel {
    /// High from 50, Medium from 25, Low above 0, otherwise Minimal.
    pub fn from_score(score: u32) -> Self {
        match score {
            50.. => RiskLevel::High,
            25..=49 => RiskLevel::Medium,
            1..=24 => RiskLevel::Low,
            0 => RiskLevel::Minimal,
        }
    }
}

/// What a row says about a child's situation, read once per row.
#[derive(Debug)]
struct Circumstances {
    out_of_school: bool,
    economically_active: bool,
    works_outside_alone: bool,
    bonded_labour: bool,
    parentless_household: bool,
    earner_ill: bool,
    below_poverty: bool,
    child_migrated: bool,
    household_migrates: bool,
    migrated_via_agent: bool,
    child_missing: bool,
}

impl Circumstances {
    fn of(record: &Record) -> Self {
        let says_yes = |column: &str| record.lower(column).trim() == "yes";
        let enrollment = record.lower(ENROLLMENT_STATUS);
        let economic = record.lower(ECONOMIC_ACTIVITY);
        let migrated = record.lower(CHILD_MIGRATED);
        let ration = record.lower(RATION_CARD);

        Circumstances {
            out_of_school: enrollment.contains("drop out") || enrollment.contains("never enrolled"),
            economically_active: economic.contains("yes"),
            works_outside_alone: economic.contains("outside home alone"),
            bonded_labour: says_yes(BONDED_LABOUR),
            parentless_household: PARENTLESS_HOUSEHOLD.iter().any(|c| says_yes(*c)),
            earner_ill: says_yes(EARNER_ILL),
            below_poverty: ration.contains("below poverty") || ration.contains("no ration"),
            child_migrated: migrated.contains("yes"),
            household_migrates: says_yes(HOUSEHOLD_MIGRATES),
            migrated_via_agent: ["agent", "contractor", "labour"].iter().any(|w| migrated.contains(w)),
            child_missing: says_yes(CHILD_MISSING),
        }
    }
}

#[derive(Debug, Default)]
struct Score {
    points: u32,
    factors: Vec<String>,
}

impl Score {
    fn add(&mut self, when: bool, points: u32, factor: &str) {
        if when {
            self.points += points;
            self.factors.push(factor.to_string());
        }
    }

    fn finish(self) -> RiskAssessment {
        let score = self.points.min(MAX_SCORE);
        RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            factors: self.factors,
        }
    }
}

fn age_band(record: &Record) -> Option<&str> {
    record.first_text(AGE_BAND_FIELDS)
}

impl ProtectionRisk {
    pub const ALL: [ProtectionRisk; 3] = [
        ProtectionRisk::ChildMarriage,
        ProtectionRisk::ChildLabour,
        ProtectionRisk::ChildTrafficking,
    ];

    /// Child marriage is scored for adolescent girls; labour and trafficking
    /// for every school-age child.
    pub fn in_cohort(self, record: &Record) -> bool {
        let Some(band) = age_band(record) else { return false };
        match self {
            ProtectionRisk::ChildMarriage => {
                ADOLESCENT_BANDS.contains(&band)
                    && record.text(GENDER_FIELD).and_then(classify_gender) == Some(Gender::Girl)
            }
            ProtectionRisk::ChildLabour | ProtectionRisk::ChildTrafficking => SCHOOL_AGE_BANDS.contains(&band),
        }
    }

    pub fn assess(self, record: &Record) -> RiskAssessment {
        let c = Circumstances::of(record);
        let mut s = Score::default();
        match self {
            ProtectionRisk::ChildMarriage => {
                s.add(c.out_of_school, 20, "Out of school");
                s.add(c.parentless_household, 15, "Orphan/Single parent");
                s.add(c.earner_ill, 5, "Primary earner ill");
                s.add(c.child_migrated || c.household_migrates, 5, "Migration/Risk area");
                s.add(c.child_missing, 10, "Missing children in HH");
                s.add(c.below_poverty, 10, "BPL/Economic hardship");
            }
            ProtectionRisk::ChildLabour => {
                s.add(c.out_of_school, 15, "Out of school");
                s.add(c.economically_active, 15, "Economic activity");
                s.add(c.economically_active && c.works_outside_alone, 10, "Works outside alone");
                s.add(c.bonded_labour, 20, "Bonded labor");
                s.add(c.parentless_household, 10, "Orphan/Single parent");
                s.add(c.below_poverty || c.earner_ill, 10, "Economic hardship");
                s.add(c.child_migrated || c.household_migrates, 10, "Migration/Risk area");
                s.add(c.child_missing, 10, "Protection issues");
            }
            ProtectionRisk::ChildTrafficking => {
                let both = c.out_of_school && c.economically_active;
                s.add(both, 25, "Out of school + Economic activity");
                s.add(!both && c.out_of_school, 15, "Out of school");
                s.add(!both && c.economically_active, 10, "Economic activity");
                s.add(c.household_migrates, 20, "Migrant family");
                s.add(!c.household_migrates && c.child_migrated, 15, "Child migrated");
                s.add(c.parentless_household, 20, "Orphan/Single parent");
                s.add(c.below_poverty || c.earner_ill, 10, "Economic hardship");
                s.add(c.migrated_via_agent, 20, "Trafficking risk (agent migration)");
                s.add(c.child_missing, 15, "Missing children in HH");
            }
        }
        s.finish()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct GroupTally {
    at_risk: usize,
    high: usize,
    medium: usize,
}

impl GroupTally {
    fn add(&mut self, level: RiskLevel) {
        if level != RiskLevel::Minimal {
            self.at_risk += 1;
        }
        match level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low | RiskLevel::Minimal => {}
        }
    }
}

/// Scores every risk over its cohort and breaks the results down by region
/// and age band.
///
/// Rows outside a risk's cohort are not scored for it. Rows without a region
/// are left out of the regional breakdown only.
pub fn analyze_protection_risk(records: &[Record]) -> ProtectionAnalysis {
    let mut profiles = Vec::with_capacity(ProtectionRisk::ALL.len());
    let mut regions: OrderedGroups<[GroupTally; 3]> = OrderedGroups::default();
    let mut bands: [[GroupTally; 3]; 3] = Default::default();
    let mut highest_risk = BTreeMap::new();

    for (idx, risk) in ProtectionRisk::ALL.into_iter().enumerate() {
        let assessed: Vec<(&Record, RiskAssessment)> = records
            .iter()
            .filter(|r| risk.in_cohort(r))
            .map(|r| (r, risk.assess(r)))
            .collect();

        for (record, assessment) in &assessed {
            if let Some(region) = record.first_text(REGION_FIELDS) {
                regions.entry(region)[idx].add(assessment.level);
            }
            if let Some(band) = age_band(record).and_then(|b| SCHOOL_AGE_BANDS.iter().position(|s| *s == b)) {
                bands[band][idx].add(assessment.level);
            }
        }

        let profile = profile(risk, &assessed);
        debug!(%risk, assessed = profile.assessed, at_risk = profile.total_at_risk, "scored protection risk");
        profiles.push(profile);
        highest_risk.insert(risk, highest_cases(&assessed));
    }

    let by_region = regions
        .into_entries()
        .into_iter()
        .flat_map(|(region, tallies)| group_rows(region, tallies))
        .collect();
    let by_age_band = SCHOOL_AGE_BANDS
        .iter()
        .zip(bands)
        .flat_map(|(band, tallies)| group_rows(band.to_string(), tallies))
        .collect();

    ProtectionAnalysis {
        profiles,
        by_region,
        by_age_band,
        highest_risk,
    }
}

fn profile(risk: ProtectionRisk, assessed: &[(&Record, RiskAssessment)]) -> RiskProfile {
    let mut p = RiskProfile {
        risk,
        assessed: assessed.len(),
        total_at_risk: 0,
        high: 0,
        medium: 0,
        low: 0,
        minimal: 0,
        avg_score: 0.0,
        max_score: 0,
    };
    let mut total = 0u64;
    for (_, a) in assessed {
        match a.level {
            RiskLevel::High => p.high += 1,
            RiskLevel::Medium => p.medium += 1,
            RiskLevel::Low => p.low += 1,
            RiskLevel::Minimal => p.minimal += 1,
        }
        total += u64::from(a.score);
        p.max_score = p.max_score.max(a.score);
    }
    p.total_at_risk = p.assessed - p.minimal;
    p.avg_score = round2(average(total as f64, assessed.len()));
    p
}

fn group_rows(group: String, tallies: [GroupTally; 3]) -> Vec<GroupRisk> {
    ProtectionRisk::ALL
        .into_iter()
        .zip(tallies)
        .map(|(risk, t)| GroupRisk {
            group: group.clone(),
            risk,
            at_risk: t.at_risk,
            high: t.high,
            medium: t.medium,
        })
        .collect()
}

/// Highest-scoring at-risk children, ties kept in row order.
fn highest_cases(assessed: &[(&Record, RiskAssessment)]) -> Vec<RiskCase> {
    let mut at_risk: Vec<&(&Record, RiskAssessment)> = assessed.iter().filter(|(_, a)| a.score > 0).collect();
    at_risk.sort_by(|a, b| b.1.score.cmp(&a.1.score));
    at_risk
        .into_iter()
        .take(HIGHEST_RISK_CASES)
        .map(|(record, a)| RiskCase {
            child_id: record.first_key_string(&[BENEFICIARY_ID]).unwrap_or_default(),
            age_band: age_band(record).unwrap_or_default().to_string(),
            region: record.first_text(REGION_FIELDS).unwrap_or_default().to_string(),
            district: record.first_text(DISTRICT_FIELDS).unwrap_or_default().to_string(),
            score: a.score,
            level: a.level,
            factors: a.factors.clone(),
        })
        .collect()
}
