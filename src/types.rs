use crate::fields;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// A single cell of a survey row.
///
/// Source spreadsheets are exported to JSON with no schema, so every value is
/// one of four loose shapes. Nested arrays or objects inside a row carry no
/// meaning for aggregation and collapse to `Null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Text used for exact-match comparisons. Integral numbers drop their
    /// fractional part so a numeric `Year` of 2023 compares equal to "2023".
    pub fn as_key_string(&self) -> Option<String> {
        match self {
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Number(n) => Some(canonical_number(*n)),
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Null => None,
        }
    }
}

fn canonical_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<Value> for Scalar {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
            Value::String(s) => Scalar::Text(s),
            Value::Bool(b) => Scalar::Bool(b),
            Value::Null | Value::Array(_) | Value::Object(_) => Scalar::Null,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Number(n) => serializer.serialize_f64(*n),
            Scalar::Text(s) => serializer.serialize_str(s),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Null => serializer.serialize_unit(),
        }
    }
}

/// One row of survey or facility data, keyed by whatever column names the
/// source export happened to use. Columns keep their source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a column, replacing the value in place when it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Scalar::as_str)
    }

    /// First non-empty string value among `keys`, in order.
    pub fn first_text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.text(k))
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// First present value among `keys`, in its comparable text form.
    pub fn first_key_string(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.get(k)).and_then(Scalar::as_key_string)
    }

    /// Lowercased text of a column, or empty when absent or null.
    pub fn lower(&self, key: &str) -> String {
        self.get(key)
            .and_then(Scalar::as_key_string)
            .map(|s| s.to_lowercase())
            .unwrap_or_default()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Scalar::as_f64)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to value")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((key, value)) = map.next_entry::<String, Scalar>()? {
                    record.insert(key, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// How a record should be read: one child, or a row of pre-summed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Individual,
    Aggregate,
}

impl RecordShape {
    pub fn classify(record: &Record) -> Self {
        if record.contains(fields::GENDER_FIELD) {
            RecordShape::Individual
        } else {
            RecordShape::Aggregate
        }
    }
}

/// Geographic key used for grouping and ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    District,
    Block,
    State,
    Region,
}

impl GroupBy {
    /// Column names that carry this key, most specific first.
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            GroupBy::District => fields::DISTRICT_FIELDS,
            GroupBy::Block => fields::BLOCK_FIELDS,
            GroupBy::State => fields::STATE_FIELDS,
            GroupBy::Region => fields::REGION_FIELDS,
        }
    }

    pub fn key_of(self, record: &Record) -> Option<&str> {
        record.first_text(self.field_names())
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GroupBy::District => "district",
            GroupBy::Block => "block",
            GroupBy::State => "state",
            GroupBy::Region => "region",
        };
        f.write_str(s)
    }
}

/// Exact-match row filter. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub region: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub year: Option<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.district.is_none() && self.state.is_none() && self.year.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_records: usize,
    pub total_children: u64,
    pub total_boys: u64,
    pub total_girls: u64,
    pub regions: Vec<String>,
    pub districts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct TrendData {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Base")]
    pub base_value: f64,
    #[tabled(rename = "Current")]
    pub current_value: f64,
    #[tabled(rename = "Change %")]
    pub change_percent: f64,
    #[tabled(rename = "Trend")]
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankCategory {
    Top,
    Bottom,
}

impl fmt::Display for RankCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RankCategory::Top => "top",
            RankCategory::Bottom => "bottom",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct LocationPerformance {
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: f64,
    #[tabled(rename = "Category")]
    pub category: RankCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRanking {
    pub top: Vec<LocationPerformance>,
    pub bottom: Vec<LocationPerformance>,
}

/// Whether nutrition percentages come from the data or were synthesised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSource {
    Measured,
    Estimated,
}

impl fmt::Display for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetricSource::Measured => "measured",
            MetricSource::Estimated => "estimated",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct NutritionMetrics {
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Year", display_with = "display_year")]
    pub year: Option<i32>,
    #[tabled(skip)]
    pub underweight: f64,
    #[tabled(skip)]
    pub stunting: f64,
    #[tabled(skip)]
    pub wasting: f64,
    #[tabled(skip)]
    pub normal: f64,
    #[tabled(rename = "Underweight %")]
    pub underweight_percent: f64,
    #[tabled(rename = "Stunting %")]
    pub stunting_percent: f64,
    #[tabled(rename = "Wasting %")]
    pub wasting_percent: f64,
    #[tabled(rename = "Normal %")]
    pub normal_percent: f64,
    #[tabled(rename = "Source")]
    pub source: MetricSource,
}

impl NutritionMetrics {
    pub fn is_estimated(&self) -> bool {
        self.source == MetricSource::Estimated
    }
}

fn display_year(year: &Option<i32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutritionTrend {
    Improved,
    Worsened,
    Stable,
}

impl fmt::Display for NutritionTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NutritionTrend::Improved => "improved",
            NutritionTrend::Worsened => "worsened",
            NutritionTrend::Stable => "stable",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricChange {
    pub baseline: f64,
    pub current: f64,
    pub delta: f64,
    pub percent_change: f64,
    pub trend: NutritionTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionComparison {
    pub location: String,
    pub underweight: MetricChange,
    pub stunting: MetricChange,
    pub wasting: MetricChange,
    /// True when either year's figures for this location were synthesised.
    pub estimated: bool,
}

/// Flat view of one metric of a [`NutritionComparison`], for tables and CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct NutritionChangeRow {
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Baseline %")]
    pub baseline: f64,
    #[tabled(rename = "Current %")]
    pub current: f64,
    #[tabled(rename = "Delta")]
    pub delta: f64,
    #[tabled(rename = "Change %")]
    pub percent_change: f64,
    #[tabled(rename = "Trend")]
    pub trend: NutritionTrend,
    #[tabled(rename = "Estimated")]
    pub estimated: bool,
}

impl NutritionComparison {
    pub fn to_rows(&self) -> Vec<NutritionChangeRow> {
        [
            ("underweight", &self.underweight),
            ("stunting", &self.stunting),
            ("wasting", &self.wasting),
        ]
        .into_iter()
        .map(|(metric, change)| NutritionChangeRow {
            location: self.location.clone(),
            metric: metric.to_string(),
            baseline: change.baseline,
            current: change.current,
            delta: change.delta,
            percent_change: change.percent_change,
            trend: change.trend,
            estimated: self.estimated,
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct EquityMetrics {
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Boys")]
    pub boys: u64,
    #[tabled(rename = "Girls")]
    pub girls: u64,
    #[tabled(rename = "Children")]
    pub total_children: u64,
    #[tabled(rename = "Girls %")]
    pub gender_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureImpact {
    #[tabled(rename = "Attribute")]
    pub attribute: String,
    #[tabled(rename = "With")]
    pub facilities_with: usize,
    #[tabled(rename = "Without")]
    pub facilities_without: usize,
    #[tabled(rename = "Avg Enrolled (with)")]
    pub avg_enrollment_with: f64,
    #[tabled(rename = "Avg Enrolled (without)")]
    pub avg_enrollment_without: f64,
    #[tabled(rename = "Impact %")]
    pub impact: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderCounts {
    pub count: u64,
    pub boys: u64,
    pub girls: u64,
}

impl GenderCounts {
    pub fn add(&mut self, other: &GenderCounts) {
        self.count += other.count;
        self.boys += other.boys;
        self.girls += other.girls;
    }
}

/// Counts keyed by year, as stored per location in a summary document.
pub type YearlyCounts = BTreeMap<String, GenderCounts>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialNeeds {
    pub yes: u64,
    pub no: u64,
}

/// Pre-aggregated summary document produced upstream and consumed in place of
/// raw rows when the raw export is too large to ship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetSummary {
    pub total_records: u64,
    pub by_year: YearlyCounts,
    pub by_state: BTreeMap<String, GenderCounts>,
    pub by_region: BTreeMap<String, GenderCounts>,
    pub by_district: BTreeMap<String, GenderCounts>,
    pub by_project: BTreeMap<String, GenderCounts>,
    pub state_year_data: BTreeMap<String, YearlyCounts>,
    pub region_year_data: BTreeMap<String, YearlyCounts>,
    pub district_year_data: BTreeMap<String, YearlyCounts>,
    pub by_age_band: BTreeMap<String, u64>,
    pub by_facility_type: BTreeMap<String, u64>,
    pub by_location_type: BTreeMap<String, u64>,
    pub by_social_category: BTreeMap<String, u64>,
    pub by_religion: BTreeMap<String, u64>,
    pub by_educational_status: BTreeMap<String, u64>,
    pub by_dropout_reason: BTreeMap<String, u64>,
    pub special_needs: SpecialNeeds,
    pub region_district_map: BTreeMap<String, Vec<String>>,
    pub sample_records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Count")]
    pub count: u64,
    #[tabled(rename = "Share %")]
    pub share: f64,
}

/// The three protection risks scored per child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtectionRisk {
    ChildMarriage,
    ChildLabour,
    ChildTrafficking,
}

impl fmt::Display for ProtectionRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtectionRisk::ChildMarriage => "child marriage",
            ProtectionRisk::ChildLabour => "child labour",
            ProtectionRisk::ChildTrafficking => "child trafficking",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Minimal => "Minimal",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        })
    }
}

/// Score and contributing factors for one child and one risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

/// Distribution of one risk over its cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    #[tabled(rename = "Risk")]
    pub risk: ProtectionRisk,
    #[tabled(rename = "Assessed")]
    pub assessed: usize,
    #[tabled(rename = "At Risk")]
    pub total_at_risk: usize,
    #[tabled(rename = "High")]
    pub high: usize,
    #[tabled(rename = "Medium")]
    pub medium: usize,
    #[tabled(rename = "Low")]
    pub low: usize,
    #[tabled(rename = "Minimal")]
    pub minimal: usize,
    #[tabled(rename = "Avg Score")]
    pub avg_score: f64,
    #[tabled(rename = "Max Score")]
    pub max_score: u32,
}

/// At-risk counts for one risk within a region or age band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct GroupRisk {
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "Risk")]
    pub risk: ProtectionRisk,
    #[tabled(rename = "At Risk")]
    pub at_risk: usize,
    #[tabled(rename = "High")]
    pub high: usize,
    #[tabled(rename = "Medium")]
    pub medium: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct RiskCase {
    #[tabled(rename = "Child")]
    pub child_id: String,
    #[tabled(rename = "Age Band")]
    pub age_band: String,
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "District")]
    pub district: String,
    #[tabled(rename = "Score")]
    pub score: u32,
    #[tabled(rename = "Level")]
    pub level: RiskLevel,
    #[tabled(skip)]
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionAnalysis {
    /// One profile per risk, in `ProtectionRisk` order.
    pub profiles: Vec<RiskProfile>,
    pub by_region: Vec<GroupRisk>,
    pub by_age_band: Vec<GroupRisk>,
    pub highest_risk: BTreeMap<ProtectionRisk, Vec<RiskCase>>,
}

/// Malnutrition prevalence (percent of children) from an external survey.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionPrevalence {
    pub underweight: f64,
    pub stunting: f64,
    pub wasting: f64,
}

/// National nutrition survey figures: one national average plus one entry
/// per state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NationalBenchmark {
    pub india_average: NutritionPrevalence,
    pub state_data: BTreeMap<String, NutritionPrevalence>,
}

/// Program reach in one state, as counted from rows or a summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProgram {
    pub total_children: u64,
    pub boys: u64,
    pub girls: u64,
    pub districts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct StateCorrelation {
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Children")]
    pub children: u64,
    #[tabled(rename = "Boys")]
    pub boys: u64,
    #[tabled(rename = "Girls")]
    pub girls: u64,
    #[tabled(rename = "Underweight %")]
    pub underweight: f64,
    #[tabled(rename = "Stunting %")]
    pub stunting: f64,
    #[tabled(rename = "Wasting %")]
    pub wasting: f64,
    #[tabled(rename = "Underweight vs avg")]
    pub underweight_vs_avg: f64,
    #[tabled(rename = "Stunting vs avg")]
    pub stunting_vs_avg: f64,
    #[tabled(rename = "Wasting vs avg")]
    pub wasting_vs_avg: f64,
    #[tabled(skip)]
    pub districts: Vec<String>,
}
