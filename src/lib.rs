//! Aggregation and derived metrics for child-welfare and education survey
//! datasets.
//!
//! Rows arrive as loosely typed JSON exported from spreadsheets. The modules
//! here filter them, count children, rank locations, derive nutrition,
//! equity and infrastructure indicators, score child protection risk, set
//! states against national nutrition figures and compare two reporting years.
//! Every analysis function is pure and total: malformed input degrades to an
//! empty or zeroed result rather than an error.

pub mod benchmark;
pub mod config;
pub mod equity;
pub mod fields;
pub mod filter;
pub mod infrastructure;
pub mod loader;
pub mod metrics;
pub mod nutrition;
pub mod output;
pub mod protection;
pub mod ranking;
pub mod summary;
pub mod types;
pub mod util;

pub use benchmark::{correlate_states, state_programs, state_programs_from_summary};
pub use config::AnalysisConfig;
pub use equity::analyze_equity;
pub use filter::filter_data;
pub use infrastructure::correlate_infrastructure;
pub use loader::{load_benchmark, load_dataset, records_from_value, Dataset};
pub use metrics::{percent_change, trend, year_over_year};
pub use nutrition::{analyze_nutrition, analyze_nutrition_with, compare_nutrition_years};
pub use protection::analyze_protection_risk;
pub use ranking::rank_locations;
pub use summary::{build_dataset_summary, category_counts, summarize, summary_stats_from_summary, yearly_counts};
pub use types::{
    DatasetSummary, EquityMetrics, FilterCriteria, GroupBy, InfrastructureImpact, LocationPerformance,
    LocationRanking, MetricSource, NationalBenchmark, NutritionComparison, NutritionMetrics, NutritionTrend,
    ProtectionAnalysis, ProtectionRisk, Record, RecordShape, RiskLevel, Scalar, StateCorrelation, SummaryStats,
    Trend, TrendData, YearlyCounts,
};
