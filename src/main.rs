// `survey-report`: loads survey datasets, runs every analysis and prints
// previews, optionally exporting each report to an output directory.
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use survey_insights::config::AnalysisConfig;
use survey_insights::output::{self, preview_table};
use survey_insights::types::{GroupBy, NutritionChangeRow, ProtectionRisk, Record, RiskCase, StateProgram, SummaryStats};
use survey_insights::util::format_int;
use survey_insights::{
    analyze_equity, analyze_nutrition, analyze_protection_risk, build_dataset_summary, category_counts,
    compare_nutrition_years, correlate_infrastructure, correlate_states, filter_data, load_benchmark, load_dataset,
    rank_locations, state_programs, state_programs_from_summary, summarize, summary_stats_from_summary,
    year_over_year, yearly_counts, Dataset, DatasetSummary, FilterCriteria,
};
use std::collections::BTreeMap;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "survey-report", about = "Comparative statistics for survey datasets")]
struct Cli {
    /// Child-level records or a pre-aggregated summary document (JSON).
    #[arg(long, env = "SURVEY_DATA")]
    data: PathBuf,
    /// School / facility records for the infrastructure comparison.
    #[arg(long, env = "SURVEY_FACILITIES")]
    facilities: Option<PathBuf>,
    /// Education records with enrollment status, joined to facilities by district.
    #[arg(long, env = "SURVEY_ENROLLMENT")]
    enrollment: Option<PathBuf>,
    /// Score child marriage, labour and trafficking risk per child.
    #[arg(long, env = "SURVEY_PROTECTION")]
    protection: bool,
    /// National nutrition survey figures (JSON) to set each state against.
    #[arg(long, env = "SURVEY_BENCHMARK")]
    benchmark: Option<PathBuf>,
    /// JSON analysis config; flags below override it.
    #[arg(long, env = "SURVEY_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    district: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    year: Option<String>,
    #[arg(long, value_enum)]
    group_by: Option<GroupBy>,
    /// Numeric column to rank locations by; rows without it count as 1.
    #[arg(long)]
    metric: Option<String>,
    #[arg(long)]
    top_n: Option<usize>,
    #[arg(long)]
    baseline_year: Option<i32>,
    #[arg(long)]
    compare_year: Option<i32>,
    #[arg(long)]
    category_field: Option<String>,
    /// Directory to write JSON/CSV reports into.
    #[arg(long, env = "SURVEY_OUT_DIR")]
    out_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,
    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        let filter = &mut config.filter;
        override_with(&mut filter.region, &self.region);
        override_with(&mut filter.district, &self.district);
        override_with(&mut filter.state, &self.state);
        override_with(&mut filter.year, &self.year);
        if let Some(g) = self.group_by {
            config.group_by = g;
        }
        if let Some(m) = &self.metric {
            config.metric = m.clone();
        }
        if let Some(n) = self.top_n {
            config.top_n = n;
        }
        if let Some(y) = self.baseline_year {
            config.baseline_year = y;
        }
        if let Some(y) = self.compare_year {
            config.compare_year = y;
        }
        if let Some(c) = &self.category_field {
            config.category_field = c.clone();
        }
        Ok(config)
    }
}

fn override_with(slot: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("SURVEY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Writes a report into the output directory when one was given.
struct Exporter {
    dir: Option<PathBuf>,
}

impl Exporter {
    fn new(dir: Option<PathBuf>) -> Result<Self> {
        if let Some(d) = &dir {
            std::fs::create_dir_all(d).with_context(|| format!("creating output directory {}", d.display()))?;
        }
        Ok(Self { dir })
    }

    fn json<T: Serialize>(&self, name: &str, value: &T) {
        if let Some(dir) = &self.dir {
            report_write(output::write_json(&dir.join(name), value));
        }
    }

    fn csv<T: Serialize>(&self, name: &str, rows: &[T]) {
        if let Some(dir) = &self.dir {
            report_write(output::write_csv(&dir.join(name), rows));
        }
    }
}

fn report_write(result: std::result::Result<(), output::ExportError>) {
    if let Err(e) = result {
        warn!(error = %e, "export failed");
    }
}

fn print_summary(stats: &SummaryStats) {
    println!(
        "Summary: {} records, {} children ({} boys, {} girls) across {} regions and {} districts\n",
        format_int(stats.total_records as u64),
        format_int(stats.total_children),
        format_int(stats.total_boys),
        format_int(stats.total_girls),
        stats.regions.len(),
        stats.districts.len()
    );
}

/// Rows for one reporting year; when no row carries that year the whole
/// filtered set is used and the year is only passed through to the analysis.
fn rows_for_year(records: &[Record], base: &FilterCriteria, year: i32) -> Vec<Record> {
    let criteria = FilterCriteria { year: Some(year.to_string()), ..base.clone() };
    let rows = filter_data(records, &criteria);
    if rows.is_empty() {
        filter_data(records, base)
    } else {
        rows
    }
}

fn run_records(
    records: &[Record],
    config: &AnalysisConfig,
    exporter: &Exporter,
    preview: usize,
    protection: bool,
    benchmark: Option<&Path>,
) {
    let filtered = filter_data(records, &config.filter);
    info!(loaded = records.len(), filtered = filtered.len(), "applied filter");

    let stats = summarize(&filtered);
    print_summary(&stats);
    exporter.json("summary_stats.json", &stats);

    let trends = year_over_year(&build_dataset_summary(&filtered).by_year, config.baseline_year, config.compare_year);
    preview_table(
        "Year-over-Year Trends",
        Some(&format!("{} vs {}", config.baseline_year, config.compare_year)),
        &trends,
        preview,
    );
    exporter.csv("year_over_year.csv", &trends);

    let ranking = rank_locations(&filtered, &config.metric, config.group_by, config.top_n);
    let note = format!("by {} of '{}'", config.group_by, config.metric);
    preview_table("Top Locations", Some(&note), &ranking.top, preview);
    preview_table("Bottom Locations", Some(&note), &ranking.bottom, preview);
    exporter.json("location_ranking.json", &ranking);

    let year_filter = FilterCriteria { year: None, ..config.filter.clone() };
    let baseline = analyze_nutrition(
        &rows_for_year(records, &year_filter, config.baseline_year),
        config.group_by,
        Some(config.baseline_year),
    );
    let current = analyze_nutrition(
        &rows_for_year(records, &year_filter, config.compare_year),
        config.group_by,
        Some(config.compare_year),
    );
    let estimated = current.iter().filter(|m| m.is_estimated()).count();
    let note = if estimated > 0 {
        format!("{} of {} locations ESTIMATED, not measured", estimated, current.len())
    } else {
        "measured".to_string()
    };
    preview_table("Nutrition Indicators", Some(&note), &current, preview);
    let comparison = compare_nutrition_years(&baseline, &current);
    let change_rows: Vec<NutritionChangeRow> = comparison.iter().flat_map(|c| c.to_rows()).collect();
    preview_table("Nutrition Change", None, &change_rows, preview);
    exporter.json("nutrition_baseline.json", &baseline);
    exporter.json("nutrition_current.json", &current);
    exporter.json("nutrition_comparison.json", &comparison);
    exporter.csv("nutrition_comparison.csv", &change_rows);

    let equity = analyze_equity(&filtered, &config.category_field);
    preview_table("Equity Breakdown", Some(&config.category_field), &equity, preview);
    exporter.csv("equity.csv", &equity);

    if protection {
        run_protection(&filtered, exporter, preview);
    }
    if let Some(benchmark) = benchmark {
        run_benchmark(&state_programs(&filtered), benchmark, exporter, preview);
    }
}

fn run_summary(summary: &DatasetSummary, config: &AnalysisConfig, exporter: &Exporter, preview: usize) {
    info!("summary document supplied; row-level analyses are skipped");
    let criteria = &config.filter;
    let locations = [&criteria.state, &criteria.region, &criteria.district]
        .iter()
        .filter(|c| c.is_some())
        .count();
    if locations > 1 {
        warn!("summary documents cannot intersect location filters; counts follow the most specific one");
    }

    let stats = summary_stats_from_summary(summary, criteria);
    print_summary(&stats);
    exporter.json("summary_stats.json", &stats);

    let trends = year_over_year(&yearly_counts(summary, criteria), config.baseline_year, config.compare_year);
    preview_table(
        "Year-over-Year Trends",
        Some(&format!("{} vs {}", config.baseline_year, config.compare_year)),
        &trends,
        preview,
    );
    exporter.csv("year_over_year.csv", &trends);

    if !criteria.is_empty() {
        warn!("category breakdowns in a summary document are not filtered");
    }
    let location_types = category_counts(&summary.by_location_type);
    preview_table("Location Type", None, &location_types, preview);
    exporter.csv("location_type.csv", &location_types);
    let social = category_counts(&summary.by_social_category);
    preview_table("Social Category", None, &social, preview);
    exporter.csv("social_category.csv", &social);
}

fn run_protection(records: &[Record], exporter: &Exporter, preview: usize) {
    let analysis = analyze_protection_risk(records);
    preview_table("Protection Risk", Some("scores capped at 100"), &analysis.profiles, preview);
    preview_table("Protection Risk by Region", None, &analysis.by_region, preview);
    for risk in ProtectionRisk::ALL {
        let cases: &[RiskCase] = analysis.highest_risk.get(&risk).map(Vec::as_slice).unwrap_or_default();
        preview_table(&format!("Highest {risk} risk"), None, cases, preview);
    }
    exporter.json("protection_risk.json", &analysis);
    exporter.csv("protection_risk_by_age_band.csv", &analysis.by_age_band);
}

fn run_benchmark(programs: &BTreeMap<String, StateProgram>, path: &Path, exporter: &Exporter, preview: usize) {
    let benchmark = match load_benchmark(path) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "skipping state benchmark");
            return;
        }
    };
    let rows = correlate_states(programs, &benchmark);
    preview_table("States vs National Nutrition Survey", Some("percentage points vs national average"), &rows, preview);
    exporter.json("state_benchmark.json", &rows);
}

fn load_records(path: &Path) -> Result<Vec<Record>> {
    match load_dataset(path).with_context(|| format!("loading {}", path.display()))? {
        Dataset::Records(records) => Ok(records),
        Dataset::Summary(_) => {
            warn!(path = %path.display(), "expected rows but found a summary document");
            Ok(Vec::new())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    let config = cli.resolve_config()?;
    let exporter = Exporter::new(cli.out_dir.clone())?;

    match load_dataset(&cli.data).with_context(|| format!("loading {}", cli.data.display()))? {
        Dataset::Records(records) => run_records(
            &records,
            &config,
            &exporter,
            cli.preview_rows,
            cli.protection,
            cli.benchmark.as_deref(),
        ),
        Dataset::Summary(summary) => {
            run_summary(&summary, &config, &exporter, cli.preview_rows);
            if cli.protection {
                warn!("protection scoring needs child rows; skipped for a summary document");
            }
            if let Some(path) = &cli.benchmark {
                run_benchmark(&state_programs_from_summary(&summary), path, &exporter, cli.preview_rows);
            }
        }
    }

    if let (Some(fac_path), Some(enr_path)) = (&cli.facilities, &cli.enrollment) {
        let facilities = filter_data(&load_records(fac_path)?, &config.filter);
        let enrollment = load_records(enr_path)?;
        let impacts = correlate_infrastructure(&facilities, &enrollment, &config.attributes());
        preview_table(
            "Infrastructure vs Enrollment",
            Some("avg children currently in school per facility"),
            &impacts,
            cli.preview_rows,
        );
        exporter.csv("infrastructure_impact.csv", &impacts);
    }

    Ok(())
}
