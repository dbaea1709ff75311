mod analyzer;
mod enrich;
mod errors;
mod models;
mod population;
mod regions;
mod report;
mod roster;
mod scraper;
mod taxonomy;

use std::path::{Path, PathBuf};

use analyzer::{Distribution, RepresentationAnalyzer};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use models::{Config, LegislatorRecord};
use population::LabelledCount;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

const MISSING_PROFESSION_CSV: &str = "missing_profession_mp.csv";
const WIKIPEDIA_EDUCATION_CSV: &str = "wikipedia_education.csv";
const WIKIPEDIA_PROFESSIONS_CSV: &str = "wikipedia_professions.csv";

fn cli() -> Command {
    Command::new("parlamento-analyzer")
        .version("1.0")
        .about("Compares the demographics of the Italian Parliament with census data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml")
                .global(true),
        )
        .subcommand(Command::new("clean").about("Merge the Camera and Senato rosters into one clean roster"))
        .subcommand(Command::new("regions").about("Assign a region of birth to every legislator"))
        .subcommand(Command::new("enrich").about("Look up missing education and professions on Wikipedia"))
        .subcommand(Command::new("integrate").about("Backfill missing education and professions"))
        .subcommand(Command::new("analyze").about("Descriptive statistics for the legislators"))
        .subcommand(Command::new("population").about("Descriptive statistics for the census population"))
        .subcommand(Command::new("compare").about("Compare legislators against the census population"))
        .subcommand(
            Command::new("all").about("Run clean, regions, integrate, analyze, population and compare in order"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = cli().get_matches();
    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    let config = if Path::new(config_file).exists() {
        info!("Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration from {}", config_file))?
    } else {
        info!("Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        info!("Please review {} and run the program again.", config_file);
        return Ok(());
    };

    run(&config, &matches).await
}

async fn run(config: &Config, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("clean", _)) => run_clean(config),
        Some(("regions", _)) => run_regions(config),
        Some(("enrich", _)) => run_enrich(config).await,
        Some(("integrate", _)) => run_integrate(config),
        Some(("analyze", _)) => run_analyze(config),
        Some(("population", _)) => run_population(config),
        Some(("compare", _)) => run_compare(config),
        Some(("all", _)) => {
            run_clean(config)?;
            run_regions(config)?;
            run_integrate(config)?;
            run_analyze(config)?;
            run_population(config)?;
            run_compare(config)
        }
        _ => Ok(()),
    }
}

fn run_clean(config: &Config) -> Result<()> {
    info!("Cleaning chamber rosters from {}", config.data_directory);
    let camera = roster::load_camera(&config.data_path(&config.inputs.camera_roster))?;
    let senato = roster::load_senato(&config.data_path(&config.inputs.senato_roster))?;
    let merged = roster::merge_rosters(camera, senato);

    let path = config.data_path(&config.inputs.clean_roster);
    roster::write_roster(&path, &merged)?;
    info!("Wrote {} legislators to {}", merged.len(), path.display());
    Ok(())
}

fn run_regions(config: &Config) -> Result<()> {
    let mut records = roster::read_roster(&config.data_path(&config.inputs.clean_roster))?;
    let assignment = regions::assign_regions(&mut records);
    assignment.log();

    let path = config.data_path(&config.inputs.regions_roster);
    roster::write_roster(&path, &records)?;
    info!("Wrote roster with regions to {}", path.display());
    Ok(())
}

async fn run_enrich(config: &Config) -> Result<()> {
    let records = roster::read_roster(&config.data_path(&config.inputs.clean_roster))?;

    let missing = enrich::missing_profession(&records);
    info!("Number of MPs with missing profession: {}", missing.len());
    roster::write_rows(&config.output_path(MISSING_PROFESSION_CSV), &missing)?;

    let client = scraper::EncyclopediaClient::new(&config.enrichment)?;

    let education = enrich::collect_education(&client, &records).await;
    let path = config.output_path(WIKIPEDIA_EDUCATION_CSV);
    roster::write_rows(&path, &education)?;
    info!("Saved {} education results to {}", education.len(), path.display());

    let professions = enrich::collect_professions(&client, &missing).await;
    let path = config.output_path(WIKIPEDIA_PROFESSIONS_CSV);
    roster::write_rows(&path, &professions)?;
    info!("Saved {} profession results to {}", professions.len(), path.display());
    Ok(())
}

/// The roster with regions when stage 2 has run, the clean roster otherwise.
fn base_roster_path(config: &Config) -> PathBuf {
    let with_regions = config.data_path(&config.inputs.regions_roster);
    if with_regions.exists() {
        with_regions
    } else {
        config.data_path(&config.inputs.clean_roster)
    }
}

fn read_lookups<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        warn!("{} not found, run `enrich` to create it", path.display());
        return Ok(Vec::new());
    }
    Ok(roster::read_rows(path)?)
}

fn run_integrate(config: &Config) -> Result<()> {
    let source = base_roster_path(config);
    let mut records = roster::read_roster(&source)?;
    info!("Integrating enrichment results into {}", source.display());

    let education: Vec<enrich::EducationLookup> = read_lookups(&config.output_path(WIKIPEDIA_EDUCATION_CSV))?;
    let counts = enrich::backfill_education(&mut records, &education);
    counts.log(records.len());

    let professions: Vec<enrich::ProfessionLookup> =
        read_lookups(&config.output_path(WIKIPEDIA_PROFESSIONS_CSV))?;
    let updated = enrich::backfill_professions(&mut records, &professions);
    info!("Updated {} records with Wikipedia profession data", updated);

    let path = config.data_path(&config.inputs.updated_roster);
    roster::write_roster(&path, &records)?;
    info!("Wrote updated roster to {}", path.display());
    Ok(())
}

/// The most complete roster available: backfilled, then with regions, then clean.
fn analysis_roster(config: &Config) -> Result<Vec<LegislatorRecord>> {
    let updated = config.data_path(&config.inputs.updated_roster);
    let path = if updated.exists() { updated } else { base_roster_path(config) };
    info!("Reading legislators from {}", path.display());
    let records = roster::read_roster(&path).with_context(|| format!("Run `clean` first to create {}", path.display()))?;
    if records.iter().all(|r| r.regione_nascita.is_none()) {
        warn!("No region of birth in {}; run `regions` first", path.display());
    }
    Ok(records)
}

fn run_analyze(config: &Config) -> Result<()> {
    let records = analysis_roster(config)?;
    let mps = RepresentationAnalyzer::new(&records, config.reference_date()?);
    info!("Analyzing {} legislators as of {}", records.len(), mps.reference_date);

    report::generate_distribution_csv(
        &mps.gender_summary(),
        "genere",
        &config.output_path("gender_analysis_summary.csv"),
    )?;
    report::generate_distribution_csv(
        &mps.age_summary(),
        "age_group",
        &config.output_path("age_analysis_summary.csv"),
    )?;

    let (regions, missing_region) = mps.region_summary();
    if missing_region > 0 {
        warn!("{} legislators have no region of birth", missing_region);
    }
    report::generate_distribution_csv(&regions, "regione", &config.output_path("region_distribution.csv"))?;

    report::generate_distribution_csv(
        &mps.profession_frequencies(),
        "professione",
        &config.output_path("profession_analysis.csv"),
    )?;
    report::generate_distribution_csv(
        &mps.profession_categories(),
        "category",
        &config.output_path("profession_category_analysis.csv"),
    )?;

    info!("Legislators with missing education: {}", mps.missing_education());
    report::generate_distribution_csv(
        &mps.education_frequencies(),
        "titolo_studio",
        &config.output_path("education_analysis.csv"),
    )?;
    report::generate_distribution_csv(
        &mps.education_categories(),
        "category",
        &config.output_path("education_category_analysis.csv"),
    )?;

    let seniors = mps.seniors();
    info!("Legislators aged {} or older: {}", analyzer::SENIOR_AGE, seniors.members.len());
    for chamber in &seniors.by_chamber {
        info!(
            "  {}: {} of {} ({:.1}%)",
            chamber.chamber, chamber.seniors, chamber.members, chamber.percentage
        );
    }
    report::generate_senior_members_csv(&seniors, &config.output_path("senior_members.csv"))?;
    report::generate_senior_summary_csv(&seniors, &config.output_path("senior_summary.csv"))?;
    if config.write_charts {
        report::generate_senior_chart(&seniors, &config.output_path("senior_members_chart.html"))?;
    }

    info!("Descriptive analysis written to {}", config.output_directory);
    Ok(())
}

fn run_population(config: &Config) -> Result<()> {
    let cohorts = population::load_age_sex(&config.data_path(&config.inputs.population_age_sex))?;
    report::generate_distribution_csv(
        &population::gender_summary(&cohorts),
        "genere",
        &config.output_path("population_gender_analysis_summary.csv"),
    )?;
    report::generate_distribution_csv(
        &population::age_summary(&cohorts),
        "age_group",
        &config.output_path("population_age_analysis_summary.csv"),
    )?;

    let regions =
        population::load_labelled_counts(&config.data_path(&config.inputs.population_regions), "Regione")?;
    report::generate_distribution_csv(
        &population::regions_summary(&regions),
        "regione",
        &config.output_path("population_regions_analysis_summary.csv"),
    )?;

    let births = population::load_labelled_counts(
        &config.data_path(&config.inputs.population_foreign_birth),
        "Paese di nascita",
    )?;
    report::generate_distribution_csv(
        &population::birth_place_summary(&births),
        "birth_place",
        &config.output_path("population_birth_place_analysis_summary.csv"),
    )?;

    info!("Population summaries written to {}", config.output_directory);
    Ok(())
}

/// Optional census tables are skipped with a warning when absent.
fn load_optional(path: &Path, label_column: &str) -> Result<Option<Vec<LabelledCount>>> {
    if !path.exists() {
        warn!("{} not found, skipping this comparison", path.display());
        return Ok(None);
    }
    Ok(Some(population::load_labelled_counts(path, label_column)?))
}

fn note_excluded(axis: &str, distribution: &Distribution) {
    if distribution.excluded() > 0 {
        warn!(
            "{}: {} legislators without a usable value were left out",
            axis,
            distribution.excluded()
        );
    }
}

fn run_compare(config: &Config) -> Result<()> {
    let records = analysis_roster(config)?;
    let mps = RepresentationAnalyzer::new(&records, config.reference_date()?);
    let cohorts = population::load_age_sex(&config.data_path(&config.inputs.population_age_sex))?;

    let gender = mps.gender_distribution();
    note_excluded("gender", &gender);
    report::generate_comparison_csv(
        &analyzer::compare(&gender, &population::gender_distribution(&cohorts)),
        "gender",
        &config.output_path("gender_comparison_analysis.csv"),
    )?;

    let age = mps.age_distribution();
    note_excluded("age", &age);
    report::generate_comparison_csv(
        &analyzer::compare_age(&age, &population::age_distribution(&cohorts)),
        "age_group",
        &config.output_path("age_comparison_analysis.csv"),
    )?;

    let regions =
        population::load_labelled_counts(&config.data_path(&config.inputs.population_regions), "Regione")?;
    let mp_regions = mps.region_distribution();
    let (missing_region, foreign_born) = mps.region_exclusions();
    if missing_region > 0 {
        warn!("region: {} legislators without a birth region were left out", missing_region);
    }
    info!("region: {} foreign-born legislators are compared on the birth place axis only", foreign_born);
    let region_rows = analyzer::compare_regions(&mp_regions, &population::region_distribution(&regions));
    report::generate_comparison_csv(&region_rows, "regione", &config.output_path("region_comparison_analysis.csv"))?;
    if config.write_charts {
        report::generate_region_chart(&region_rows, &config.output_path("region_comparison_chart.html"))?;
    }

    let births = population::load_labelled_counts(
        &config.data_path(&config.inputs.population_foreign_birth),
        "Paese di nascita",
    )?;
    let birth_place = mps.birth_place_distribution();
    note_excluded("birth place", &birth_place);
    report::generate_comparison_csv(
        &analyzer::compare(&birth_place, &population::birth_place_distribution(&births)),
        "birth_place",
        &config.output_path("foreign_comparison_analysis.csv"),
    )?;

    if let Some(levels) = load_optional(
        &config.data_path(&config.inputs.population_education),
        "Titolo di studio",
    )? {
        let education = mps.education_distribution();
        note_excluded("education", &education);
        report::generate_comparison_csv(
            &analyzer::compare(&education, &population::education_distribution(&levels)),
            "education_level",
            &config.output_path("education_comparison_analysis.csv"),
        )?;
    }

    if let Some(fields) = load_optional(
        &config.data_path(&config.inputs.population_degree_fields),
        "Campo di studio",
    )? {
        report::generate_comparison_csv(
            &analyzer::compare(
                &mps.degree_field_distribution(),
                &population::degree_field_distribution(&fields),
            ),
            "degree_field",
            &config.output_path("degree_field_comparison_analysis.csv"),
        )?;
    }

    info!("Comparisons written to {}", config.output_directory);
    Ok(())
}
