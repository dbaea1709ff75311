//! Census reference tables and the population side of every comparison.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::analyzer::{AgeBracket, Distribution, ITALY};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::DistributionRow;
use crate::regions::{reference_region_name, FOREIGN};
use crate::taxonomy::{DEGREE_FIELDS, EDUCATION, OTHER};

const TOTAL_LABEL: &str = "Totale";
const OPEN_ENDED_AGE: &str = "100 e oltre";

/// Census education labels below the diploma tier, checked before the keyword taxonomy.
const CENSUS_EDUCATION_TIERS: &[(&str, &str)] = &[
    ("nessun titolo", OTHER),
    ("alfabet", OTHER),
    ("licenza", OTHER),
];

#[derive(Debug, Clone, Deserialize)]
struct AgeSexRow {
    #[serde(rename = "Età")]
    eta: String,
    #[serde(rename = "Totale maschi")]
    maschi: String,
    #[serde(rename = "Totale femmine")]
    femmine: String,
    #[serde(rename = "Totale")]
    totale: String,
}

/// Residents of one age, from the age/sex table.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeCohort {
    pub age: u32,
    pub males: u64,
    pub females: u64,
    pub total: u64,
}

/// `(label, total)` row from a single-dimension census table.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledCount {
    pub label: String,
    pub total: u64,
}

/// Parses a census count, tolerating spaces and a trailing `.0`.
///
/// Negative, non-finite and out-of-range values are rejected rather than clamped.
fn parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned.parse::<u64>().ok().or_else(|| {
        cleaned
            .parse::<f64>()
            .ok()
            .map(f64::round)
            .filter(|v| v.is_finite() && *v >= 0.0 && *v < u64::MAX as f64)
            .map(|v| v as u64)
    })
}

fn sum_counts(counts: impl Iterator<Item = u64>) -> u64 {
    counts.fold(0, u64::saturating_add)
}

fn parse_age(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw == OPEN_ENDED_AGE {
        return Some(100);
    }
    raw.parse().ok()
}

fn read_error(path: &Path) -> impl Fn(csv::Error) -> AnalysisError + '_ {
    move |source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    }
}

/// Loads the age/sex table, dropping the grand-total row.
pub fn load_age_sex(path: &Path) -> AnalysisResult<Vec<AgeCohort>> {
    let mut reader = csv::Reader::from_path(path).map_err(read_error(path))?;
    let mut cohorts = Vec::new();
    for result in reader.deserialize::<AgeSexRow>() {
        let row = result.map_err(read_error(path))?;
        if row.eta.trim() == TOTAL_LABEL {
            continue;
        }
        let parsed = parse_age(&row.eta).zip(parse_count(&row.maschi)).and_then(|(age, males)| {
            let females = parse_count(&row.femmine)?;
            let total = parse_count(&row.totale)?;
            Some(AgeCohort {
                age,
                males,
                females,
                total,
            })
        });
        match parsed {
            Some(cohort) => cohorts.push(cohort),
            None => warn!("Skipping unparseable age row {:?} in {}", row.eta, path.display()),
        }
    }
    if cohorts.is_empty() {
        return Err(AnalysisError::EmptyPopulation(path.display().to_string()));
    }
    debug!("Loaded {} age cohorts from {}", cohorts.len(), path.display());
    Ok(cohorts)
}

/// Loads `(label_column, Totale)` pairs from a census table.
pub fn load_labelled_counts(path: &Path, label_column: &str) -> AnalysisResult<Vec<LabelledCount>> {
    let mut reader = csv::Reader::from_path(path).map_err(read_error(path))?;
    let headers = reader.headers().map_err(read_error(path))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| AnalysisError::EmptyPopulation(format!("{} (missing column '{}')", path.display(), name)))
    };
    let label_index = column(label_column)?;
    let total_index = column(TOTAL_LABEL)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(read_error(path))?;
        let label = record.get(label_index).map(str::trim).unwrap_or_default();
        match record.get(total_index).and_then(parse_count) {
            Some(total) if !label.is_empty() => rows.push(LabelledCount {
                label: label.to_string(),
                total,
            }),
            _ => warn!("Skipping row {:?} in {}", label, path.display()),
        }
    }
    if rows.is_empty() {
        return Err(AnalysisError::EmptyPopulation(path.display().to_string()));
    }
    Ok(rows)
}

fn without_total(rows: &[LabelledCount]) -> impl Iterator<Item = &LabelledCount> {
    rows.iter().filter(|r| r.label != TOTAL_LABEL)
}

pub fn gender_distribution(cohorts: &[AgeCohort]) -> Distribution {
    let mut distribution = Distribution::new();
    distribution.add_count(Some("M"), sum_counts(cohorts.iter().map(|c| c.males)));
    distribution.add_count(Some("F"), sum_counts(cohorts.iter().map(|c| c.females)));
    distribution
}

pub fn age_distribution(cohorts: &[AgeCohort]) -> Distribution {
    let mut distribution = Distribution::new();
    for cohort in cohorts {
        let bracket = AgeBracket::of(f64::from(cohort.age)).map(|b| b.label());
        distribution.add_count(bracket, cohort.total);
    }
    distribution
}

pub fn region_distribution(rows: &[LabelledCount]) -> Distribution {
    let mut distribution = Distribution::new();
    for row in without_total(rows) {
        distribution.add_count(Some(reference_region_name(&row.label)), row.total);
    }
    distribution
}

/// Born in Italy versus any other country of birth.
pub fn birth_place_distribution(rows: &[LabelledCount]) -> Distribution {
    let mut distribution = Distribution::new();
    for row in without_total(rows) {
        let place = if row.label == ITALY { ITALY } else { FOREIGN };
        distribution.add_count(Some(place), row.total);
    }
    distribution
}

/// Education tier of a census label, on the same labels as the legislator side.
pub fn census_education_tier(label: &str) -> &'static str {
    let lowered = label.trim().to_lowercase();
    CENSUS_EDUCATION_TIERS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, tier)| *tier)
        .unwrap_or_else(|| EDUCATION.classify(Some(label)))
}

pub fn education_distribution(rows: &[LabelledCount]) -> Distribution {
    let mut distribution = Distribution::new();
    for row in without_total(rows) {
        distribution.add_count(Some(census_education_tier(&row.label)), row.total);
    }
    distribution
}

pub fn degree_field_distribution(rows: &[LabelledCount]) -> Distribution {
    let mut distribution = Distribution::new();
    for row in without_total(rows) {
        distribution.add_count(Some(DEGREE_FIELDS.classify(Some(&row.label))), row.total);
    }
    distribution
}

pub fn gender_summary(cohorts: &[AgeCohort]) -> Vec<DistributionRow> {
    let distribution = gender_distribution(cohorts);
    ["M", "F"]
        .iter()
        .map(|g| DistributionRow {
            category: g.to_string(),
            absolute_count: distribution.count(g),
            percentage: distribution.share(g) * 100.0,
        })
        .collect()
}

pub fn age_summary(cohorts: &[AgeCohort]) -> Vec<DistributionRow> {
    let total = sum_counts(cohorts.iter().map(|c| c.total));
    let under_35 = sum_counts(cohorts.iter().filter(|c| c.age < 35).map(|c| c.total));
    let over_70 = sum_counts(cohorts.iter().filter(|c| c.age > 70).map(|c| c.total));
    let pct = |n: u64| if total == 0 { 0.0 } else { n as f64 / total as f64 * 100.0 };

    vec![
        DistributionRow {
            category: "Under 35".to_string(),
            absolute_count: under_35,
            percentage: pct(under_35),
        },
        DistributionRow {
            category: "Over 70".to_string(),
            absolute_count: over_70,
            percentage: pct(over_70),
        },
    ]
}

/// Regions by population, largest first.
pub fn regions_summary(rows: &[LabelledCount]) -> Vec<DistributionRow> {
    let distribution = region_distribution(rows);
    distribution.summary(distribution.total())
}

pub fn birth_place_summary(rows: &[LabelledCount]) -> Vec<DistributionRow> {
    let distribution = birth_place_distribution(rows);
    [ITALY, FOREIGN]
        .iter()
        .map(|place| DistributionRow {
            category: place.to_string(),
            absolute_count: distribution.count(place),
            percentage: distribution.share(place) * 100.0,
        })
        .collect()
}
