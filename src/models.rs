use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{AnalysisError, AnalysisResult};

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_directory: String,
    pub output_directory: String,
    /// Date ages are computed against (YYYY-MM-DD). Today when unset.
    pub reference_date: Option<String>,
    pub write_charts: bool,
    pub inputs: InputFiles,
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    pub camera_roster: String,
    pub senato_roster: String,
    pub clean_roster: String,
    pub updated_roster: String,
    pub regions_roster: String,
    pub population_age_sex: String,
    pub population_regions: String,
    pub population_foreign_birth: String,
    pub population_education: String,
    pub population_degree_fields: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Wikipedia language editions, queried in order.
    pub languages: Vec<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_directory: "data".to_string(),
            output_directory: "results".to_string(),
            reference_date: None,
            write_charts: true,
            inputs: InputFiles::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            camera_roster: "Camera_Leg19.csv".to_string(),
            senato_roster: "Senato_Leg19.csv".to_string(),
            clean_roster: "leg19_clean.csv".to_string(),
            updated_roster: "leg19_clean_updated.csv".to_string(),
            regions_roster: "leg19_clean_with_regions.csv".to_string(),
            population_age_sex: "pop_residente_1gen2025.csv".to_string(),
            population_regions: "pop_residente_1gen2025_regioni.csv".to_string(),
            population_foreign_birth: "pop_birth_foreign_countries_1gen2024.csv".to_string(),
            population_education: "pop_titolo_studio.csv".to_string(),
            population_degree_fields: "pop_laureati_campo_studio.csv".to_string(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            languages: vec!["it".to_string(), "en".to_string()],
            user_agent: "ItalianParliamentResearch/1.0".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    pub fn data_path(&self, file_name: &str) -> PathBuf {
        PathBuf::from(&self.data_directory).join(file_name)
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        PathBuf::from(&self.output_directory).join(file_name)
    }

    pub fn reference_date(&self) -> AnalysisResult<NaiveDate> {
        match self.reference_date.as_deref() {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| AnalysisError::ReferenceDate(raw.to_string())),
            None => Ok(chrono::Local::now().date_naive()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Chamber {
    Camera,
    Senato,
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chamber::Camera => write!(f, "Camera"),
            Chamber::Senato => write!(f, "Senato"),
        }
    }
}

/// One member of parliament in the unified roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegislatorRecord {
    pub id: String,
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub genere: Option<String>,
    pub data_nascita: Option<String>,
    pub citta_nascita: Option<String>,
    pub provincia_nascita: Option<String>,
    pub titolo_studio: Option<String>,
    /// Every profession mention, nulls and repeats included.
    pub professione: Vec<Option<String>>,
    pub tipo_mandato: String,
    pub ramo: Chamber,
    pub regione_nascita: Option<String>,
}

impl LegislatorRecord {
    /// Parses the birth date, accepting both ISO and compact `YYYYMMDD` forms.
    pub fn birth_date(&self) -> Option<NaiveDate> {
        let raw = self.data_nascita.as_deref()?.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
            .ok()
    }

    /// Fractional age in years at `on`.
    pub fn age_at(&self, on: NaiveDate) -> Option<f64> {
        let born = self.birth_date()?;
        Some((on - born).num_days() as f64 / DAYS_PER_YEAR)
    }

    /// Completed years at `on`, birthday-aware.
    pub fn whole_age_at(&self, on: NaiveDate) -> Option<i32> {
        use chrono::Datelike;

        let born = self.birth_date()?;
        let before_birthday = (on.month(), on.day()) < (born.month(), born.day());
        Some(on.year() - born.year() - i32::from(before_birthday))
    }

    pub fn has_missing_profession(&self) -> bool {
        self.professione.iter().all(|p| match p.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => text == "Professione Non Rilevata",
        })
    }

    pub fn has_education(&self) -> bool {
        self.titolo_studio
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }

    /// Lower-cased, whitespace-collapsed `(nome, cognome)` used to match external results.
    pub fn name_key(&self) -> (String, String) {
        name_key(
            self.nome.as_deref().unwrap_or(""),
            self.cognome.as_deref().unwrap_or(""),
        )
    }
}

pub fn name_key(nome: &str, cognome: &str) -> (String, String) {
    (clean_name(nome), clean_name(cognome))
}

fn clean_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flat CSV shape of a [`LegislatorRecord`]; the profession list is a JSON array cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterRow {
    pub id: String,
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub genere: Option<String>,
    pub data_nascita: Option<String>,
    pub citta_nascita: Option<String>,
    pub provincia_nascita: Option<String>,
    pub titolo_studio: Option<String>,
    pub professione: String,
    pub tipo_mandato: String,
    pub ramo: Chamber,
    #[serde(default)]
    pub regione_nascita: Option<String>,
}

impl RosterRow {
    pub fn from_record(record: &LegislatorRecord) -> AnalysisResult<Self> {
        let professione = serde_json::to_string(&record.professione).map_err(|source| {
            AnalysisError::ProfessionList {
                id: record.id.clone(),
                source,
            }
        })?;

        Ok(Self {
            id: record.id.clone(),
            nome: record.nome.clone(),
            cognome: record.cognome.clone(),
            genere: record.genere.clone(),
            data_nascita: record.data_nascita.clone(),
            citta_nascita: record.citta_nascita.clone(),
            provincia_nascita: record.provincia_nascita.clone(),
            titolo_studio: record.titolo_studio.clone(),
            professione,
            tipo_mandato: record.tipo_mandato.clone(),
            ramo: record.ramo,
            regione_nascita: record.regione_nascita.clone(),
        })
    }

    pub fn into_record(self) -> AnalysisResult<LegislatorRecord> {
        let professione = if self.professione.trim().is_empty() {
            vec![None]
        } else {
            serde_json::from_str(&self.professione).map_err(|source| {
                AnalysisError::ProfessionList {
                    id: self.id.clone(),
                    source,
                }
            })?
        };

        Ok(LegislatorRecord {
            id: self.id,
            nome: self.nome,
            cognome: self.cognome,
            genere: self.genere,
            data_nascita: self.data_nascita,
            citta_nascita: self.citta_nascita,
            provincia_nascita: self.provincia_nascita,
            titolo_studio: self.titolo_studio,
            professione,
            tipo_mandato: self.tipo_mandato,
            ramo: self.ramo,
            regione_nascita: self.regione_nascita,
        })
    }
}

/// MP share over population share. `Undefined` when the population share is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepresentationIndex {
    Ratio(f64),
    Undefined,
}

impl RepresentationIndex {
    pub fn from_shares(subject_share: f64, reference_share: f64) -> Self {
        if reference_share > 0.0 {
            RepresentationIndex::Ratio(subject_share / reference_share)
        } else {
            RepresentationIndex::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            RepresentationIndex::Ratio(v) => Some(*v),
            RepresentationIndex::Undefined => None,
        }
    }
}

impl fmt::Display for RepresentationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepresentationIndex::Ratio(v) => write!(f, "{}", v),
            RepresentationIndex::Undefined => write!(f, "undefined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub category: String,
    pub mp_count: u64,
    pub mp_percentage: f64,
    pub pop_count: u64,
    pub pop_percentage: f64,
    pub representation_index: RepresentationIndex,
}

/// Descriptive summary line; `percentage` is on a 0-100 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionRow {
    pub category: String,
    pub absolute_count: u64,
    pub percentage: f64,
}
