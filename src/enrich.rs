//! Backfilling missing education and profession data from external lookups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{name_key, LegislatorRecord};
use crate::scraper::EncyclopediaClient;

const PROFESSION_EDUCATION: &[(&str, &str)] = &[
    ("Avvocato", "Laurea in Giurisprudenza"),
    ("Medico", "Laurea in Medicina"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRow {
    pub nome: Option<String>,
    pub cognome: Option<String>,
}

/// One `wikipedia_education.csv` row; `titolo_studio` joins phrases with `"; "`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationLookup {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub cognome: String,
    pub titolo_studio: Option<String>,
}

/// One `wikipedia_professions.csv` row; phrases are a JSON array, empty when nothing was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionLookup {
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub wikipedia_profession: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillCounts {
    pub missing_before: usize,
    pub from_profession: usize,
    pub from_encyclopedia: usize,
    pub missing_after: usize,
}

impl BackfillCounts {
    pub fn log(&self, total: usize) {
        info!("Updated {} records based on profession", self.from_profession);
        info!("Updated {} records with Wikipedia education data", self.from_encyclopedia);
        info!("Total records in dataset: {}", total);
        info!("Records with missing titolo_studio before any update: {}", self.missing_before);
        info!("Records with missing titolo_studio after all updates: {}", self.missing_after);
    }
}

/// Names of MPs without a usable profession, by surname then name.
pub fn missing_profession(records: &[LegislatorRecord]) -> Vec<NameRow> {
    let mut names: Vec<NameRow> = records
        .iter()
        .filter(|r| r.has_missing_profession())
        .map(|r| NameRow {
            nome: r.nome.clone(),
            cognome: r.cognome.clone(),
        })
        .collect();
    names.sort_by(|a, b| a.cognome.cmp(&b.cognome).then_with(|| a.nome.cmp(&b.nome)));
    names
}

fn education_for_professions(professione: &[Option<String>]) -> Option<&'static str> {
    professione.iter().flatten().find_map(|p| {
        PROFESSION_EDUCATION
            .iter()
            .find(|(profession, _)| profession == p)
            .map(|(_, education)| *education)
    })
}

/// Fills empty `titolo_studio` from the profession map, then from encyclopedia results.
///
/// Encyclopedia rows are matched on the normalized name key; the first row per key wins.
pub fn backfill_education(records: &mut [LegislatorRecord], lookups: &[EducationLookup]) -> BackfillCounts {
    let mut counts = BackfillCounts {
        missing_before: records.iter().filter(|r| !r.has_education()).count(),
        ..BackfillCounts::default()
    };

    for record in records.iter_mut().filter(|r| !r.has_education()) {
        if let Some(education) = education_for_professions(&record.professione) {
            record.titolo_studio = Some(education.to_string());
            counts.from_profession += 1;
        }
    }

    let mut by_name: HashMap<(String, String), &str> = HashMap::new();
    for lookup in lookups {
        if let Some(titolo) = lookup.titolo_studio.as_deref().filter(|t| !t.trim().is_empty()) {
            by_name
                .entry(name_key(&lookup.nome, &lookup.cognome))
                .or_insert(titolo);
        }
    }
    for record in records.iter_mut().filter(|r| !r.has_education()) {
        if let Some(titolo) = by_name.get(&record.name_key()) {
            record.titolo_studio = Some(titolo.to_string());
            counts.from_encyclopedia += 1;
        }
    }

    counts.missing_after = records.iter().filter(|r| !r.has_education()).count();
    counts
}

/// Replaces missing profession lists with encyclopedia job phrases. Returns the number updated.
pub fn backfill_professions(records: &mut [LegislatorRecord], lookups: &[ProfessionLookup]) -> usize {
    let mut by_name: HashMap<(String, String), Vec<String>> = HashMap::new();
    for lookup in lookups {
        let Some(raw) = lookup.wikipedia_profession.as_deref().filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        let key = name_key(
            lookup.nome.as_deref().unwrap_or(""),
            lookup.cognome.as_deref().unwrap_or(""),
        );
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(jobs) if !jobs.is_empty() => {
                by_name.entry(key).or_insert(jobs);
            }
            Ok(_) => {}
            Err(e) => warn!("Ignoring malformed profession list for {:?}: {}", key, e),
        }
    }

    let mut updated = 0;
    for record in records.iter_mut().filter(|r| r.has_missing_profession()) {
        if let Some(jobs) = by_name.get(&record.name_key()) {
            record.professione = jobs.iter().cloned().map(Some).collect();
            updated += 1;
        }
    }
    updated
}

/// Looks up every MP with no education listed. MPs with no findings are left out.
pub async fn collect_education(client: &EncyclopediaClient, records: &[LegislatorRecord]) -> Vec<EducationLookup> {
    let pending: Vec<&LegislatorRecord> = records.iter().filter(|r| !r.has_education()).collect();
    info!("Found {} MPs with missing educational qualifications", pending.len());

    let mut results = Vec::new();
    for record in pending {
        let nome = record.nome.clone().unwrap_or_default();
        let cognome = record.cognome.clone().unwrap_or_default();
        let education = client.search_education(&nome, &cognome).await;
        if education.is_empty() {
            continue;
        }
        let titolo = education.into_iter().collect::<Vec<_>>().join("; ");
        results.push(EducationLookup {
            nome,
            cognome,
            titolo_studio: Some(titolo),
        });
    }
    results
}

/// Looks up job phrases for each listed MP; every name gets a row.
pub async fn collect_professions(client: &EncyclopediaClient, names: &[NameRow]) -> Vec<ProfessionLookup> {
    let mut results = Vec::with_capacity(names.len());
    for name in names {
        let jobs = client
            .search_professions(
                name.nome.as_deref().unwrap_or(""),
                name.cognome.as_deref().unwrap_or(""),
            )
            .await;
        let wikipedia_profession = if jobs.is_empty() {
            None
        } else {
            match serde_json::to_string(&jobs) {
                Ok(json) => Some(json),
                Err(e) => {
                    warn!("Could not encode jobs for {:?} {:?}: {}", name.nome, name.cognome, e);
                    None
                }
            }
        };
        results.push(ProfessionLookup {
            nome: name.nome.clone(),
            cognome: name.cognome.clone(),
            wikipedia_profession,
        });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chamber;

    fn mp(nome: &str, cognome: &str, titolo: Option<&str>, professione: Vec<Option<&str>>) -> LegislatorRecord {
        LegislatorRecord {
            id: format!("{}{}", nome, cognome),
            nome: Some(nome.to_string()),
            cognome: Some(cognome.to_string()),
            genere: Some("F".to_string()),
            data_nascita: None,
            citta_nascita: None,
            provincia_nascita: None,
            titolo_studio: titolo.map(str::to_string),
            professione: professione.into_iter().map(|p| p.map(str::to_string)).collect(),
            tipo_mandato: "elettivo".to_string(),
            ramo: Chamber::Camera,
            regione_nascita: None,
        }
    }

    #[test]
    fn missing_profession_is_sorted_by_surname() {
        let records = vec![
            mp("Luca", "Verdi", None, vec![None]),
            mp("Anna", "Bianchi", None, vec![Some("Professione Non Rilevata")]),
            mp("Marco", "Bianchi", None, vec![Some("")]),
            mp("Sara", "Neri", None, vec![Some("Avvocato")]),
        ];
        let names: Vec<_> = missing_profession(&records)
            .into_iter()
            .map(|n| n.nome.unwrap())
            .collect();
        assert_eq!(names, vec!["Anna", "Marco", "Luca"]);
    }

    #[test]
    fn education_comes_from_profession_first() {
        let mut records = vec![
            mp("Sara", "Neri", None, vec![Some("Docente"), Some("Avvocato")]),
            mp("Paolo", "Rossi", None, vec![Some("Medico")]),
            mp("Ugo", "Gialli", Some("Diploma"), vec![Some("Avvocato")]),
        ];
        let lookups = vec![EducationLookup {
            nome: "Sara".to_string(),
            cognome: "Neri".to_string(),
            titolo_studio: Some("lettere".to_string()),
        }];
        let counts = backfill_education(&mut records, &lookups);

        assert_eq!(records[0].titolo_studio.as_deref(), Some("Laurea in Giurisprudenza"));
        assert_eq!(records[1].titolo_studio.as_deref(), Some("Laurea in Medicina"));
        assert_eq!(records[2].titolo_studio.as_deref(), Some("Diploma"));
        assert_eq!(counts.from_profession, 2);
        assert_eq!(counts.from_encyclopedia, 0);
        assert_eq!(counts.missing_after, 0);
    }

    #[test]
    fn encyclopedia_matches_normalized_names_first_row_wins() {
        let mut records = vec![mp("Maria  Grazia", "De Luca", None, vec![None])];
        let lookups = vec![
            EducationLookup {
                nome: "maria grazia".to_string(),
                cognome: "DE LUCA".to_string(),
                titolo_studio: Some("economia; giurisprudenza".to_string()),
            },
            EducationLookup {
                nome: "Maria Grazia".to_string(),
                cognome: "De Luca".to_string(),
                titolo_studio: Some("medicina".to_string()),
            },
        ];
        let counts = backfill_education(&mut records, &lookups);
        assert_eq!(records[0].titolo_studio.as_deref(), Some("economia; giurisprudenza"));
        assert_eq!(counts.missing_before, 1);
        assert_eq!(counts.from_encyclopedia, 1);
    }

    #[test]
    fn professions_are_backfilled_from_json_lists() {
        let mut records = vec![
            mp("Luca", "Verdi", None, vec![None]),
            mp("Sara", "Neri", None, vec![Some("Avvocato")]),
        ];
        let lookups = vec![
            ProfessionLookup {
                nome: Some("Luca".to_string()),
                cognome: Some("Verdi".to_string()),
                wikipedia_profession: Some(r#"["commercialista","consulente"]"#.to_string()),
            },
            ProfessionLookup {
                nome: Some("Sara".to_string()),
                cognome: Some("Neri".to_string()),
                wikipedia_profession: Some(r#"["giornalista"]"#.to_string()),
            },
        ];
        assert_eq!(backfill_professions(&mut records, &lookups), 1);
        assert_eq!(
            records[0].professione,
            vec![Some("commercialista".to_string()), Some("consulente".to_string())]
        );
        assert_eq!(records[1].professione, vec![Some("Avvocato".to_string())]);
    }

    #[test]
    fn lookup_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wikipedia_education.csv");
        let rows = vec![EducationLookup {
            nome: "Anna".to_string(),
            cognome: "Bianchi".to_string(),
            titolo_studio: Some("lettere; storia".to_string()),
        }];
        crate::roster::write_rows(&path, &rows).unwrap();
        let back: Vec<EducationLookup> = crate::roster::read_rows(&path).unwrap();
        assert_eq!(back, rows);
    }
}
