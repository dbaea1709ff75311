//! Stage 1: turn the two chamber rosters into one normalized roster.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::{Chamber, LegislatorRecord, RosterRow};

const DEFAULT_MANDATE: &str = "elettivo";

/// Raw row of the Chamber of Deputies export.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraRow {
    pub persona: String,
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub genere: Option<String>,
    #[serde(rename = "dataNascita")]
    pub data_nascita: Option<String>,
    #[serde(rename = "luogoNascita")]
    pub luogo_nascita: Option<String>,
    pub nato: Option<String>,
    pub descrizione: Option<String>,
}

/// Raw row of the Senate export.
#[derive(Debug, Clone, Deserialize)]
pub struct SenatoRow {
    pub senatore: String,
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub genere: Option<String>,
    #[serde(rename = "dataNascita")]
    pub data_nascita: Option<String>,
    #[serde(rename = "cittaNascita")]
    pub citta_nascita: Option<String>,
    #[serde(rename = "provinciaNascita")]
    pub provincia_nascita: Option<String>,
    #[serde(rename = "Professione")]
    pub professione: Option<String>,
    #[serde(rename = "tipoMandato")]
    pub tipo_mandato: Option<String>,
}

/// Last path segment of a resource URL.
pub fn extract_id(url: &str) -> String {
    url.trim()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

pub fn clean_gender(genere: &str) -> String {
    match genere {
        "male" => "M".to_string(),
        "female" => "F".to_string(),
        other => other.to_string(),
    }
}

/// `YYYYMMDD` becomes `YYYY-MM-DD`; ISO dates and anything unrecognized pass through.
pub fn normalize_birth_date(raw: &str) -> String {
    let is_iso = raw.len() == 10
        && raw.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if is_iso {
        return raw.to_string();
    }

    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..8]);
    }

    raw.to_string()
}

/// Splits `"education; profession"` on the first semicolon.
pub fn split_education_profession(descrizione: &str) -> (String, Option<String>) {
    match descrizione.split_once(';') {
        Some((titolo, professione)) => (
            titolo.trim().to_string(),
            Some(professione.trim().to_string()),
        ),
        None => (descrizione.trim().to_string(), None),
    }
}

/// Province part of a `"City, Province"` birthplace.
pub fn province_from_birthplace(nato: &str) -> Option<String> {
    nato.split(',').nth(1).map(|p| title_case(p.trim()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        if v.trim().is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

fn title_cased(value: Option<String>) -> Option<String> {
    non_empty(value).map(|v| title_case(&v))
}

impl CameraRow {
    pub fn into_record(self) -> LegislatorRecord {
        let (titolo_studio, professione) = match non_empty(self.descrizione) {
            Some(descrizione) => {
                let (titolo, professione) = split_education_profession(&descrizione);
                (Some(titolo), professione)
            }
            None => (None, None),
        };

        LegislatorRecord {
            id: extract_id(&self.persona),
            nome: title_cased(self.nome),
            cognome: title_cased(self.cognome),
            genere: non_empty(self.genere).map(|g| clean_gender(&g)),
            data_nascita: non_empty(self.data_nascita).map(|d| normalize_birth_date(d.trim())),
            citta_nascita: title_cased(self.luogo_nascita),
            provincia_nascita: non_empty(self.nato).and_then(|n| province_from_birthplace(&n)),
            titolo_studio: titolo_studio.map(|t| title_case(&t)),
            professione: vec![professione.map(|p| title_case(&p))],
            tipo_mandato: DEFAULT_MANDATE.to_string(),
            ramo: Chamber::Camera,
            regione_nascita: None,
        }
    }
}

impl SenatoRow {
    pub fn into_record(self) -> LegislatorRecord {
        LegislatorRecord {
            id: extract_id(&self.senatore),
            nome: non_empty(self.nome),
            cognome: non_empty(self.cognome),
            genere: non_empty(self.genere).map(|g| clean_gender(&g)),
            data_nascita: non_empty(self.data_nascita).map(|d| normalize_birth_date(d.trim())),
            citta_nascita: non_empty(self.citta_nascita),
            provincia_nascita: non_empty(self.provincia_nascita),
            titolo_studio: None,
            professione: vec![non_empty(self.professione)],
            tipo_mandato: non_empty(self.tipo_mandato)
                .unwrap_or_else(|| DEFAULT_MANDATE.to_string()),
            ramo: Chamber::Senato,
            regione_nascita: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    id: String,
    nome: Option<String>,
    cognome: Option<String>,
    genere: Option<String>,
    data_nascita: Option<String>,
    citta_nascita: Option<String>,
    provincia_nascita: Option<String>,
    titolo_studio: Option<String>,
    tipo_mandato: String,
    ramo: Chamber,
    regione_nascita: Option<String>,
}

impl GroupKey {
    fn of(record: &LegislatorRecord) -> Self {
        Self {
            id: record.id.clone(),
            nome: record.nome.clone(),
            cognome: record.cognome.clone(),
            genere: record.genere.clone(),
            data_nascita: record.data_nascita.clone(),
            citta_nascita: record.citta_nascita.clone(),
            provincia_nascita: record.provincia_nascita.clone(),
            titolo_studio: record.titolo_studio.clone(),
            tipo_mandato: record.tipo_mandato.clone(),
            ramo: record.ramo,
            regione_nascita: record.regione_nascita.clone(),
        }
    }

    fn into_record(self, professione: Vec<Option<String>>) -> LegislatorRecord {
        LegislatorRecord {
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
        }
    }
}

/// Drops exact duplicate rows, then collapses rows that differ only by profession.
///
/// The collapsed profession list keeps repeats and nulls in input order. Output is
/// ordered by the grouping key, id first.
pub fn merge_rosters(
    camera: Vec<LegislatorRecord>,
    senato: Vec<LegislatorRecord>,
) -> Vec<LegislatorRecord> {
    let total_rows = camera.len() + senato.len();
    let mut seen: HashSet<LegislatorRecord> = HashSet::new();
    let mut groups: BTreeMap<GroupKey, Vec<Option<String>>> = BTreeMap::new();

    for record in camera.into_iter().chain(senato) {
        if !seen.insert(record.clone()) {
            continue;
        }
        groups
            .entry(GroupKey::of(&record))
            .or_default()
            .extend(record.professione);
    }

    debug!(
        "Merged {} raw rows ({} distinct) into {} legislators",
        total_rows,
        seen.len(),
        groups.len()
    );

    groups
        .into_iter()
        .map(|(key, professione)| key.into_record(professione))
        .collect()
}

pub fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> AnalysisResult<Vec<T>> {
    let read_error = |source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(read_error)?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result.map_err(read_error)?);
    }
    Ok(rows)
}

pub fn load_camera(path: &Path) -> AnalysisResult<Vec<LegislatorRecord>> {
    let rows: Vec<CameraRow> = read_rows(path)?;
    info!("Loaded {} Camera rows from {}", rows.len(), path.display());
    Ok(rows.into_iter().map(CameraRow::into_record).collect())
}

pub fn load_senato(path: &Path) -> AnalysisResult<Vec<LegislatorRecord>> {
    let rows: Vec<SenatoRow> = read_rows(path)?;
    info!("Loaded {} Senato rows from {}", rows.len(), path.display());
    Ok(rows.into_iter().map(SenatoRow::into_record).collect())
}

pub fn read_roster(path: &Path) -> AnalysisResult<Vec<LegislatorRecord>> {
    let rows: Vec<RosterRow> = read_rows(path)?;
    rows.into_iter().map(RosterRow::into_record).collect()
}

pub fn write_roster(path: &Path, records: &[LegislatorRecord]) -> AnalysisResult<()> {
    let rows = records
        .iter()
        .map(RosterRow::from_record)
        .collect::<AnalysisResult<Vec<_>>>()?;
    write_rows(path, &rows)
}

/// Serializes `rows` with a header line, creating the parent directory.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> AnalysisResult<()> {
    let write_error = |source| AnalysisError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(write_error)?;
    for row in rows {
        writer.serialize(row).map_err(write_error)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_row(id: &str, descrizione: Option<&str>) -> CameraRow {
        CameraRow {
            persona: format!("http://dati.camera.it/ocd/persona.rdf/{}", id),
            nome: Some("MARIO".to_string()),
            cognome: Some("ROSSI".to_string()),
            genere: Some("male".to_string()),
            data_nascita: Some("19800520".to_string()),
            luogo_nascita: Some("CESENA".to_string()),
            nato: Some("CESENA, FORLI'-CESENA".to_string()),
            descrizione: descrizione.map(str::to_string),
        }
    }

    #[test]
    fn extracts_last_url_segment() {
        assert_eq!(extract_id("http://dati.camera.it/ocd/persona.rdf/p301234"), "p301234");
        assert_eq!(extract_id("plain"), "plain");
    }

    #[test]
    fn title_case_handles_apostrophes_and_hyphens() {
        assert_eq!(title_case("FORLI'-CESENA"), "Forli'-Cesena");
        assert_eq!(title_case("forlì-cesena"), "Forlì-Cesena");
        assert_eq!(title_case("l'aquila"), "L'Aquila");
        assert_eq!(title_case("reggio nell'emilia"), "Reggio Nell'Emilia");
    }

    #[test]
    fn normalizes_birth_dates() {
        assert_eq!(normalize_birth_date("19800520"), "1980-05-20");
        assert_eq!(normalize_birth_date("1980-05-20"), "1980-05-20");
        assert_eq!(normalize_birth_date("20 maggio 1980"), "20 maggio 1980");
        assert_eq!(normalize_birth_date("01/02/80"), "01/02/80");
    }

    #[test]
    fn splits_on_first_semicolon_only() {
        assert_eq!(
            split_education_profession("Laurea in Giurisprudenza; Avvocato; Docente"),
            (
                "Laurea in Giurisprudenza".to_string(),
                Some("Avvocato; Docente".to_string())
            )
        );
        assert_eq!(
            split_education_profession("Diploma di liceo"),
            ("Diploma di liceo".to_string(), None)
        );
    }

    #[test]
    fn province_needs_a_comma() {
        assert_eq!(
            province_from_birthplace("CESENA, FORLI'-CESENA"),
            Some("Forli'-Cesena".to_string())
        );
        assert_eq!(province_from_birthplace("ZURIGO"), None);
    }

    #[test]
    fn camera_row_is_normalized() {
        let record = camera_row("p1", Some("LAUREA IN ECONOMIA; IMPRENDITORE")).into_record();
        assert_eq!(record.id, "p1");
        assert_eq!(record.nome.as_deref(), Some("Mario"));
        assert_eq!(record.genere.as_deref(), Some("M"));
        assert_eq!(record.data_nascita.as_deref(), Some("1980-05-20"));
        assert_eq!(record.provincia_nascita.as_deref(), Some("Forli'-Cesena"));
        assert_eq!(record.titolo_studio.as_deref(), Some("Laurea In Economia"));
        assert_eq!(record.professione, vec![Some("Imprenditore".to_string())]);
        assert_eq!(record.tipo_mandato, "elettivo");
        assert_eq!(record.ramo, Chamber::Camera);
    }

    #[test]
    fn senato_mandate_defaults_to_elective() {
        let row = SenatoRow {
            senatore: "http://dati.senato.it/senatore/36".to_string(),
            nome: Some("Liliana".to_string()),
            cognome: Some("Segre".to_string()),
            genere: Some("female".to_string()),
            data_nascita: Some("1930-09-10".to_string()),
            citta_nascita: Some("Milano".to_string()),
            provincia_nascita: Some("Milano".to_string()),
            professione: None,
            tipo_mandato: Some("a vita, di nomina presidenziale".to_string()),
        };
        let life = row.clone().into_record();
        assert_eq!(life.tipo_mandato, "a vita, di nomina presidenziale");
        assert_eq!(life.genere.as_deref(), Some("F"));
        assert_eq!(life.professione, vec![None]);

        let elected = SenatoRow {
            tipo_mandato: None,
            ..row
        }
        .into_record();
        assert_eq!(elected.tipo_mandato, "elettivo");
    }

    #[test]
    fn merge_collapses_professions_and_keeps_nulls() {
        let camera = vec![
            camera_row("p1", Some("Laurea; Avvocato")).into_record(),
            camera_row("p1", Some("Laurea; Avvocato")).into_record(),
            camera_row("p1", Some("Laurea; Docente")).into_record(),
            camera_row("p1", Some("Laurea")).into_record(),
            camera_row("p2", None).into_record(),
        ];
        let merged = merge_rosters(camera, Vec::new());
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged[0].professione,
            vec![
                Some("Avvocato".to_string()),
                Some("Docente".to_string()),
                None
            ]
        );
        assert_eq!(merged[1].professione, vec![None]);
    }

    #[test]
    fn unique_ids_yield_one_row_each() {
        let camera: Vec<_> = (0..25)
            .map(|i| camera_row(&format!("p{}", i), Some("Laurea; Avvocato")).into_record())
            .collect();
        assert_eq!(merge_rosters(camera, Vec::new()).len(), 25);
    }

    #[test]
    fn roster_survives_a_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        let merged = merge_rosters(
            vec![
                camera_row("p1", Some("Laurea; Avvocato")).into_record(),
                camera_row("p1", Some("Laurea")).into_record(),
            ],
            Vec::new(),
        );
        write_roster(&path, &merged).unwrap();
        assert_eq!(read_roster(&path).unwrap(), merged);
    }

    #[test]
    fn loads_raw_chamber_exports() {
        let dir = tempfile::tempdir().unwrap();
        let camera_path = dir.path().join("camera.csv");
        std::fs::write(
            &camera_path,
            "persona,nome,cognome,genere,dataNascita,luogoNascita,nato,descrizione,extra\n\
             http://x/p1,ANNA,BIANCHI,female,19900101,ROMA,\"ROMA, ROMA\",Laurea in Lettere; Insegnante,z\n",
        )
        .unwrap();
        let records = load_camera(&camera_path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].provincia_nascita.as_deref(), Some("Roma"));
        assert_eq!(records[0].genere.as_deref(), Some("F"));

        let senato_path = dir.path().join("senato.csv");
        std::fs::write(
            &senato_path,
            "senatore,nome,cognome,genere,dataNascita,cittaNascita,provinciaNascita,Professione,tipoMandato\n\
             http://x/s9,Carlo,Verdi,male,1960-02-03,Bari,Bari,Medico,\n",
        )
        .unwrap();
        let records = load_senato(&senato_path).unwrap();
        assert_eq!(records[0].id, "s9");
        assert_eq!(records[0].tipo_mandato, "elettivo");
    }
}
