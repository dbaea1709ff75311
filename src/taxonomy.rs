//! Stage 3: free-text profession / education phrases → fixed category labels.

use std::collections::HashMap;

pub const OTHER: &str = "Other";
pub const UNKNOWN: &str = "Unknown";

/// Ordered `(label, keywords)` pairs. Declaration order decides ties.
pub struct Taxonomy {
    categories: &'static [(&'static str, &'static [&'static str])],
}

pub const PROFESSIONS: Taxonomy = Taxonomy {
    categories: &[
        (
            "lawyer",
            &["avvocato", "giurista", "penalista", "civilista", "amministrativista", "diritto"],
        ),
        ("professor", &["professor", "docente", "insegnante", "ricercatore", "accadem"]),
        ("entrepreneur", &["imprendit", "industriale"]),
        ("manager", &["manager", "dirigente", "direttore", "amministratore"]),
        ("doctor", &["medico", "chirurgo", "odontoiatra", "sanitario"]),
        (
            "public_employee",
            &[
                "funzionario",
                "dipendente pubblic",
                "dipendente di azienda pubblica",
                "impiegato pubblic",
            ],
        ),
        ("private_employee", &["dipendente di azienda privata", "impiegato", "dipendente"]),
        ("consultant", &["consulente"]),
        ("journalist", &["giornalista"]),
        ("engineer", &["ingegner"]),
        ("accountant", &["commercialista", "ragioniere", "revisore", "contabil"]),
        (
            "politician",
            &["sindac", "consigliere", "parlamentare", "assessore", "politico", "amministratore locale"],
        ),
        ("banker", &["bancario", "banc"]),
        ("union_member", &["sindacalista"]),
        ("economist", &["econom"]),
        ("law_enforcement", &["polizia", "forze dell'ordine", "sicurezza"]),
        ("architect", &["architetto"]),
        ("farmer", &["agricol", "agrar"]),
        ("artist", &["artist", "musici", "attore"]),
    ],
};

pub const EDUCATION: Taxonomy = Taxonomy {
    categories: &[
        ("laurea", &["laurea", "dottore", "dottorato", "phd", "master", "specializzazione"]),
        ("diploma", &["diploma", "maturità", "liceo", "istituto", "scuola"]),
        ("certificate", &["certificato", "attestato", "qualifica"]),
        ("other", &["altro", "altra", "altri", "altre"]),
    ],
};

/// Subject of a degree, shared by MP education text and census degree-field labels.
pub const DEGREE_FIELDS: Taxonomy = Taxonomy {
    categories: &[
        ("law", &["giurisprudenza", "giuridic", "diritto", "legge"]),
        ("medicine", &["medicina", "chirurgia", "odontoiatria", "farmacia", "sanitari", "veterinaria"]),
        // No bare "politic": "Economia politica" is an economics degree.
        (
            "political_science",
            &["scienze politiche", "scienza politica", "scienze della politica", "relazioni internazionali", "sociolog"],
        ),
        ("economics", &["economi", "commercio", "statistic", "aziendal"]),
        ("engineering", &["ingegneria"]),
        ("architecture", &["architettura", "urbanistic"]),
        ("education", &["formazione", "educazione", "pedagog", "scienze motorie"]),
        (
            "humanities",
            &["lettere", "filosofia", "storia", "lingue", "letteratura", "beni culturali", "psicologia", "comunicazione"],
        ),
        (
            "sciences",
            &["scienze", "matematica", "fisica", "chimica", "biologia", "geologia", "informatica", "agraria"],
        ),
    ],
};

impl Taxonomy {
    /// Label of the first category with a keyword contained in the lower-cased text.
    ///
    /// Blank or missing text is [`UNKNOWN`]; text matching no keyword is [`OTHER`].
    pub fn classify(&self, text: Option<&str>) -> &'static str {
        let text = match text.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_lowercase(),
            _ => return UNKNOWN,
        };

        for (label, keywords) in self.categories {
            if keywords.iter().any(|k| text.contains(k)) {
                return *label;
            }
        }
        OTHER
    }
}

/// Splits a comma-separated education cell into trimmed, unquoted titles.
pub fn split_education_titles(text: &str) -> Vec<String> {
    text.trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|t| t.trim().trim_matches('\'').to_string())
        .collect()
}

/// Counts per label across phrase lists, one list per legislator.
///
/// Each phrase is classified on its own, so one legislator can feed several
/// labels. Percentages use `legislators` as denominator, on a 0-100 scale.
pub fn category_frequencies<'a, I>(
    taxonomy: &Taxonomy,
    phrase_lists: I,
    legislators: usize,
) -> Vec<(String, u64, f64)>
where
    I: IntoIterator<Item = Vec<Option<&'a str>>>,
{
    let mut counts: HashMap<&'static str, u64> = HashMap::new();
    for phrases in phrase_lists {
        for phrase in phrases {
            *counts.entry(taxonomy.classify(phrase)).or_default() += 1;
        }
    }

    let mut rows: Vec<(String, u64, f64)> = counts
        .into_iter()
        .map(|(label, count)| {
            let percentage = if legislators == 0 {
                0.0
            } else {
                count as f64 / legislators as f64 * 100.0
            };
            (label.to_string(), count, percentage)
        })
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn professore_universitario_is_a_professor() {
        assert_eq!(PROFESSIONS.classify(Some("professore universitario")), "professor");
        assert_eq!(PROFESSIONS.classify(Some("Professore Universitario")), "professor");
    }

    #[test]
    fn earlier_category_wins_on_overlap() {
        // "avvocato" (lawyer) and "docente" (professor) both match.
        assert_eq!(PROFESSIONS.classify(Some("docente e avvocato")), "lawyer");
        // "dirigente" (manager) precedes "sindac" (politician).
        assert_eq!(PROFESSIONS.classify(Some("sindaco e dirigente")), "manager");
        // "funzionario" (public) precedes the generic "impiegato" (private).
        assert_eq!(PROFESSIONS.classify(Some("impiegato funzionario")), "public_employee");
        assert_eq!(PROFESSIONS.classify(Some("impiegato")), "private_employee");
    }

    #[test]
    fn missing_and_unmatched_text_fall_back() {
        assert_eq!(PROFESSIONS.classify(None), UNKNOWN);
        assert_eq!(PROFESSIONS.classify(Some("  ")), UNKNOWN);
        assert_eq!(PROFESSIONS.classify(Some("astronauta")), OTHER);
        assert_eq!(EDUCATION.classify(Some("Licenza media")), OTHER);
    }

    #[test]
    fn education_tiers() {
        assert_eq!(EDUCATION.classify(Some("Laurea in Giurisprudenza")), "laurea");
        assert_eq!(EDUCATION.classify(Some("Diploma di maturità classica")), "diploma");
        assert_eq!(EDUCATION.classify(Some("Attestato di qualifica")), "certificate");
    }

    #[test]
    fn degree_fields() {
        assert_eq!(DEGREE_FIELDS.classify(Some("Laurea In Giurisprudenza")), "law");
        assert_eq!(DEGREE_FIELDS.classify(Some("Laurea in Scienze Politiche")), "political_science");
        assert_eq!(DEGREE_FIELDS.classify(Some("Laurea in Fisica")), "sciences");
        assert_eq!(DEGREE_FIELDS.classify(Some("Ingegneria e architettura")), "engineering");
    }

    #[test]
    fn political_economy_is_economics() {
        assert_eq!(DEGREE_FIELDS.classify(Some("Laurea in Economia Politica")), "economics");
        assert_eq!(DEGREE_FIELDS.classify(Some("Laurea in Scienze Politiche ed Economiche")), "political_science");
        assert_eq!(DEGREE_FIELDS.classify(Some("Dottorato in Scienza Politica")), "political_science");
    }

    #[test]
    fn profession_taxonomy_has_nineteen_categories() {
        assert_eq!(PROFESSIONS.categories.len(), 19);
        assert_eq!(EDUCATION.categories.len(), 4);
    }

    #[test]
    fn splits_education_cells() {
        assert_eq!(
            split_education_titles("Laurea in Lettere, Master"),
            vec!["Laurea in Lettere".to_string(), "Master".to_string()]
        );
    }

    #[test]
    fn frequencies_use_legislator_denominator() {
        let lists = vec![
            vec![Some("Avvocato"), Some("Docente")],
            vec![Some("Avvocato")],
            vec![None],
            vec![Some("Medico")],
        ];
        let rows = category_frequencies(&PROFESSIONS, lists, 4);
        assert_eq!(rows[0], ("lawyer".to_string(), 2, 50.0));
        let total: u64 = rows.iter().map(|r| r.1).sum();
        assert_eq!(total, 5);
        assert!(rows.iter().any(|r| r.0 == UNKNOWN && r.1 == 1));
    }
}
