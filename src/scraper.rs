use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::AnalysisResult;
use crate::models::EnrichmentConfig;

const ITALIAN_JOB_PATTERNS: &[&str] = &[
    r"(?:è stato|è stata|è|era)(?:\s+un[ao]?)?\s+([^,.]+(?:ore|ista|ante|iere|ico|ogo|ere)[^,.]*)",
    r"ha (?:lavorato|operato) (?:come|presso|nel|alla|per)\s+([^,.]+(?:(?:dal|fino al|nel) \d{4})?)",
    r"(?:direttore|presidente|amministratore|consigliere|segretario|docente|professore|dirigente)\s+(?:di|del|della|presso|all[ao])\s+([^,.]+(?:(?:dal|fino al|nel) \d{4})?)",
    r"(?:laureato|laureata) in\s+([^,.]+(?:presso [^,.]+)?)",
    r"(?:docente|professore) (?:di|in)\s+([^,.]+(?:presso [^,.]+)?)",
    r"(?:impiegato|impiegata|dipendente) (?:presso|di|del|della)\s+([^,.]+)",
];

const ENGLISH_JOB_PATTERNS: &[&str] = &[
    r"(?:was|is|has been)(?: an?)?\s+([^,.]+(?:er|ist|ant|or|ian)[^,.]*(?:(?:from|until|in) \d{4})?)",
    r"worked (?:as|at|for|in)\s+([^,.]+(?:(?:from|until|in) \d{4})?)",
    r"(?:director|president|administrator|counselor|secretary|teacher|professor|manager) (?:of|at|in)\s+([^,.]+(?:(?:from|until|in) \d{4})?)",
    r"graduated (?:in|with)\s+([^,.]+(?:from [^,.]+)?)",
    r"(?:teaches|taught)\s+([^,.]+(?:at [^,.]+)?)",
    r"employed (?:at|by)\s+([^,.]+)",
];

const ITALIAN_STOP_WORDS: &[&str] = &[
    "politico", "politica", "italiano", "italiana", "deputato", "deputata", "parlamentare", "membro",
    "eletto", "eletta", "nominato", "nominata", "consiglio", "movimento", "partito", "camera", "senato",
];

const ENGLISH_STOP_WORDS: &[&str] = &[
    "politician", "italian", "member", "deputy", "parliamentary", "elected", "appointed", "council",
    "movement", "party", "chamber", "senate", "born", "welcomed",
];

/// Bare articles; a job phrase containing one of these as a word is discarded.
const ARTICLES: &[&str] = &["un", "una", "il", "la", "the", "a", "an"];

const EDUCATION_PATTERNS: &[&str] = &[
    r"(?:si è laureato|si è laureata|graduated|has graduated)\s+(?:in|as|with)\s+([a-zA-ZÀ-ù\s]+?)(?:\s+(?:presso|at|from)\s+[a-zA-ZÀ-ù\s]+)?\b",
    r"(?:laureato|laureata|graduated)\s+(?:in|as|with)\s+([a-zA-ZÀ-ù\s]+?)(?:\s+(?:presso|at|from)\s+[a-zA-ZÀ-ù\s]+)?\b",
    r"(?:dottorato|dottorata|doctorate)\s+(?:in|as|with)\s+([a-zA-ZÀ-ù\s]+?)(?:\s+(?:presso|at|from)\s+[a-zA-ZÀ-ù\s]+)?\b",
    r"(?:dottorato|dottorata|doctorate)\s+di\s+ricerca\s+(?:in|as|with)\s+([a-zA-ZÀ-ù\s]+?)(?:\s+(?:presso|at|from)\s+[a-zA-ZÀ-ù\s]+)?\b",
    r"(?:diploma|diplomato|diplomata)\s+(?:in|as|with)\s+([a-zA-ZÀ-ù\s]+?)(?:\s+(?:presso|at|from)\s+[a-zA-ZÀ-ù\s]+)?\b",
    r"(?:maturità|high school)\s+(?:in|as|with)\s+([a-zA-ZÀ-ù\s]+?)(?:\s+(?:presso|at|from)\s+[a-zA-ZÀ-ù\s]+)?\b",
    r"(?:presso|at|from)\s+([a-zA-ZÀ-ù\s]+?(?:university|università|college|istituto|institute))\s+(?:in|as|with)\s+([a-zA-ZÀ-ù\s]+?)\b",
    r"(?:in|di|of)\s+([a-zA-ZÀ-ù\s]+?(?:studies|scienze|lettere|economia|giurisprudenza|medicina|ingegneria))\b",
];

const NON_EDUCATION_PREFIXES: &[&str] = &["il ", "la ", "lo ", "the ", "a ", "an ", "di ", "del ", "della "];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Skipping invalid pattern {}: {}", p, e);
                None
            }
        })
        .collect()
}

fn job_patterns(lang: &str) -> &'static [Regex] {
    static ITALIAN: OnceLock<Vec<Regex>> = OnceLock::new();
    static ENGLISH: OnceLock<Vec<Regex>> = OnceLock::new();
    match lang {
        "it" => ITALIAN.get_or_init(|| compile(ITALIAN_JOB_PATTERNS)),
        "en" => ENGLISH.get_or_init(|| compile(ENGLISH_JOB_PATTERNS)),
        _ => &[],
    }
}

fn education_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(EDUCATION_PATTERNS))
}

/// Candidate job phrases in an encyclopedia text.
///
/// Unsupported languages yield nothing.
pub fn extract_jobs_from_text(text: &str, lang: &str) -> BTreeSet<String> {
    let stop_words = match lang {
        "it" => ITALIAN_STOP_WORDS,
        "en" => ENGLISH_STOP_WORDS,
        _ => return BTreeSet::new(),
    };
    let text = text.to_lowercase();

    let mut jobs = BTreeSet::new();
    for pattern in job_patterns(lang) {
        for caps in pattern.captures_iter(&text) {
            let Some(job) = caps.get(1).map(|m| m.as_str().trim()) else {
                continue;
            };
            let keep = job.chars().count() > 3
                && job.chars().any(char::is_alphabetic)
                && !stop_words.iter().any(|w| job.contains(w))
                && !job.split_whitespace().any(|w| ARTICLES.contains(&w));
            if keep {
                jobs.insert(job.to_string());
            }
        }
    }
    jobs
}

/// Candidate education phrases in an encyclopedia text, any supported language.
pub fn extract_education_from_text(text: &str) -> BTreeSet<String> {
    let text = text.to_lowercase();

    let mut education = BTreeSet::new();
    for pattern in education_patterns() {
        for caps in pattern.captures_iter(&text) {
            let phrase = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if phrase.chars().count() < 4 || phrase.chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            if NON_EDUCATION_PREFIXES.iter().any(|p| phrase.starts_with(p)) {
                continue;
            }
            education.insert(phrase);
        }
    }
    education
}

/// Visible paragraph text of an HTML extract.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let selector = match Selector::parse("p, li") {
        Ok(selector) => selector,
        Err(_) => return String::new(),
    };
    let paragraphs: Vec<String> = fragment
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if paragraphs.is_empty() {
        fragment.root_element().text().collect::<String>()
    } else {
        paragraphs.join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    title: Option<String>,
    extract: Option<String>,
    missing: Option<serde_json::Value>,
}

/// Read-only client for the Wikipedia extracts API.
pub struct EncyclopediaClient {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl EncyclopediaClient {
    pub fn new(config: &EnrichmentConfig) -> AnalysisResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            languages: config.languages.clone(),
        })
    }

    async fn fetch_extract(&self, lang: &str, title: &str) -> AnalysisResult<Option<String>> {
        let url = format!("https://{}.wikipedia.org/w/api.php", lang);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "extracts"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .send()
            .await?
            .error_for_status()?;
        let payload: ExtractResponse = response.json().await?;

        let page = payload
            .query
            .and_then(|q| q.pages.into_values().next())
            .filter(|page| page.missing.is_none());
        Ok(page.and_then(|page| {
            debug!("Found page {:?} on {}.wikipedia.org", page.title, lang);
            page.extract.map(|html| html_to_text(&html))
        }))
    }

    /// Plain text of `title`, or `None` when the page is missing or the request fails.
    pub async fn page_text(&self, lang: &str, title: &str) -> Option<String> {
        match self.fetch_extract(lang, title).await {
            Ok(Some(text)) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                debug!("No {} page for {}", lang, title);
                None
            }
            Err(e) => {
                warn!("Lookup of {} on {} failed: {}", title, lang, e);
                None
            }
        }
    }

    /// Education phrases from every configured language, merged.
    pub async fn search_education(&self, nome: &str, cognome: &str) -> BTreeSet<String> {
        let title = format!("{} {}", nome, cognome);
        let mut education = BTreeSet::new();
        for lang in &self.languages {
            if let Some(text) = self.page_text(lang, &title).await {
                let found = extract_education_from_text(&text);
                info!("{}: {} education phrase(s) on {}", title, found.len(), lang);
                education.extend(found);
            }
        }
        education
    }

    /// Job phrases from every configured language, trying both title spellings.
    pub async fn search_professions(&self, nome: &str, cognome: &str) -> BTreeSet<String> {
        let titles = [format!("{}_{}", nome, cognome), format!("{} {}", nome, cognome)];
        let mut jobs = BTreeSet::new();
        for lang in &self.languages {
            for title in &titles {
                if let Some(text) = self.page_text(lang, title).await {
                    let found = extract_jobs_from_text(&text, lang);
                    info!("{}: {} job phrase(s) on {}", title, found.len(), lang);
                    jobs.extend(found);
                }
            }
        }
        jobs
    }
}
