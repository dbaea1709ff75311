//! Stage 2: province of birth → region of birth.
//!
//! Lookups are exact and case-sensitive after trimming. Every spelling seen in the
//! rosters needs its own alias; anything else lands in [`FOREIGN`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::models::LegislatorRecord;

pub const FOREIGN: &str = "Estero";

pub const REGIONS: [&str; 20] = [
    "Abruzzo",
    "Basilicata",
    "Calabria",
    "Campania",
    "Emilia-Romagna",
    "Friuli-Venezia Giulia",
    "Lazio",
    "Liguria",
    "Lombardia",
    "Marche",
    "Molise",
    "Piemonte",
    "Puglia",
    "Sardegna",
    "Sicilia",
    "Toscana",
    "Trentino-Alto Adige",
    "Umbria",
    "Valle d'Aosta",
    "Veneto",
];

const PROVINCE_ALIASES: &[(&str, &str)] = &[
    ("Aosta", "Valle d'Aosta"),
    // Piemonte
    ("Alessandria", "Piemonte"),
    ("Asti", "Piemonte"),
    ("Biella", "Piemonte"),
    ("Cuneo", "Piemonte"),
    ("Novara", "Piemonte"),
    ("Torino", "Piemonte"),
    ("Verbano-Cusio-Ossola", "Piemonte"),
    ("Verbano Cusio Ossola", "Piemonte"),
    ("Verbania", "Piemonte"),
    ("Vercelli", "Piemonte"),
    // Lombardia
    ("Bergamo", "Lombardia"),
    ("Brescia", "Lombardia"),
    ("Como", "Lombardia"),
    ("Cremona", "Lombardia"),
    ("Lecco", "Lombardia"),
    ("Lodi", "Lombardia"),
    ("Monza e Brianza", "Lombardia"),
    ("Monza E Della Brianza", "Lombardia"),
    ("Monza", "Lombardia"),
    ("Milano", "Lombardia"),
    ("Mantova", "Lombardia"),
    ("Pavia", "Lombardia"),
    ("Sondrio", "Lombardia"),
    ("Varese", "Lombardia"),
    // Trentino-Alto Adige
    ("Bolzano", "Trentino-Alto Adige"),
    ("Bolzano/Bozen", "Trentino-Alto Adige"),
    ("Trento", "Trentino-Alto Adige"),
    // Veneto
    ("Belluno", "Veneto"),
    ("Padova", "Veneto"),
    ("Rovigo", "Veneto"),
    ("Treviso", "Veneto"),
    ("Venezia", "Veneto"),
    ("Vicenza", "Veneto"),
    ("Verona", "Veneto"),
    // Friuli-Venezia Giulia
    ("Gorizia", "Friuli-Venezia Giulia"),
    ("Pordenone", "Friuli-Venezia Giulia"),
    ("Trieste", "Friuli-Venezia Giulia"),
    ("Udine", "Friuli-Venezia Giulia"),
    // Liguria
    ("Genova", "Liguria"),
    ("Imperia", "Liguria"),
    ("La Spezia", "Liguria"),
    ("Savona", "Liguria"),
    // Emilia-Romagna
    ("Bologna", "Emilia-Romagna"),
    ("Forlì-Cesena", "Emilia-Romagna"),
    ("Forli'-Cesena", "Emilia-Romagna"),
    ("Forlì", "Emilia-Romagna"),
    ("Forli'", "Emilia-Romagna"),
    ("Ferrara", "Emilia-Romagna"),
    ("Modena", "Emilia-Romagna"),
    ("Piacenza", "Emilia-Romagna"),
    ("Parma", "Emilia-Romagna"),
    ("Ravenna", "Emilia-Romagna"),
    ("Reggio Emilia", "Emilia-Romagna"),
    ("Reggio nell'Emilia", "Emilia-Romagna"),
    ("Reggio Nell'Emilia", "Emilia-Romagna"),
    ("Rimini", "Emilia-Romagna"),
    // Toscana
    ("Arezzo", "Toscana"),
    ("Firenze", "Toscana"),
    ("Grosseto", "Toscana"),
    ("Livorno", "Toscana"),
    ("Lucca", "Toscana"),
    ("Massa-Carrara", "Toscana"),
    ("Massa Carrara", "Toscana"),
    ("Massa", "Toscana"),
    ("Pisa", "Toscana"),
    ("Pistoia", "Toscana"),
    ("Prato", "Toscana"),
    ("Siena", "Toscana"),
    // Umbria
    ("Perugia", "Umbria"),
    ("Terni", "Umbria"),
    // Marche
    ("Ancona", "Marche"),
    ("Ascoli Piceno", "Marche"),
    ("Fermo", "Marche"),
    ("Macerata", "Marche"),
    ("Pesaro e Urbino", "Marche"),
    ("Pesaro E Urbino", "Marche"),
    ("Pesaro", "Marche"),
    ("Urbino", "Marche"),
    // Lazio
    ("Frosinone", "Lazio"),
    ("Latina", "Lazio"),
    ("Rieti", "Lazio"),
    ("Roma", "Lazio"),
    ("Viterbo", "Lazio"),
    // Abruzzo
    ("L'Aquila", "Abruzzo"),
    ("Chieti", "Abruzzo"),
    ("Pescara", "Abruzzo"),
    ("Teramo", "Abruzzo"),
    // Molise
    ("Campobasso", "Molise"),
    ("Isernia", "Molise"),
    // Campania
    ("Avellino", "Campania"),
    ("Benevento", "Campania"),
    ("Caserta", "Campania"),
    ("Napoli", "Campania"),
    ("Salerno", "Campania"),
    // Puglia
    ("Bari", "Puglia"),
    ("Brindisi", "Puglia"),
    ("Barletta-Andria-Trani", "Puglia"),
    ("Foggia", "Puglia"),
    ("Lecce", "Puglia"),
    ("Taranto", "Puglia"),
    // Basilicata
    ("Matera", "Basilicata"),
    ("Potenza", "Basilicata"),
    // Calabria
    ("Cosenza", "Calabria"),
    ("Catanzaro", "Calabria"),
    ("Crotone", "Calabria"),
    ("Reggio Calabria", "Calabria"),
    ("Reggio di Calabria", "Calabria"),
    ("Reggio Di Calabria", "Calabria"),
    ("Vibo Valentia", "Calabria"),
    // Sicilia
    ("Agrigento", "Sicilia"),
    ("Caltanissetta", "Sicilia"),
    ("Catania", "Sicilia"),
    ("Enna", "Sicilia"),
    ("Messina", "Sicilia"),
    ("Palermo", "Sicilia"),
    ("Ragusa", "Sicilia"),
    ("Siracusa", "Sicilia"),
    ("Trapani", "Sicilia"),
    // Sardegna
    ("Cagliari", "Sardegna"),
    ("Carbonia-Iglesias", "Sardegna"),
    ("Nuoro", "Sardegna"),
    ("Ogliastra", "Sardegna"),
    ("Oristano", "Sardegna"),
    ("Olbia-Tempio", "Sardegna"),
    ("Sassari", "Sardegna"),
    ("Sud Sardegna", "Sardegna"),
    ("Medio Campidano", "Sardegna"),
    // Foreign countries of birth seen in the rosters
    ("Svizzera", FOREIGN),
    ("Belgio", FOREIGN),
    ("Germania", FOREIGN),
    ("Argentina", FOREIGN),
    ("Costa D'Avorio", FOREIGN),
    ("Marocco", FOREIGN),
];

/// Regions whose census name is the bilingual form.
const REFERENCE_NAMES: &[(&str, &str)] = &[
    ("Valle d'Aosta", "Valle d'Aosta/Vallée d'Aoste"),
    ("Trentino-Alto Adige", "Trentino-Alto Adige/Südtirol"),
    ("Friuli-Venezia Giulia", "Friuli-Venezia Giulia"),
];

fn lookup_alias(province: &str) -> Option<&'static str> {
    PROVINCE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == province)
        .map(|(_, region)| *region)
}

/// Region of birth for a raw province string. `None` only when the province is missing.
pub fn region_for_province(province: Option<&str>) -> Option<&'static str> {
    let province = province.map(str::trim).filter(|p| !p.is_empty())?;
    Some(lookup_alias(province).unwrap_or(FOREIGN))
}

/// Whether the province is an explicit alias rather than a fallback.
pub fn is_known_province(province: &str) -> bool {
    lookup_alias(province.trim()).is_some()
}

/// Maps a roster region name to the name used by the population tables.
pub fn reference_region_name(region: &str) -> &str {
    REFERENCE_NAMES
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, reference)| *reference)
        .unwrap_or(region)
}

/// What [`assign_regions`] did, for the console diagnostics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegionAssignment {
    pub distinct_provinces: usize,
    pub unmapped_provinces: BTreeSet<String>,
    pub missing_province: usize,
    pub region_counts: BTreeMap<String, usize>,
}

pub fn assign_regions(records: &mut [LegislatorRecord]) -> RegionAssignment {
    let mut report = RegionAssignment::default();
    let mut provinces = BTreeSet::new();

    for record in records.iter_mut() {
        let province = record.provincia_nascita.as_deref();
        if let Some(p) = province.map(str::trim).filter(|p| !p.is_empty()) {
            provinces.insert(p.to_string());
            if !is_known_province(p) {
                report.unmapped_provinces.insert(p.to_string());
            }
        }

        record.regione_nascita = region_for_province(province).map(str::to_string);
        match &record.regione_nascita {
            Some(region) => *report.region_counts.entry(region.clone()).or_default() += 1,
            None => report.missing_province += 1,
        }
    }

    report.distinct_provinces = provinces.len();
    report
}

impl RegionAssignment {
    pub fn log(&self) {
        info!("Found {} unique province values", self.distinct_provinces);
        if !self.unmapped_provinces.is_empty() {
            warn!(
                "{} provinces not mapped to Italian regions, marked as {}: {:?}",
                self.unmapped_provinces.len(),
                FOREIGN,
                self.unmapped_provinces
            );
        }
        for region in REGIONS.iter().chain(std::iter::once(&FOREIGN)) {
            let count = self.region_counts.get(*region).copied().unwrap_or(0);
            info!("  {}: {}", region, count);
        }
        info!("Records with null regione_nascita: {}", self.missing_province);
    }
}
