use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::{Chamber, ComparisonRow, DistributionRow, LegislatorRecord, RepresentationIndex};
use crate::regions::{reference_region_name, FOREIGN};
use crate::taxonomy::{self, DEGREE_FIELDS, EDUCATION, PROFESSIONS, UNKNOWN};

pub const ITALY: &str = "Italia";
pub const SENIOR_AGE: i32 = 70;

/// Half-open `(lower, upper]` age brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBracket {
    UpTo25,
    From26To35,
    From36To45,
    From46To55,
    From56To65,
    Over65,
}

const AGE_EDGES: [f64; 7] = [0.0, 25.0, 35.0, 45.0, 55.0, 65.0, 100.0];

impl AgeBracket {
    pub const ALL: [AgeBracket; 6] = [
        AgeBracket::UpTo25,
        AgeBracket::From26To35,
        AgeBracket::From36To45,
        AgeBracket::From46To55,
        AgeBracket::From56To65,
        AgeBracket::Over65,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AgeBracket::UpTo25 => "18-25",
            AgeBracket::From26To35 => "26-35",
            AgeBracket::From36To45 => "36-45",
            AgeBracket::From46To55 => "46-55",
            AgeBracket::From56To65 => "56-65",
            AgeBracket::Over65 => "65+",
        }
    }

    /// Bracket holding `age`, or `None` outside `(0, 100]`.
    pub fn of(age: f64) -> Option<AgeBracket> {
        AGE_EDGES
            .windows(2)
            .position(|edge| age > edge[0] && age <= edge[1])
            .map(|i| Self::ALL[i])
    }

    fn rank(label: &str) -> usize {
        Self::ALL
            .iter()
            .position(|b| b.label() == label)
            .unwrap_or(Self::ALL.len())
    }
}

/// Category counts for one side of a comparison.
///
/// Rows without a usable category are tallied in `excluded` and never enter a
/// percentage denominator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    counts: BTreeMap<String, u64>,
    excluded: u64,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let mut distribution = Self::new();
        for value in values {
            distribution.add(value.as_ref().map(|v| v.as_ref()));
        }
        distribution
    }

    pub fn add(&mut self, category: Option<&str>) {
        self.add_count(category, 1);
    }

    pub fn add_count(&mut self, category: Option<&str>, count: u64) {
        match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => {
                let slot = self.counts.entry(c.to_string()).or_default();
                *slot = slot.saturating_add(count);
            }
            None => self.excluded = self.excluded.saturating_add(count),
        }
    }

    pub fn count(&self, category: &str) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().fold(0u64, |sum, v| sum.saturating_add(*v))
    }

    pub fn excluded(&self) -> u64 {
        self.excluded
    }

    /// Fraction of the included total in `category`; 0 for an empty distribution.
    pub fn share(&self, category: &str) -> f64 {
        ratio(self.count(category), self.total())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Counts sorted by frequency, most common first.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self.counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Descriptive rows on a 0-100 scale over `denominator`.
    pub fn summary(&self, denominator: u64) -> Vec<DistributionRow> {
        self.ranked()
            .into_iter()
            .map(|(category, count)| DistributionRow {
                category: category.to_string(),
                absolute_count: count,
                percentage: ratio(count, denominator) * 100.0,
            })
            .collect()
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Outer join of two distributions on category, ordered by category name.
///
/// A category missing from one side counts as zero there. The representation
/// index is undefined whenever the reference share is zero.
pub fn compare(subject: &Distribution, reference: &Distribution) -> Vec<ComparisonRow> {
    let mut categories: Vec<&str> = subject.categories().chain(reference.categories()).collect();
    categories.sort_unstable();
    categories.dedup();

    categories
        .into_iter()
        .map(|category| {
            let mp_percentage = subject.share(category);
            let pop_percentage = reference.share(category);
            ComparisonRow {
                category: category.to_string(),
                mp_count: subject.count(category),
                mp_percentage,
                pop_count: reference.count(category),
                pop_percentage,
                representation_index: RepresentationIndex::from_shares(mp_percentage, pop_percentage),
            }
        })
        .collect()
}

/// Age comparison in bracket order instead of label order.
pub fn compare_age(subject: &Distribution, reference: &Distribution) -> Vec<ComparisonRow> {
    let mut rows = compare(subject, reference);
    rows.sort_by_key(|row| AgeBracket::rank(&row.category));
    rows
}

/// Region comparison ordered by representation index, undefined first.
pub fn compare_regions(subject: &Distribution, reference: &Distribution) -> Vec<ComparisonRow> {
    let mut rows = compare(subject, reference);
    rows.sort_by(|a, b| {
        match (a.representation_index.value(), b.representation_index.value()) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| a.category.cmp(&b.category))
    });
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeniorMember {
    pub nome: Option<String>,
    pub cognome: Option<String>,
    pub genere: Option<String>,
    pub age: i32,
    pub ramo: Chamber,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChamberShare {
    pub chamber: String,
    pub seniors: u64,
    pub members: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeniorReport {
    /// Oldest first.
    pub members: Vec<SeniorMember>,
    pub by_gender: Vec<(String, u64)>,
    pub by_age_range: Vec<(String, u64)>,
    pub by_chamber: Vec<ChamberShare>,
}

/// MP-side statistics over one roster snapshot.
pub struct RepresentationAnalyzer<'a> {
    pub records: &'a [LegislatorRecord],
    pub reference_date: NaiveDate,
}

impl<'a> RepresentationAnalyzer<'a> {
    pub fn new(records: &'a [LegislatorRecord], reference_date: NaiveDate) -> Self {
        Self {
            records,
            reference_date,
        }
    }

    fn legislators(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn gender_distribution(&self) -> Distribution {
        Distribution::from_values(self.records.iter().map(|r| r.genere.as_deref()))
    }

    pub fn age_distribution(&self) -> Distribution {
        Distribution::from_values(self.records.iter().map(|r| {
            r.age_at(self.reference_date)
                .and_then(AgeBracket::of)
                .map(|b| b.label())
        }))
    }

    /// Italian regions only, under their census names. Foreign-born MPs are excluded.
    pub fn region_distribution(&self) -> Distribution {
        Distribution::from_values(self.records.iter().map(|r| {
            r.regione_nascita
                .as_deref()
                .filter(|region| *region != FOREIGN)
                .map(reference_region_name)
        }))
    }

    /// MPs outside the region comparison, as `(no region, born abroad)`.
    pub fn region_exclusions(&self) -> (u64, u64) {
        self.records.iter().fold((0, 0), |(missing, foreign), r| match r.regione_nascita.as_deref() {
            None => (missing + 1, foreign),
            Some(region) if region == FOREIGN => (missing, foreign + 1),
            Some(_) => (missing, foreign),
        })
    }

    /// Born in Italy versus abroad, over MPs with a known region.
    pub fn birth_place_distribution(&self) -> Distribution {
        Distribution::from_values(self.records.iter().map(|r| {
            r.regione_nascita.as_deref().map(|region| {
                if region == FOREIGN {
                    FOREIGN
                } else {
                    ITALY
                }
            })
        }))
    }

    /// Education tier per MP; MPs with no education listed are excluded.
    pub fn education_distribution(&self) -> Distribution {
        Distribution::from_values(self.records.iter().map(|r| {
            r.titolo_studio
                .as_deref()
                .filter(|_| r.has_education())
                .map(|t| EDUCATION.classify(Some(t)))
        }))
    }

    /// Degree subject for MPs whose education is a degree.
    pub fn degree_field_distribution(&self) -> Distribution {
        Distribution::from_values(self.records.iter().map(|r| {
            r.titolo_studio
                .as_deref()
                .filter(|t| EDUCATION.classify(Some(*t)) == "laurea")
                .map(|t| DEGREE_FIELDS.classify(Some(t)))
        }))
    }

    pub fn gender_summary(&self) -> Vec<DistributionRow> {
        let distribution = self.gender_distribution();
        distribution.summary(distribution.total())
    }

    /// Under-35 and over-70 shares over the whole roster.
    pub fn age_summary(&self) -> Vec<DistributionRow> {
        let ages: Vec<f64> = self
            .records
            .iter()
            .filter_map(|r| r.age_at(self.reference_date))
            .collect();
        let under_35 = ages.iter().filter(|a| **a < 35.0).count() as u64;
        let over_70 = ages.iter().filter(|a| **a > 70.0).count() as u64;

        vec![
            DistributionRow {
                category: "Under 35".to_string(),
                absolute_count: under_35,
                percentage: ratio(under_35, self.legislators()) * 100.0,
            },
            DistributionRow {
                category: "Over 70".to_string(),
                absolute_count: over_70,
                percentage: ratio(over_70, self.legislators()) * 100.0,
            },
        ]
    }

    /// Region of birth shares, `Estero` included; returns the null count alongside.
    pub fn region_summary(&self) -> (Vec<DistributionRow>, u64) {
        let distribution =
            Distribution::from_values(self.records.iter().map(|r| r.regione_nascita.as_deref()));
        (
            distribution.summary(distribution.total()),
            distribution.excluded(),
        )
    }

    /// Raw profession phrases; missing entries are counted as `Unknown`.
    pub fn profession_frequencies(&self) -> Vec<DistributionRow> {
        let distribution = Distribution::from_values(self.records.iter().flat_map(|r| {
            r.professione
                .iter()
                .map(|p| Some(p.as_deref().filter(|t| !t.trim().is_empty()).unwrap_or(UNKNOWN)))
        }));
        distribution.summary(self.legislators())
    }

    pub fn profession_categories(&self) -> Vec<DistributionRow> {
        let lists = self
            .records
            .iter()
            .map(|r| r.professione.iter().map(|p| p.as_deref()).collect());
        to_rows(taxonomy::category_frequencies(&PROFESSIONS, lists, self.records.len()))
    }

    pub fn missing_education(&self) -> u64 {
        self.records.iter().filter(|r| !r.has_education()).count() as u64
    }

    /// Individual education titles across MPs with education listed.
    pub fn education_frequencies(&self) -> Vec<DistributionRow> {
        let distribution = Distribution::from_values(
            self.records
                .iter()
                .filter_map(|r| r.titolo_studio.as_deref().filter(|_| r.has_education()))
                .flat_map(taxonomy::split_education_titles)
                .map(Some),
        );
        distribution.summary(self.legislators())
    }

    pub fn education_categories(&self) -> Vec<DistributionRow> {
        let titles: Vec<Vec<String>> = self
            .records
            .iter()
            .map(|r| match r.titolo_studio.as_deref().filter(|_| r.has_education()) {
                Some(text) => taxonomy::split_education_titles(text),
                None => Vec::new(),
            })
            .collect();
        let lists = titles.iter().map(|list| {
            if list.is_empty() {
                vec![None]
            } else {
                list.iter().map(|t| Some(t.as_str())).collect::<Vec<_>>()
            }
        });
        to_rows(taxonomy::category_frequencies(&EDUCATION, lists, self.records.len()))
    }

    pub fn seniors(&self) -> SeniorReport {
        let mut members: Vec<SeniorMember> = self
            .records
            .iter()
            .filter_map(|r| {
                let age = r.whole_age_at(self.reference_date)?;
                (age >= SENIOR_AGE).then(|| SeniorMember {
                    nome: r.nome.clone(),
                    cognome: r.cognome.clone(),
                    genere: r.genere.clone(),
                    age,
                    ramo: r.ramo,
                })
            })
            .collect();
        members.sort_by(|a, b| b.age.cmp(&a.age).then_with(|| a.cognome.cmp(&b.cognome)));

        let by_gender = Distribution::from_values(members.iter().map(|m| m.genere.as_deref()))
            .ranked()
            .into_iter()
            .map(|(g, n)| (g.to_string(), n))
            .collect();

        let ranges: [(&str, i32, i32); 4] = [
            ("70-74", 70, 74),
            ("75-79", 75, 79),
            ("80-84", 80, 84),
            ("85+", 85, i32::MAX),
        ];
        let by_age_range = ranges
            .iter()
            .map(|(label, low, high)| {
                let n = members.iter().filter(|m| m.age >= *low && m.age <= *high).count();
                (label.to_string(), n as u64)
            })
            .collect();

        let mut chamber_totals: HashMap<Chamber, (u64, u64)> = HashMap::new();
        for record in self.records {
            chamber_totals.entry(record.ramo).or_default().1 += 1;
        }
        for member in &members {
            chamber_totals.entry(member.ramo).or_default().0 += 1;
        }
        let mut by_chamber: Vec<ChamberShare> = [Chamber::Camera, Chamber::Senato]
            .iter()
            .map(|chamber| {
                let (seniors, total) = chamber_totals.get(chamber).copied().unwrap_or_default();
                ChamberShare {
                    chamber: chamber.to_string(),
                    seniors,
                    members: total,
                    percentage: ratio(seniors, total) * 100.0,
                }
            })
            .collect();
        let seniors = members.len() as u64;
        by_chamber.push(ChamberShare {
            chamber: "Combined".to_string(),
            seniors,
            members: self.legislators(),
            percentage: ratio(seniors, self.legislators()) * 100.0,
        });

        SeniorReport {
            members,
            by_gender,
            by_age_range,
            by_chamber,
        }
    }
}

fn to_rows(frequencies: Vec<(String, u64, f64)>) -> Vec<DistributionRow> {
    frequencies
        .into_iter()
        .map(|(category, absolute_count, percentage)| DistributionRow {
            category,
            absolute_count,
            percentage,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn mp(id: &str, genere: &str, born: &str, region: Option<&str>, titolo: Option<&str>) -> LegislatorRecord {
        LegislatorRecord {
            id: id.to_string(),
            nome: Some(format!("Nome{}", id)),
            cognome: Some(format!("Cognome{}", id)),
            genere: Some(genere.to_string()),
            data_nascita: Some(born.to_string()),
            citta_nascita: None,
            provincia_nascita: None,
            titolo_studio: titolo.map(str::to_string),
            professione: vec![Some("Avvocato".to_string())],
            tipo_mandato: "elettivo".to_string(),
            ramo: if id.starts_with('s') { Chamber::Senato } else { Chamber::Camera },
            regione_nascita: region.map(str::to_string),
        }
    }

    fn roster() -> Vec<LegislatorRecord> {
        vec![
            mp("c1", "M", "1990-03-01", Some("Lazio"), Some("Laurea in Giurisprudenza")),
            mp("c2", "F", "1970-03-01", Some("Trentino-Alto Adige"), Some("Diploma di liceo")),
            mp("c3", "M", "1960-03-01", Some("Estero"), None),
            mp("s1", "F", "1950-03-01", Some("Lazio"), Some("Laurea in Fisica")),
            mp("s2", "M", "1940-03-01", None, Some("Licenza media")),
        ]
    }

    fn reference_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn share_sum(rows: &[ComparisonRow]) -> (f64, f64) {
        (
            rows.iter().map(|r| r.mp_percentage).sum(),
            rows.iter().map(|r| r.pop_percentage).sum(),
        )
    }

    #[test]
    fn age_brackets_are_right_inclusive() {
        assert_eq!(AgeBracket::of(35.0), Some(AgeBracket::From26To35));
        assert_eq!(AgeBracket::of(35.0001), Some(AgeBracket::From36To45));
        assert_eq!(AgeBracket::of(25.0).map(|b| b.label()), Some("18-25"));
        assert_eq!(AgeBracket::of(100.0), Some(AgeBracket::Over65));
        assert_eq!(AgeBracket::of(0.0), None);
        assert_eq!(AgeBracket::of(100.5), None);
    }

    #[test]
    fn outer_join_keeps_one_sided_categories() {
        let subject = Distribution::from_values(vec![Some("A"), Some("A"), Some("B"), None]);
        let mut reference = Distribution::new();
        reference.add_count(Some("A"), 60);
        reference.add_count(Some("C"), 40);

        let rows = compare(&subject, &reference);
        let categories: Vec<_> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["A", "B", "C"]);

        let b = &rows[1];
        assert_eq!(b.pop_count, 0);
        assert_eq!(b.representation_index, RepresentationIndex::Undefined);

        let c = &rows[2];
        assert_eq!(c.mp_count, 0);
        assert_eq!(c.representation_index, RepresentationIndex::Ratio(0.0));

        let (mp, pop) = share_sum(&rows);
        assert!((mp - 1.0).abs() < EPSILON);
        assert!((pop - 1.0).abs() < EPSILON);
        assert_eq!(subject.excluded(), 1);
    }

    #[test]
    fn huge_counts_saturate() {
        let mut distribution = Distribution::new();
        distribution.add_count(Some("A"), u64::MAX);
        distribution.add_count(Some("A"), 1);
        distribution.add_count(Some("B"), u64::MAX);
        distribution.add_count(None, u64::MAX);
        distribution.add_count(None, 5);
        assert_eq!(distribution.count("A"), u64::MAX);
        assert_eq!(distribution.total(), u64::MAX);
        assert_eq!(distribution.excluded(), u64::MAX);
    }

    #[test]
    fn empty_reference_never_panics() {
        let subject = Distribution::from_values(vec![Some("M")]);
        let rows = compare(&subject, &Distribution::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pop_percentage, 0.0);
        assert_eq!(rows[0].representation_index, RepresentationIndex::Undefined);
    }

    #[test]
    fn region_distribution_excludes_foreign_and_uses_census_names() {
        let records = roster();
        let analyzer = RepresentationAnalyzer::new(&records, reference_date());
        let regions = analyzer.region_distribution();
        assert_eq!(regions.count("Lazio"), 2);
        assert_eq!(regions.count("Trentino-Alto Adige/Südtirol"), 1);
        assert_eq!(regions.count(FOREIGN), 0);
        assert_eq!(regions.excluded(), 2);

        let birth = analyzer.birth_place_distribution();
        assert_eq!(birth.count(ITALY), 3);
        assert_eq!(birth.count(FOREIGN), 1);
    }

    #[test]
    fn region_exclusions_split_missing_from_foreign() {
        let records = roster();
        let analyzer = RepresentationAnalyzer::new(&records, reference_date());
        assert_eq!(analyzer.region_exclusions(), (1, 1));
        let (_, nulls) = analyzer.region_summary();
        assert_eq!(nulls, 1);
        let (missing, foreign) = analyzer.region_exclusions();
        assert_eq!(missing + foreign, analyzer.region_distribution().excluded());
    }

    #[test]
    fn region_comparison_puts_undefined_first() {
        let subject = Distribution::from_values(vec![Some("Lazio"), Some("Molise"), Some("Sicilia")]);
        let mut reference = Distribution::new();
        reference.add_count(Some("Lazio"), 10);
        reference.add_count(Some("Sicilia"), 30);
        let rows = compare_regions(&subject, &reference);
        let order: Vec<_> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(order, vec!["Molise", "Lazio", "Sicilia"]);
    }

    #[test]
    fn percentages_sum_to_one_on_every_axis() {
        let records = roster();
        let analyzer = RepresentationAnalyzer::new(&records, reference_date());
        for distribution in [
            analyzer.gender_distribution(),
            analyzer.age_distribution(),
            analyzer.region_distribution(),
            analyzer.birth_place_distribution(),
            analyzer.education_distribution(),
        ] {
            let rows = compare(&distribution, &distribution);
            let (mp, _) = share_sum(&rows);
            assert!((mp - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn education_axes() {
        let records = roster();
        let analyzer = RepresentationAnalyzer::new(&records, reference_date());
        let education = analyzer.education_distribution();
        assert_eq!(education.count("laurea"), 2);
        assert_eq!(education.count("diploma"), 1);
        assert_eq!(education.count("Other"), 1);
        assert_eq!(education.excluded(), 1);

        let fields = analyzer.degree_field_distribution();
        assert_eq!(fields.count("law"), 1);
        assert_eq!(fields.count("sciences"), 1);
        assert_eq!(fields.total(), 2);
    }

    #[test]
    fn age_summary_uses_whole_roster_as_denominator() {
        let records = roster();
        let analyzer = RepresentationAnalyzer::new(&records, reference_date());
        let summary = analyzer.age_summary();
        assert_eq!(summary[0].absolute_count, 1);
        assert!((summary[0].percentage - 20.0).abs() < EPSILON);
        assert_eq!(summary[1].absolute_count, 2);
    }

    #[test]
    fn seniors_are_split_by_chamber() {
        let records = roster();
        let analyzer = RepresentationAnalyzer::new(&records, reference_date());
        let report = analyzer.seniors();
        assert_eq!(report.members.len(), 2);
        assert_eq!(report.members[0].age, 84);
        assert_eq!(report.by_age_range[0], ("70-74".to_string(), 1));
        assert_eq!(report.by_age_range[2], ("80-84".to_string(), 1));

        let senato = &report.by_chamber[1];
        assert_eq!((senato.seniors, senato.members), (2, 2));
        assert!((senato.percentage - 100.0).abs() < EPSILON);
        let combined = report.by_chamber.last().unwrap();
        assert!((combined.percentage - 40.0).abs() < EPSILON);
    }

    #[test]
    fn profession_categories_count_mentions_per_legislator() {
        let mut records = roster();
        records[0].professione = vec![Some("Avvocato".to_string()), Some("Docente".to_string())];
        let analyzer = RepresentationAnalyzer::new(&records, reference_date());
        let rows = analyzer.profession_categories();
        assert_eq!(rows[0].category, "lawyer");
        assert_eq!(rows[0].absolute_count, 5);
        assert!((rows[0].percentage - 100.0).abs() < EPSILON);
    }
}
