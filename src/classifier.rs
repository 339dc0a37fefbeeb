use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;

use crate::cli::EducationLevel;
use crate::text::normalize_spacing;

pub const MIN_YEAR: u32 = 2002;
pub const MAX_YEAR: u32 = 2024;

/// How a rule table picks its label when several keys occur in a name.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatchPolicy {
    FirstMatch,
    LastMatch,
    /// Every matching label, in table order, each followed by a space.
    ConcatAll,
}

#[derive(Debug, Clone, Copy)]
pub struct RuleTable {
    pub policy: MatchPolicy,
    pub rules: &'static [(&'static str, &'static str)],
}

impl RuleTable {
    /// `lowercase_name` must already be lowercased; keys are lowercase substrings.
    pub fn resolve(&self, lowercase_name: &str) -> Option<String> {
        let mut hits = self
            .rules
            .iter()
            .filter(|(key, _)| lowercase_name.contains(key))
            .map(|(_, label)| *label);

        match self.policy {
            MatchPolicy::FirstMatch => hits.next().map(ToOwned::to_owned),
            MatchPolicy::LastMatch => hits.last().map(ToOwned::to_owned),
            MatchPolicy::ConcatAll => {
                let joined = hits.map(|label| format!("{label} ")).collect::<String>();
                (!joined.is_empty()).then_some(joined)
            }
        }
    }
}

pub const TYPE_TABLE: RuleTable = RuleTable {
    policy: MatchPolicy::LastMatch,
    rules: &[
        ("kabupaten", "OSK"),
        ("kota", "OSK"),
        ("provinsi", "OSP"),
        ("inamo", "OSN"),
        ("imo", "OSN"),
        ("ino", "OSN"),
        ("ksn", "OSN"),
        ("ksk", "OSK"),
        ("ksn-k", "OSK"),
        ("ksn-p", "OSP"),
        ("ksp", "OSP"),
        ("osnk", "OSK"),
        ("osnp", "OSP"),
        ("osn", "OSN"),
        ("osk", "OSK"),
        ("osp", "OSP"),
        ("osn-k", "OSK"),
        ("osn-p", "OSP"),
        ("nasional", "OSN"),
    ],
};

pub const CONTENT_TABLE: RuleTable = RuleTable {
    policy: MatchPolicy::LastMatch,
    rules: &[
        ("soal", "Soal"),
        ("solusi", "Solusi"),
        ("kunci", "Kunci"),
        ("pembahasan", "Solusi"),
    ],
};

pub const AUTHOR_TABLE: RuleTable = RuleTable {
    policy: MatchPolicy::FirstMatch,
    rules: &[
        ("konsep-matematika", "konsep-matematika.com"),
        ("tohir", "Moh. Tohir"),
        ("miftah", "Miftah"),
        ("pebrudal", "Pebrudal Zanu"),
        ("anang", "Anang"),
        ("wildan", "Wildan"),
        ("saiful", "Saiful Arif"),
        ("tutur", "Tutur"),
        ("m2suidhat", "Moh. Tohir"),
        ("yoapriyanto", "Moh. Tohir"),
        ("siaposn", "siap-osn.blogspot.com"),
    ],
};

pub const TIPE_TABLE: RuleTable = RuleTable {
    policy: MatchPolicy::LastMatch,
    rules: &[
        ("tipe 1", "Tipe 1"),
        ("tipe 2", "Tipe 2"),
        ("tipe 3", "Tipe 3"),
        ("offline", "Offline"),
        ("online", "Online"),
        ("versi 1", "Versi 1"),
        ("versi 2", "Versi 2"),
        ("versi 3", "Versi 3"),
        ("isian singkat", "Isian Singkat"),
        ("pilihan ganda", "Pilihan Ganda"),
        ("esai", "Esai"),
        ("essay", "Esai"),
        ("pilgan", "Pilihan Ganda"),
        ("bagian a", "Bagian A"),
        ("bagian b", "Bagian B"),
        ("bagian c", "Bagian C"),
    ],
};

pub const LEVEL_TABLE: RuleTable = RuleTable {
    policy: MatchPolicy::ConcatAll,
    rules: &[
        ("penyisihan", "Penyisihan"),
        ("semifinal", "Semifinal"),
        ("babak final", "Babak Final"),
        ("seleksi", "Seleksi"),
    ],
};

#[derive(Debug, Clone, Copy)]
pub struct ClassificationTables {
    pub olympiad_type: RuleTable,
    pub content: RuleTable,
    pub author: RuleTable,
    pub tipe: RuleTable,
    pub level: RuleTable,
}

impl Default for ClassificationTables {
    fn default() -> Self {
        Self {
            olympiad_type: TYPE_TABLE,
            content: CONTENT_TABLE,
            author: AUTHOR_TABLE,
            tipe: TIPE_TABLE,
            level: LEVEL_TABLE,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum Rejection {
    #[error("not a PDF file")]
    NotAPdf,
    #[error("could not determine valid year")]
    YearNotFound,
    #[error("could not determine type (OSK/OSP/OSN)")]
    TypeNotFound,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAPdf => "not_a_pdf",
            Self::YearNotFound => "year_not_found",
            Self::TypeNotFound => "type_not_found",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RegularName {
    pub olympiad_type: String,
    pub year: u32,
    pub content: String,
    pub day: Option<&'static str>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Classification {
    Shortlist { year: u32 },
    Regular(RegularName),
}

impl Classification {
    pub fn canonical_name(&self) -> String {
        let name = match self {
            Self::Shortlist { year } => return format!("Shortlist - {year} - Official.pdf"),
            Self::Regular(name) => name,
        };

        let year = name.year.to_string();
        let mut parts = vec![name.olympiad_type.as_str(), year.as_str()];
        if !name.content.is_empty() {
            parts.push(name.content.as_str());
        }
        if let Some(day) = name.day {
            parts.push(day);
        }
        if let Some(author) = name.author.as_deref() {
            parts.push(author);
        }

        let mut joined = parts.join(" - ");
        if !joined.ends_with(".pdf") {
            joined.push_str(".pdf");
        }
        joined
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RenamePlan {
    AlreadyCorrect,
    Rename(String),
}

pub struct FilenameClassifier {
    level: EducationLevel,
    tables: ClassificationTables,
    four_digit_year: Regex,
    bounded_two_digit_year: Regex,
    trailing_two_digit_year: Regex,
    shortlist: Regex,
    day_one: Regex,
    day_two: Regex,
}

impl FilenameClassifier {
    pub fn new(level: EducationLevel) -> Result<Self> {
        Ok(Self {
            level,
            tables: ClassificationTables::default(),
            four_digit_year: compile(r"20[0-2][0-9]")?,
            bounded_two_digit_year: compile(r"[^0-9]([0-9]{2})[^0-9]")?,
            trailing_two_digit_year: compile(r"([0-9]{2})$")?,
            shortlist: compile(r"(?i)shortlist|usulan")?,
            day_one: compile(r"(?i)d1|day\s*1|hari\s*1|hari\s*pertama")?,
            day_two: compile(r"(?i)d2|day\s*2|hari\s*2|hari\s*kedua")?,
        })
    }

    pub fn level(&self) -> EducationLevel {
        self.level
    }

    pub fn plan(&self, filename: &str) -> Result<RenamePlan, Rejection> {
        let canonical = self.classify(filename)?.canonical_name();
        if canonical == filename {
            return Ok(RenamePlan::AlreadyCorrect);
        }
        Ok(RenamePlan::Rename(canonical))
    }

    pub fn classify(&self, filename: &str) -> Result<Classification, Rejection> {
        let path = Path::new(filename);
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf {
            return Err(Rejection::NotAPdf);
        }

        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let normalized = normalize_spacing(stem);
        let year = self.extract_year(&normalized).ok_or(Rejection::YearNotFound)?;

        if self.shortlist.is_match(&normalized) {
            return Ok(Classification::Shortlist { year });
        }

        let lowered = normalized.to_lowercase();
        let olympiad_type = self
            .tables
            .olympiad_type
            .resolve(&lowered)
            .map(|label| format!("{label} {}", self.level.type_suffix()))
            .ok_or(Rejection::TypeNotFound)?;

        Ok(Classification::Regular(RegularName {
            olympiad_type,
            year,
            content: self.extract_content(&lowered),
            day: self.extract_day(&normalized),
            author: self.tables.author.resolve(&lowered),
        }))
    }

    pub fn extract_year(&self, name: &str) -> Option<u32> {
        if let Some(found) = self.four_digit_year.find(name) {
            if let Some(year) = in_range(found.as_str(), 0) {
                return Some(year);
            }
        }

        let padded = format!(" {name} ");
        let bounded = self
            .bounded_two_digit_year
            .captures(&padded)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| in_range(digits.as_str(), 2000));
        if bounded.is_some() {
            return bounded;
        }

        self.trailing_two_digit_year
            .captures(name)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| in_range(digits.as_str(), 2000))
    }

    fn extract_content(&self, lowered: &str) -> String {
        let content = self.tables.content.resolve(lowered).unwrap_or_default();
        let level = self.tables.level.resolve(lowered).unwrap_or_default();
        let tipe = self.tables.tipe.resolve(lowered).unwrap_or_default();
        format!("{content} {level}{tipe}").trim().to_string()
    }

    fn extract_day(&self, name: &str) -> Option<&'static str> {
        if self.day_one.is_match(name) {
            Some("Hari 1")
        } else if self.day_two.is_match(name) {
            Some("Hari 2")
        } else {
            None
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("failed to compile filename regex: {pattern}"))
}

fn in_range(digits: &str, offset: u32) -> Option<u32> {
    let year = digits.parse::<u32>().ok()? + offset;
    (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
}
