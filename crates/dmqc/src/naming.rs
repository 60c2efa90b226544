//! Scan naming convention
//!
//! Session identifiers look like `STUDY_SITE_SUBJECT_TIMEPOINT[_SESSION]`.
//! Phantoms use `PHA` as the subject field, e.g. `SPN01_CMH_PHA_FBN0001`.
//!
//! Series files append `_<TAG>_<SERIES>_<DESCRIPTION>` and an extension:
//!
//! ```text
//! SPN01_CMH_0001_01_01_T1_03_SagT1-BRAVO.nii.gz
//! └────── identifier ─┘ └┬┘ └┬┘ └─ description ┘
//!                       tag series
//! ```

use crate::error::{QcError, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Subject field used by phantom (non-human) sessions.
pub const PHANTOM_SUBJECT: &str = "PHA";

/// Session number assumed when an identifier omits it.
pub const DEFAULT_SESSION: &str = "01";

const IDENT_PATTERN: &str = r"(?P<study>[A-Za-z0-9]+)_(?P<site>[A-Za-z0-9]+)_(?P<subject>[A-Za-z0-9]+)_(?P<timepoint>[A-Za-z0-9]+)(?:_(?P<session>[0-9]{2}))?";

/// Extensions with more than one dot that must be stripped as a unit.
const MULTI_EXTENSIONS: &[&str] = &[".nii.gz"];

fn ident_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("^{}$", IDENT_PATTERN)).expect("identifier pattern is valid")
    })
}

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^{}_(?P<tag>[A-Za-z0-9.\-]+)_(?P<series>[0-9]+)_(?P<description>.+)$",
            IDENT_PATTERN
        ))
        .expect("filename pattern is valid")
    })
}

/// A parsed session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub study: String,
    pub site: String,
    pub subject: String,
    pub timepoint: String,
    /// `None` when the identifier carried no session field.
    pub session: Option<String>,
}

impl Identifier {
    /// Parse a bare identifier such as `SPN01_CMH_0001_01`.
    pub fn parse(id: &str) -> Result<Self> {
        let caps = ident_regex()
            .captures(id)
            .ok_or_else(|| QcError::NameFormat(format!("{} does not match the naming convention", id)))?;
        Ok(Self::from_captures(&caps))
    }

    fn from_captures(caps: &regex::Captures<'_>) -> Self {
        Self {
            study: caps["study"].to_string(),
            site: caps["site"].to_string(),
            subject: caps["subject"].to_string(),
            timepoint: caps["timepoint"].to_string(),
            session: caps.name("session").map(|m| m.as_str().to_string()),
        }
    }

    pub fn is_phantom(&self) -> bool {
        self.subject == PHANTOM_SUBJECT
    }

    /// `STUDY_SITE_SUBJECT_TIMEPOINT`, without the session.
    pub fn full_id(&self) -> String {
        format!("{}_{}_{}_{}", self.study, self.site, self.subject, self.timepoint)
    }

    /// Identifier including the session, defaulting it for human subjects.
    pub fn with_session(&self) -> String {
        match (&self.session, self.is_phantom()) {
            (Some(session), _) => format!("{}_{}", self.full_id(), session),
            (None, true) => self.full_id(),
            (None, false) => format!("{}_{}", self.full_id(), DEFAULT_SESSION),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.session {
            Some(session) => write!(f, "{}_{}", self.full_id(), session),
            None => write!(f, "{}", self.full_id()),
        }
    }
}

/// The fields carried by a series file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedName {
    pub ident: Identifier,
    pub tag: String,
    pub series: u32,
    pub description: String,
}

/// Parse a series file name (or path). The extension is stripped first.
pub fn parse_filename(name: &str) -> Result<ParsedName> {
    let file_name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    let (stem, _) = split_extension(file_name);

    let caps = filename_regex()
        .captures(stem)
        .ok_or_else(|| QcError::NameFormat(format!("{} does not match the naming convention", stem)))?;
    let series = caps["series"]
        .parse::<u32>()
        .map_err(|_| QcError::NameFormat(format!("{}: series number out of range", stem)))?;

    Ok(ParsedName {
        ident: Identifier::from_captures(&caps),
        tag: caps["tag"].to_string(),
        series,
        description: caps["description"].to_string(),
    })
}

/// Split `name` into (stem, extension). The extension keeps its leading dot
/// and is empty when there is none.
pub fn split_extension(name: &str) -> (&str, &str) {
    for ext in MULTI_EXTENSIONS {
        if let Some(stem) = name.strip_suffix(ext) {
            return (stem, &name[stem.len()..]);
        }
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// File name without directory or extension.
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    split_extension(&name).0.to_string()
}
