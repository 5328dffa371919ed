use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::UploadError;

pub const VCF_CLASS_NAME: &str = "PhenoTips.VCF";
pub const GENETIC_CONSENT_ID: &str = "genetic";

static PATIENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap());

/// Document name of a patient record, e.g. `P0000123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PatientId(String);

impl PatientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientId {
    type Err = UploadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !PATIENT_ID_RE.is_match(trimmed) {
            return Err(UploadError::InvalidPatientId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentStatus {
    Yes,
    No,
    NotSet,
    Other(String),
}

impl ConsentStatus {
    /// Only an explicit refusal stops the upload.
    pub fn is_refused(&self) -> bool {
        matches!(self, ConsentStatus::No)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConsentStatus::Yes => "yes",
            ConsentStatus::No => "no",
            ConsentStatus::NotSet => "not_set",
            ConsentStatus::Other(value) => value.as_str(),
        }
    }
}

impl From<&str> for ConsentStatus {
    fn from(value: &str) -> Self {
        match value.trim() {
            "yes" => ConsentStatus::Yes,
            "no" => ConsentStatus::No,
            "not_set" => ConsentStatus::NotSet,
            other => ConsentStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Existing `PhenoTips.VCF` object on a patient page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VcfObjectRef {
    pub href: String,
    pub headline: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfProperties {
    pub class_name: String,
    pub filename: String,
    pub reference_genome: String,
}

impl VcfProperties {
    pub fn new(filename: impl Into<String>, reference_genome: impl Into<String>) -> Self {
        Self {
            class_name: VCF_CLASS_NAME.to_string(),
            filename: filename.into(),
            reference_genome: reference_genome.into(),
        }
    }

    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("className", self.class_name.clone()),
            ("property#filename", self.filename.clone()),
            ("property#reference_genome", self.reference_genome.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ObjectWrite {
    Created { href: Option<String> },
    Updated { href: String },
}

impl ObjectWrite {
    pub fn action(&self) -> &'static str {
        match self {
            ObjectWrite::Created { .. } => "created",
            ObjectWrite::Updated { .. } => "updated",
        }
    }

    /// Object link the attachment upload can follow, if the server gave one.
    pub fn reference(&self) -> Option<&str> {
        match self {
            ObjectWrite::Created { href } => href.as_deref().filter(|href| !href.is_empty()),
            ObjectWrite::Updated { href } => Some(href.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentWrite {
    Created,
    Updated,
}

impl fmt::Display for AttachmentWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentWrite::Created => write!(f, "created"),
            AttachmentWrite::Updated => write!(f, "updated"),
        }
    }
}
