use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum UploadError {
    #[error("invalid patient id: {0}")]
    InvalidPatientId(String),

    #[error("invalid server name: {0}")]
    InvalidServer(String),

    #[error("invalid VCF path: {0}")]
    InvalidVcfPath(String),

    #[error("invalid attachment name: {0}")]
    InvalidAttachmentName(String),

    #[error("failed to read credentials file at {0}")]
    CredentialsRead(PathBuf),

    #[error("credentials must be a single `username:password` line")]
    CredentialsFormat,

    #[error("failed to read VCF file at {path}: {message}")]
    VcfRead { path: String, message: String },

    #[error("PhenoTips request failed: {0}")]
    Http(String),

    #[error("{method} {url} returned status {status}: {message}")]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    #[error("failed to parse consent list: {0}")]
    ConsentParse(String),

    #[error("failed to parse VCF object summary: {0}")]
    ObjectSummaryParse(String),
}
