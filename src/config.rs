use std::path::PathBuf;

use camino::Utf8PathBuf;
use reqwest::Url;

use crate::credentials::Credentials;
use crate::domain::PatientId;
use crate::error::UploadError;

pub const DEFAULT_REFERENCE_GENOME: &str = "GRCh37";

/// Raw values as they arrive from the command line.
#[derive(Debug, Clone)]
pub struct UploadArgs {
    pub patient_id: String,
    pub vcf_path: PathBuf,
    pub credentials_file: PathBuf,
    pub server: String,
    pub reference_genome: Option<String>,
    pub legacy_attachment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_url: Url,
    pub credentials: Credentials,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub patient_id: PatientId,
    pub vcf_path: Utf8PathBuf,
    pub reference_genome: String,
    pub legacy_attachment: Option<String>,
}

impl UploadRequest {
    /// Attachment name and `filename` property: the basename of the local file.
    pub fn attachment_name(&self) -> Result<&str, UploadError> {
        self.vcf_path
            .file_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| UploadError::InvalidVcfPath(self.vcf_path.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server: ServerConfig,
    pub request: UploadRequest,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(args: UploadArgs) -> Result<ResolvedConfig, UploadError> {
        let credentials = Credentials::load(&args.credentials_file)?;
        Self::resolve_with_credentials(args, credentials)
    }

    pub fn resolve_with_credentials(
        args: UploadArgs,
        credentials: Credentials,
    ) -> Result<ResolvedConfig, UploadError> {
        let base_url = parse_server(&args.server)?;
        let patient_id: PatientId = args.patient_id.parse()?;
        let vcf_path = Utf8PathBuf::from_path_buf(args.vcf_path)
            .map_err(|path| UploadError::InvalidVcfPath(path.display().to_string()))?;

        let reference_genome = args
            .reference_genome
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_REFERENCE_GENOME.to_string());

        let legacy_attachment = match args.legacy_attachment {
            Some(name) => Some(validate_attachment_name(&name)?),
            None => None,
        };

        let request = UploadRequest {
            patient_id,
            vcf_path,
            reference_genome,
            legacy_attachment,
        };
        request.attachment_name()?;

        Ok(ResolvedConfig {
            server: ServerConfig {
                base_url,
                credentials,
            },
            request,
        })
    }
}

/// Accepts `host[:port]` (plain HTTP) or a full `http(s)://` base URL.
pub fn parse_server(server: &str) -> Result<Url, UploadError> {
    let trimmed = server.trim();
    if trimmed.is_empty() {
        return Err(UploadError::InvalidServer(server.to_string()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|err| UploadError::InvalidServer(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(UploadError::InvalidServer(server.to_string()));
    }
    Ok(url)
}

fn validate_attachment_name(name: &str) -> Result<String, UploadError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        return Err(UploadError::InvalidAttachmentName(name.to_string()));
    }
    Ok(trimmed.to_string())
}
