use std::fs;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::UploadRequest;
use crate::domain::{AttachmentWrite, ObjectWrite, PatientId, VcfObjectRef, VcfProperties};
use crate::error::UploadError;
use crate::phenotips::PhenotipsClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    ConsentNotGranted {
        consent: String,
    },
    AlreadyLinked {
        object: VcfObjectRef,
    },
    /// Metadata was written but the server gave no object link to follow.
    MetadataOnly {
        object: ObjectWrite,
    },
    Uploaded {
        object: ObjectWrite,
        attachment: AttachmentWrite,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub patient_id: PatientId,
    pub filename: String,
    pub legacy_attachment_removed: bool,
    #[serde(flatten)]
    pub outcome: UploadOutcome,
}

#[derive(Clone)]
pub struct App<C: PhenotipsClient> {
    client: C,
}

impl<C: PhenotipsClient> App<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn upload(&self, request: &UploadRequest) -> Result<UploadResult, UploadError> {
        let filename = request.attachment_name()?.to_string();
        let mut legacy_attachment_removed = false;
        let outcome = self.run(request, &filename, &mut legacy_attachment_removed)?;
        Ok(UploadResult {
            patient_id: request.patient_id.clone(),
            filename,
            legacy_attachment_removed,
            outcome,
        })
    }

    fn run(
        &self,
        request: &UploadRequest,
        filename: &str,
        legacy_attachment_removed: &mut bool,
    ) -> Result<UploadOutcome, UploadError> {
        let patient = &request.patient_id;

        let consent = self.client.genetic_consent(patient)?;
        if consent.is_refused() {
            warn!(patient = %patient, consent = %consent, "genetic consent not granted, skipping upload");
            return Ok(UploadOutcome::ConsentNotGranted {
                consent: consent.to_string(),
            });
        }
        info!(patient = %patient, consent = %consent, "genetic consent checked");

        let existing = self.client.find_vcf_object(patient)?;
        if let Some(object) = &existing {
            if object.headline == filename {
                info!(patient = %patient, href = %object.href, "VCF already linked, nothing to do");
                return Ok(UploadOutcome::AlreadyLinked {
                    object: object.clone(),
                });
            }
        }

        let content = fs::read(request.vcf_path.as_std_path()).map_err(|err| {
            UploadError::VcfRead {
                path: request.vcf_path.to_string(),
                message: err.to_string(),
            }
        })?;

        if let Some(legacy) = request.legacy_attachment.as_deref() {
            *legacy_attachment_removed = self.remove_legacy_attachment(patient, legacy, filename)?;
        }

        let properties = VcfProperties::new(filename, request.reference_genome.as_str());
        let object = self.write_metadata(patient, existing.as_ref(), &properties)?;
        if object.reference().is_none() {
            warn!(patient = %patient, "object created without a Location header, skipping attachment");
            return Ok(UploadOutcome::MetadataOnly { object });
        }

        let attachment = self.client.upload_attachment(patient, filename, content)?;
        info!(patient = %patient, attachment = %filename, ?attachment, "VCF attachment uploaded");
        Ok(UploadOutcome::Uploaded { object, attachment })
    }

    /// Creates the VCF object, or updates the one found on the page.
    pub fn write_metadata(
        &self,
        patient: &PatientId,
        existing: Option<&VcfObjectRef>,
        properties: &VcfProperties,
    ) -> Result<ObjectWrite, UploadError> {
        match existing {
            None => {
                let href = self.client.create_vcf_object(patient, properties)?;
                info!(patient = %patient, href = ?href, "VCF object created");
                Ok(ObjectWrite::Created { href })
            }
            Some(object) => {
                self.client.update_vcf_object(object, properties)?;
                info!(patient = %patient, href = %object.href, "VCF object updated");
                Ok(ObjectWrite::Updated {
                    href: object.href.clone(),
                })
            }
        }
    }

    fn remove_legacy_attachment(
        &self,
        patient: &PatientId,
        legacy: &str,
        filename: &str,
    ) -> Result<bool, UploadError> {
        if legacy == filename {
            warn!(attachment = %legacy, "legacy attachment has the upload's name, keeping it");
            return Ok(false);
        }
        if !self.client.attachment_exists(patient, legacy)? {
            return Ok(false);
        }
        self.client.delete_attachment(patient, legacy)?;
        info!(patient = %patient, attachment = %legacy, "legacy attachment removed");
        Ok(true)
    }
}
