use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use phenotips_vcf_upload::app::{App, UploadOutcome};
use phenotips_vcf_upload::config::UploadRequest;
use phenotips_vcf_upload::domain::{
    AttachmentWrite, ConsentStatus, ObjectWrite, PatientId, VcfObjectRef, VcfProperties,
};
use phenotips_vcf_upload::error::UploadError;
use phenotips_vcf_upload::phenotips::PhenotipsClient;

const OBJECT_HREF: &str =
    "http://phenotips.test/rest/wikis/xwiki/spaces/data/pages/P0000001/objects/PhenoTips.VCF/0";

struct FakeClient {
    consent: ConsentStatus,
    existing: Option<VcfObjectRef>,
    location: Option<String>,
    legacy_present: bool,
    attachment: AttachmentWrite,
    calls: Mutex<Vec<String>>,
}

impl FakeClient {
    fn new(consent: ConsentStatus) -> Self {
        Self {
            consent,
            existing: None,
            location: Some(OBJECT_HREF.to_string()),
            legacy_present: false,
            attachment: AttachmentWrite::Created,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_existing(mut self, headline: &str) -> Self {
        self.existing = Some(VcfObjectRef {
            href: OBJECT_HREF.to_string(),
            headline: headline.to_string(),
        });
        self
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PhenotipsClient for &FakeClient {
    fn genetic_consent(&self, patient: &PatientId) -> Result<ConsentStatus, UploadError> {
        self.record(format!("consent {patient}"));
        Ok(self.consent.clone())
    }

    fn find_vcf_object(&self, patient: &PatientId) -> Result<Option<VcfObjectRef>, UploadError> {
        self.record(format!("lookup {patient}"));
        Ok(self.existing.clone())
    }

    fn create_vcf_object(
        &self,
        patient: &PatientId,
        properties: &VcfProperties,
    ) -> Result<Option<String>, UploadError> {
        self.record(format!(
            "create {patient} {} {}",
            properties.filename, properties.reference_genome
        ));
        Ok(self.location.clone())
    }

    fn update_vcf_object(
        &self,
        object: &VcfObjectRef,
        properties: &VcfProperties,
    ) -> Result<(), UploadError> {
        self.record(format!("update {} {}", object.href, properties.filename));
        Ok(())
    }

    fn upload_attachment(
        &self,
        patient: &PatientId,
        name: &str,
        content: Vec<u8>,
    ) -> Result<AttachmentWrite, UploadError> {
        self.record(format!("upload {patient} {name} {}", content.len()));
        Ok(self.attachment)
    }

    fn attachment_exists(&self, patient: &PatientId, name: &str) -> Result<bool, UploadError> {
        self.record(format!("head {patient} {name}"));
        Ok(self.legacy_present)
    }

    fn delete_attachment(&self, patient: &PatientId, name: &str) -> Result<(), UploadError> {
        self.record(format!("delete {patient} {name}"));
        Ok(())
    }
}

fn write_vcf(dir: &tempfile::TempDir) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("sample.vcf")).unwrap();
    std::fs::write(&path, "##fileformat=VCFv4.2\n").unwrap();
    path
}

fn request(vcf_path: Utf8PathBuf) -> UploadRequest {
    UploadRequest {
        patient_id: "P0000001".parse().unwrap(),
        vcf_path,
        reference_genome: "GRCh37".to_string(),
        legacy_attachment: None,
    }
}

fn is_write(call: &str) -> bool {
    ["create", "update", "upload", "delete"]
        .iter()
        .any(|prefix| call.starts_with(prefix))
}

#[test]
fn refused_consent_performs_no_writes() {
    let temp = tempfile::tempdir().unwrap();
    let client = FakeClient::new(ConsentStatus::No);
    let app = App::new(&client);

    let result = app.upload(&request(write_vcf(&temp))).unwrap();

    assert_eq!(
        result.outcome,
        UploadOutcome::ConsentNotGranted {
            consent: "no".to_string()
        }
    );
    assert_eq!(client.calls(), vec!["consent P0000001"]);
}

#[test]
fn new_object_is_created_then_uploaded() {
    let temp = tempfile::tempdir().unwrap();
    let client = FakeClient::new(ConsentStatus::Yes);
    let app = App::new(&client);

    let result = app.upload(&request(write_vcf(&temp))).unwrap();

    assert_eq!(result.filename, "sample.vcf");
    assert_eq!(
        result.outcome,
        UploadOutcome::Uploaded {
            object: ObjectWrite::Created {
                href: Some(OBJECT_HREF.to_string())
            },
            attachment: AttachmentWrite::Created,
        }
    );
    assert_eq!(
        client.calls(),
        vec![
            "consent P0000001",
            "lookup P0000001",
            "create P0000001 sample.vcf GRCh37",
            "upload P0000001 sample.vcf 21",
        ]
    );
}

#[test]
fn matching_headline_skips_write_and_upload() {
    let temp = tempfile::tempdir().unwrap();
    let client = FakeClient::new(ConsentStatus::Yes).with_existing("sample.vcf");
    let app = App::new(&client);

    let result = app.upload(&request(write_vcf(&temp))).unwrap();

    assert_matches!(result.outcome, UploadOutcome::AlreadyLinked { .. });
    assert!(!client.calls().iter().any(|call| is_write(call)));
}

#[test]
fn different_headline_updates_existing_object() {
    let temp = tempfile::tempdir().unwrap();
    let mut client = FakeClient::new(ConsentStatus::NotSet).with_existing("old.vcf");
    client.attachment = AttachmentWrite::Updated;
    let app = App::new(&client);

    let result = app.upload(&request(write_vcf(&temp))).unwrap();

    assert_eq!(
        result.outcome,
        UploadOutcome::Uploaded {
            object: ObjectWrite::Updated {
                href: OBJECT_HREF.to_string()
            },
            attachment: AttachmentWrite::Updated,
        }
    );
    let calls = client.calls();
    assert_eq!(calls[2], format!("update {OBJECT_HREF} sample.vcf"));
    assert_eq!(calls[3], "upload P0000001 sample.vcf 21");
}

#[test]
fn created_object_without_location_skips_upload() {
    let temp = tempfile::tempdir().unwrap();
    let mut client = FakeClient::new(ConsentStatus::Yes);
    client.location = None;
    let app = App::new(&client);

    let result = app.upload(&request(write_vcf(&temp))).unwrap();

    assert_eq!(
        result.outcome,
        UploadOutcome::MetadataOnly {
            object: ObjectWrite::Created { href: None }
        }
    );
    assert!(!client.calls().iter().any(|call| call.starts_with("upload")));
}

#[test]
fn missing_vcf_fails_before_any_write() {
    let temp = tempfile::tempdir().unwrap();
    let client = FakeClient::new(ConsentStatus::Yes);
    let app = App::new(&client);
    let missing = Utf8PathBuf::from_path_buf(temp.path().join("missing.vcf")).unwrap();

    let err = app.upload(&request(missing)).unwrap_err();

    assert_matches!(err, UploadError::VcfRead { .. });
    assert!(!client.calls().iter().any(|call| is_write(call)));
}

#[test]
fn legacy_attachment_is_removed_when_present() {
    let temp = tempfile::tempdir().unwrap();
    let mut client = FakeClient::new(ConsentStatus::Yes);
    client.legacy_present = true;
    let app = App::new(&client);
    let mut request = request(write_vcf(&temp));
    request.legacy_attachment = Some("P0000001.vcf".to_string());

    let result = app.upload(&request).unwrap();

    assert!(result.legacy_attachment_removed);
    assert_eq!(
        client.calls(),
        vec![
            "consent P0000001",
            "lookup P0000001",
            "head P0000001 P0000001.vcf",
            "delete P0000001 P0000001.vcf",
            "create P0000001 sample.vcf GRCh37",
            "upload P0000001 sample.vcf 21",
        ]
    );
}

#[test]
fn already_linked_run_leaves_legacy_attachment_alone() {
    let temp = tempfile::tempdir().unwrap();
    let mut client = FakeClient::new(ConsentStatus::Yes).with_existing("sample.vcf");
    client.legacy_present = true;
    let app = App::new(&client);
    let mut request = request(write_vcf(&temp));
    request.legacy_attachment = Some("P0000001.vcf".to_string());

    let result = app.upload(&request).unwrap();

    assert_matches!(result.outcome, UploadOutcome::AlreadyLinked { .. });
    assert!(!result.legacy_attachment_removed);
    assert_eq!(client.calls(), vec!["consent P0000001", "lookup P0000001"]);
}

#[test]
fn missing_vcf_leaves_legacy_attachment_alone() {
    let temp = tempfile::tempdir().unwrap();
    let mut client = FakeClient::new(ConsentStatus::Yes);
    client.legacy_present = true;
    let app = App::new(&client);
    let missing = Utf8PathBuf::from_path_buf(temp.path().join("gone.vcf")).unwrap();
    let mut request = request(missing);
    request.legacy_attachment = Some("P0000001.vcf".to_string());

    let err = app.upload(&request).unwrap_err();

    assert_matches!(err, UploadError::VcfRead { .. });
    assert!(
        !client
            .calls()
            .iter()
            .any(|call| call.starts_with("head") || is_write(call))
    );
}

#[test]
fn legacy_attachment_with_upload_name_is_kept() {
    let temp = tempfile::tempdir().unwrap();
    let mut client = FakeClient::new(ConsentStatus::Yes);
    client.legacy_present = true;
    let app = App::new(&client);
    let mut request = request(write_vcf(&temp));
    request.legacy_attachment = Some("sample.vcf".to_string());

    let result = app.upload(&request).unwrap();

    assert!(!result.legacy_attachment_removed);
    assert!(
        !client
            .calls()
            .iter()
            .any(|call| call.starts_with("head") || call.starts_with("delete"))
    );
}
