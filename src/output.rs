use std::io::{self, Write};

use serde::Serialize;

use crate::app::{UploadOutcome, UploadResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_upload(result: &UploadResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// One-line human summary of an upload run.
pub fn summary_line(result: &UploadResult) -> String {
    let patient = &result.patient_id;
    let file = &result.filename;
    let mut line = match &result.outcome {
        UploadOutcome::ConsentNotGranted { consent } => {
            format!("{patient}: genetic consent is '{consent}', {file} not uploaded")
        }
        UploadOutcome::AlreadyLinked { object } => {
            format!("{patient}: {file} already linked ({})", object.href)
        }
        UploadOutcome::MetadataOnly { object } => format!(
            "{patient}: VCF object {} for {file}, attachment skipped (no object link returned)",
            object.action()
        ),
        UploadOutcome::Uploaded { object, attachment } => {
            format!(
                "{patient}: VCF object {}, attachment {file} {attachment}",
                object.action()
            )
        }
    };
    if result.legacy_attachment_removed {
        line.push_str(" (legacy attachment removed)");
    }
    line
}
