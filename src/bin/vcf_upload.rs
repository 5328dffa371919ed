use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use phenotips_vcf_upload::app::App;
use phenotips_vcf_upload::config::{ConfigLoader, UploadArgs};
use phenotips_vcf_upload::error::UploadError;
use phenotips_vcf_upload::output::{JsonOutput, OutputMode, summary_line};
use phenotips_vcf_upload::phenotips::PhenotipsHttpClient;

#[derive(Parser)]
#[command(name = "vcf-upload")]
#[command(about = "Upload a VCF file to a PhenoTips patient record, honouring genetic consent")]
#[command(version, author)]
struct Cli {
    /// Patient record id, e.g. P0000123
    patient_id: String,

    /// Local VCF file; its basename becomes the attachment name
    vcf_path: PathBuf,

    /// File holding a single `username:password` line
    credentials_file: PathBuf,

    /// PhenoTips server as `host[:port]` or a full base URL
    server_name: String,

    /// Reference genome recorded on the VCF object
    #[arg(long, value_name = "NAME")]
    reference_genome: Option<String>,

    /// Delete this attachment from the patient page before uploading, if present
    #[arg(long, value_name = "NAME")]
    remove_legacy_attachment: Option<String>,

    /// Print the outcome as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<UploadError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &UploadError) -> u8 {
    match error {
        UploadError::InvalidPatientId(_)
        | UploadError::InvalidVcfPath(_)
        | UploadError::InvalidAttachmentName(_)
        | UploadError::VcfRead { .. } => 2,
        UploadError::Http(_)
        | UploadError::UnexpectedStatus { .. }
        | UploadError::ConsentParse(_)
        | UploadError::ObjectSummaryParse(_) => 3,
        UploadError::InvalidServer(_)
        | UploadError::CredentialsRead(_)
        | UploadError::CredentialsFormat => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let resolved = ConfigLoader::resolve(UploadArgs {
        patient_id: cli.patient_id,
        vcf_path: cli.vcf_path,
        credentials_file: cli.credentials_file,
        server: cli.server_name,
        reference_genome: cli.reference_genome,
        legacy_attachment: cli.remove_legacy_attachment,
    })?;
    tracing::debug!(
        server = %resolved.server.base_url,
        user = resolved.server.credentials.username(),
        "configuration resolved"
    );

    let client = PhenotipsHttpClient::new(resolved.server)?;
    let app = App::new(client);
    let result = app.upload(&resolved.request)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_upload(&result).into_diagnostic()?,
        OutputMode::Text => println!("{}", summary_line(&result)),
    }
    Ok(())
}
