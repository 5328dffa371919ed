use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION, USER_AGENT};
use reqwest::{Method, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::ServerConfig;
use crate::domain::{
    AttachmentWrite, ConsentStatus, GENETIC_CONSENT_ID, PatientId, VCF_CLASS_NAME, VcfObjectRef,
    VcfProperties,
};
use crate::error::UploadError;

pub const XWIKI_NS: &str = "http://www.xwiki.org";
pub const OBJECT_LINK_REL: &str = "http://www.xwiki.org/rel/object";

const PATIENT_SPACE: [&str; 6] = ["rest", "wikis", "xwiki", "spaces", "data", "pages"];

pub trait PhenotipsClient: Send + Sync {
    fn genetic_consent(&self, patient: &PatientId) -> Result<ConsentStatus, UploadError>;
    fn find_vcf_object(&self, patient: &PatientId) -> Result<Option<VcfObjectRef>, UploadError>;
    /// Returns the `Location` of the new object, when the server sends one.
    fn create_vcf_object(
        &self,
        patient: &PatientId,
        properties: &VcfProperties,
    ) -> Result<Option<String>, UploadError>;
    fn update_vcf_object(
        &self,
        object: &VcfObjectRef,
        properties: &VcfProperties,
    ) -> Result<(), UploadError>;
    fn upload_attachment(
        &self,
        patient: &PatientId,
        name: &str,
        content: Vec<u8>,
    ) -> Result<AttachmentWrite, UploadError>;
    fn attachment_exists(&self, patient: &PatientId, name: &str) -> Result<bool, UploadError>;
    fn delete_attachment(&self, patient: &PatientId, name: &str) -> Result<(), UploadError>;
}

pub enum RequestBody {
    Empty,
    Form(Vec<(&'static str, String)>),
    Bytes {
        content_type: &'static str,
        data: Vec<u8>,
    },
}

/// Fully drained response; the connection is gone by the time this exists.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

#[derive(Clone)]
pub struct PhenotipsHttpClient {
    client: Client,
    server: ServerConfig,
}

impl PhenotipsHttpClient {
    pub fn new(server: ServerConfig) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("vcf-upload/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| UploadError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(0)
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|err| UploadError::Http(err.to_string()))?;
        Ok(Self { client, server })
    }

    /// Builds `<base>/<segments...>`, percent-encoding each segment.
    pub fn resource_url(&self, segments: &[&str]) -> Result<Url, UploadError> {
        let mut url = self.server.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UploadError::InvalidServer(self.server.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn page_url(&self, patient: &PatientId, tail: &[&str]) -> Result<Url, UploadError> {
        let mut segments: Vec<&str> = PATIENT_SPACE.to_vec();
        segments.push(patient.as_str());
        segments.extend_from_slice(tail);
        self.resource_url(&segments)
    }

    fn href_url(&self, href: &str) -> Result<Url, UploadError> {
        self.server
            .base_url
            .join(href)
            .map_err(|err| UploadError::ObjectSummaryParse(format!("invalid href {href}: {err}")))
    }

    /// One authenticated request on its own connection.
    pub fn send(
        &self,
        method: Method,
        url: Url,
        body: RequestBody,
    ) -> Result<HttpResponse, UploadError> {
        debug!(%method, %url, "PhenoTips request");
        let mut request = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, self.server.credentials.authorization_header());
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Form(pairs) => request.form(&pairs),
            RequestBody::Bytes { content_type, data } => {
                request.header(CONTENT_TYPE, content_type).body(data)
            }
        };
        let response = request
            .send()
            .map_err(|err| UploadError::Http(err.to_string()))?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let body = response
            .text()
            .map_err(|err| UploadError::Http(err.to_string()))?;
        debug!(status, "PhenoTips response");
        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }

    fn send_expecting(
        &self,
        method: Method,
        url: Url,
        body: RequestBody,
        accepted: &[u16],
    ) -> Result<HttpResponse, UploadError> {
        let method_name = method.to_string();
        let url_text = url.to_string();
        let response = self.send(method, url, body)?;
        if accepted.contains(&response.status) {
            return Ok(response);
        }
        Err(unexpected_status(&method_name, &url_text, response))
    }
}

impl PhenotipsClient for PhenotipsHttpClient {
    fn genetic_consent(&self, patient: &PatientId) -> Result<ConsentStatus, UploadError> {
        let url = self.resource_url(&["rest", "patients", patient.as_str(), "consents", ""])?;
        let response = self.send_expecting(Method::GET, url, RequestBody::Empty, &[200])?;
        parse_genetic_consent(&response.body)
    }

    fn find_vcf_object(&self, patient: &PatientId) -> Result<Option<VcfObjectRef>, UploadError> {
        let url = self.page_url(patient, &["objects", VCF_CLASS_NAME])?;
        let response = self.send_expecting(Method::GET, url, RequestBody::Empty, &[200, 500])?;
        if response.status == 500 {
            debug!(patient = %patient, "object lookup returned 500, treating as absent");
            return Ok(None);
        }
        parse_object_summary(&response.body)
    }

    fn create_vcf_object(
        &self,
        patient: &PatientId,
        properties: &VcfProperties,
    ) -> Result<Option<String>, UploadError> {
        let url = self.page_url(patient, &["objects"])?;
        let response = self.send_expecting(
            Method::POST,
            url,
            RequestBody::Form(properties.form_pairs()),
            &[201],
        )?;
        Ok(response.location)
    }

    fn update_vcf_object(
        &self,
        object: &VcfObjectRef,
        properties: &VcfProperties,
    ) -> Result<(), UploadError> {
        let url = self.href_url(&object.href)?;
        self.send_expecting(
            Method::PUT,
            url,
            RequestBody::Form(properties.form_pairs()),
            &[202],
        )?;
        Ok(())
    }

    fn upload_attachment(
        &self,
        patient: &PatientId,
        name: &str,
        content: Vec<u8>,
    ) -> Result<AttachmentWrite, UploadError> {
        let url = self.page_url(patient, &["attachments", name])?;
        let response = self.send_expecting(
            Method::PUT,
            url,
            RequestBody::Bytes {
                content_type: "text/plain",
                data: content,
            },
            &[201, 202],
        )?;
        Ok(match response.status {
            201 => AttachmentWrite::Created,
            _ => AttachmentWrite::Updated,
        })
    }

    fn attachment_exists(&self, patient: &PatientId, name: &str) -> Result<bool, UploadError> {
        let url = self.page_url(patient, &["attachments", name])?;
        let response = self.send_expecting(Method::HEAD, url, RequestBody::Empty, &[200, 500])?;
        Ok(response.status == 200)
    }

    fn delete_attachment(&self, patient: &PatientId, name: &str) -> Result<(), UploadError> {
        let url = self.page_url(patient, &["attachments", name])?;
        self.send_expecting(Method::DELETE, url, RequestBody::Empty, &[200, 204])?;
        Ok(())
    }
}

fn unexpected_status(method: &str, url: &str, response: HttpResponse) -> UploadError {
    let message = if response.body.trim().is_empty() {
        "PhenoTips request failed".to_string()
    } else {
        response.body
    };
    UploadError::UnexpectedStatus {
        method: method.to_string(),
        url: url.to_string(),
        status: response.status,
        message,
    }
}

#[derive(Debug, Deserialize)]
struct ConsentEntry {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

/// Status of the `genetic` consent; `no` when the entry is missing.
pub fn parse_genetic_consent(body: &str) -> Result<ConsentStatus, UploadError> {
    let entries: Vec<ConsentEntry> =
        serde_json::from_str(body).map_err(|err| UploadError::ConsentParse(err.to_string()))?;
    let status = entries
        .iter()
        .find(|entry| entry.id == GENETIC_CONSENT_ID)
        .and_then(|entry| entry.status.as_deref())
        .map(ConsentStatus::from)
        .unwrap_or(ConsentStatus::No);
    Ok(status)
}

/// Extracts the first `objectSummary` of an XWiki objects listing.
///
/// A summary element without child elements is reported as no object at all.
pub fn parse_object_summary(xml: &str) -> Result<Option<VcfObjectRef>, UploadError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|err| UploadError::ObjectSummaryParse(err.to_string()))?;
    let Some(summary) = doc
        .root_element()
        .children()
        .find(|node| node.has_tag_name((XWIKI_NS, "objectSummary")))
    else {
        return Ok(None);
    };
    if !summary.children().any(|node| node.is_element()) {
        return Ok(None);
    }

    let href = summary
        .children()
        .filter(|node| node.has_tag_name((XWIKI_NS, "link")))
        .find(|node| node.attribute("rel") == Some(OBJECT_LINK_REL))
        .and_then(|node| node.attribute("href"))
        .ok_or_else(|| UploadError::ObjectSummaryParse("missing object link".to_string()))?;
    let headline = summary
        .children()
        .find(|node| node.has_tag_name((XWIKI_NS, "headline")))
        .ok_or_else(|| UploadError::ObjectSummaryParse("missing headline".to_string()))?
        .text()
        .unwrap_or_default()
        .to_string();

    Ok(Some(VcfObjectRef {
        href: href.to_string(),
        headline,
    }))
}
