use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose};

use crate::error::UploadError;

/// `username:password` pair used for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads the first line of `path`.
    pub fn load(path: &Path) -> Result<Self, UploadError> {
        let content = fs::read_to_string(path)
            .map_err(|_| UploadError::CredentialsRead(path.to_path_buf()))?;
        content.parse()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn authorization_header(&self) -> String {
        let token =
            general_purpose::STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl FromStr for Credentials {
    type Err = UploadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let line = value.lines().next().unwrap_or_default().trim_end();
        let (username, password) = line
            .split_once(':')
            .ok_or(UploadError::CredentialsFormat)?;
        if username.trim().is_empty() {
            return Err(UploadError::CredentialsFormat);
        }
        Ok(Self::new(username, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
