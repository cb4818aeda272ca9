//! Connection string parsing and HMAC-SHA256 request signing for Azure
//! Communication Services.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use comms_core::CommsError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::{macros::format_description, OffsetDateTime, UtcOffset};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Endpoint and access key extracted from an ACS connection string
/// (`endpoint=https://<resource>.communication.azure.com/;accesskey=<base64>`).
#[derive(Clone)]
pub struct AcsCredential {
    endpoint: Url,
    access_key: Vec<u8>,
}

impl AcsCredential {
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build an absolute request URL from a resource path and api-version.
    pub fn url(&self, path: &str, api_version: &str) -> Result<Url, CommsError> {
        let raw = format!(
            "{}/{}?api-version={}",
            self.endpoint.as_str().trim_end_matches('/'),
            path.trim_start_matches('/'),
            api_version
        );
        Url::parse(&raw).map_err(|e| CommsError::Invalid(format!("request url {raw}: {e}")))
    }

    /// Sign a request at the given instant.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        now: OffsetDateTime,
    ) -> Result<SignedHeaders, CommsError> {
        let date = http_date(now)?;
        let content_hash = content_hash(body);
        let to_sign = string_to_sign(method, url, &date, &content_hash);

        let mut mac = HmacSha256::new_from_slice(&self.access_key)
            .map_err(|e| CommsError::Auth(format!("access key: {e}")))?;
        mac.update(to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(SignedHeaders {
            date,
            content_hash,
            authorization: format!(
                "HMAC-SHA256 SignedHeaders=x-ms-date;host;x-ms-content-sha256&Signature={signature}"
            ),
        })
    }
}

impl fmt::Debug for AcsCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcsCredential")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_key", &"<redacted>")
            .finish()
    }
}

impl FromStr for AcsCredential {
    type Err = CommsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut access_key = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                CommsError::Invalid(format!("connection string segment without '=': {part}"))
            })?;
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim()),
                "accesskey" => access_key = Some(value.trim()),
                _ => {}
            }
        }

        let endpoint = endpoint
            .ok_or_else(|| CommsError::Invalid("connection string has no endpoint".into()))?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CommsError::Invalid(format!("endpoint {endpoint}: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
            return Err(CommsError::Invalid(format!(
                "endpoint must be an http(s) url: {endpoint}"
            )));
        }

        let access_key = access_key
            .ok_or_else(|| CommsError::Invalid("connection string has no accesskey".into()))?;
        let access_key = STANDARD
            .decode(access_key)
            .map_err(|e| CommsError::Auth(format!("accesskey is not valid base64: {e}")))?;
        if access_key.is_empty() {
            return Err(CommsError::Auth("accesskey is empty".into()));
        }

        Ok(Self {
            endpoint,
            access_key,
        })
    }
}

/// Headers produced by [`AcsCredential::sign`].
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub date: String,
    pub content_hash: String,
    pub authorization: String,
}

/// RFC 1123 date, always in GMT.
pub(crate) fn http_date(now: OffsetDateTime) -> Result<String, CommsError> {
    now.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ))
        .map_err(|e| CommsError::Unexpected(format!("date format: {e}")))
}

fn content_hash(body: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(body))
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn string_to_sign(method: &str, url: &Url, date: &str, content_hash: &str) -> String {
    let path_and_query = match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    };
    format!(
        "{}\n{}\n{};{};{}",
        method.to_ascii_uppercase(),
        path_and_query,
        date,
        host_header(url),
        content_hash
    )
}
