//! AWS Signature Version 4 request signing.

use chrono::{DateTime, Utc};
use gateway_core::{ApiKey, GatewayError, GatewayResult};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// Static credentials plus the signing scope
#[derive(Clone)]
pub(crate) struct SigV4Signer {
    access_key_id: String,
    secret_access_key: ApiKey,
    session_token: Option<ApiKey>,
    region: String,
    service: &'static str,
}

impl std::fmt::Debug for SigV4Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigV4Signer")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl SigV4Signer {
    pub(crate) fn new(
        access_key_id: impl Into<String>,
        secret_access_key: ApiKey,
        session_token: Option<ApiKey>,
        region: impl Into<String>,
        service: &'static str,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key,
            session_token,
            region: region.into(),
            service,
        }
    }

    /// Add `host`, `x-amz-*` and `authorization` headers for a request.
    ///
    /// `headers` must use lowercase names; every header present is signed.
    pub(crate) fn sign(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        headers: &mut BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> GatewayResult<()> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(GatewayError::internal(format!("URL has no host: {url}"))),
        };
        let payload_hash = hex::encode(sha256_hash(body));

        headers.insert("host".to_string(), host);
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        if let Some(token) = &self.session_token {
            headers.insert("x-amz-security-token".to_string(), token.expose().to_string());
        }

        let signed_headers = headers.keys().map(String::as_str).collect::<Vec<_>>().join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();

        let canonical_request = format!(
            "{method}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            canonical_uri(url),
            url.query().unwrap_or_default(),
        );

        let credential_scope = format!(
            "{date_stamp}/{}/{}/aws4_request",
            self.region, self.service
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
            hex::encode(sha256_hash(canonical_request.as_bytes()))
        );

        let signing_key = signing_key(
            self.secret_access_key.expose(),
            &date_stamp,
            &self.region,
            self.service,
        )?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        headers.insert(
            "authorization".to_string(),
            format!(
                "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.access_key_id
            ),
        );
        Ok(())
    }
}

/// Path encoded a second time, as SigV4 requires for every service but S3
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.replace('%', "%25")
    }
}

fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> GatewayResult<[u8; 32]> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn sha256_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> GatewayResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| GatewayError::internal(format!("Invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}
