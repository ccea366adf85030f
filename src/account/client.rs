//! Authenticated enumeration of the caller's own buckets

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;

use super::sigv4::SigV4Signer;
use crate::error::{BucketForgeError, Result};
use crate::probe::classify::{policy_status_is_public, public_acl_grants, xml_blocks, xml_text};
use crate::probe::Endpoint;
use crate::types::ScanConfig;

const PAGE_SIZE: &str = "1000";

/// Buckets of the account that are publicly reachable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublicBuckets {
    /// Public through an ACL grant
    pub acl: Vec<String>,
    /// Public through the bucket policy
    pub policy: Vec<String>,
}

impl PublicBuckets {
    pub fn total(&self) -> usize {
        self.acl.len() + self.policy.len()
    }
}

/// One entry of `ListBuckets`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedBucket {
    pub name: String,
    pub region: Option<String>,
}

/// Lists the account's buckets and checks each one's ACL and policy status
pub struct AccountScanner {
    client: Client,
    signer: SigV4Signer,
    endpoint: Endpoint,
}

impl AccountScanner {
    pub fn new(signer: SigV4Signer, config: &ScanConfig) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bucket-forge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::config_error!("failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            signer,
            endpoint,
        })
    }

    /// Every bucket the credentials can see, following continuation tokens
    pub async fn list_buckets(&self) -> Result<Vec<OwnedBucket>> {
        let host = self.endpoint.service_host(Some(self.signer.region()));
        let mut buckets = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = vec![("max-buckets", PAGE_SIZE)];
            if let Some(token) = token.as_deref() {
                query.push(("continuation-token", token));
            }

            let (status, body) = self.signed_get(&host, "/", &query).await?;
            if status != 200 {
                return Err(api_error("ListBuckets", status, &body));
            }

            for entry in xml_blocks(&body, "Bucket") {
                if let Some(name) = xml_text(entry, "Name") {
                    buckets.push(OwnedBucket {
                        name,
                        region: xml_text(entry, "BucketRegion"),
                    });
                }
            }

            token = xml_text(&body, "ContinuationToken").filter(|t| !t.is_empty());
            if token.is_none() {
                break;
            }
        }

        tracing::debug!(count = buckets.len(), "Listed account buckets");
        Ok(buckets)
    }

    /// Public grants in the bucket's ACL
    pub async fn bucket_acl_grants(&self, bucket: &OwnedBucket) -> Result<Vec<String>> {
        let (host, path) = self.locate(bucket);
        let (status, body) = self.signed_get(&host, &path, &[("acl", "")]).await?;
        if status != 200 {
            return Err(api_error("GetBucketAcl", status, &body));
        }
        Ok(public_acl_grants(&body))
    }

    /// Whether the bucket policy makes the bucket public
    pub async fn policy_is_public(&self, bucket: &OwnedBucket) -> Result<bool> {
        let (host, path) = self.locate(bucket);
        let (status, body) = self.signed_get(&host, &path, &[("policyStatus", "")]).await?;
        match status {
            200 => Ok(policy_status_is_public(&body)),
            404 if xml_text(&body, "Code").as_deref() == Some("NoSuchBucketPolicy") => Ok(false),
            _ => Err(api_error("GetBucketPolicyStatus", status, &body)),
        }
    }

    /// Check every bucket; per-bucket failures are logged and skipped
    pub async fn scan(&self) -> Result<PublicBuckets> {
        let mut found = PublicBuckets::default();

        for bucket in self.list_buckets().await? {
            match self.bucket_acl_grants(&bucket).await {
                Ok(grants) if !grants.is_empty() => {
                    tracing::info!(bucket = %bucket.name, grants = %grants.join(", "), "S3 public bucket (ACL)");
                    found.acl.push(bucket.name.clone());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(bucket = %bucket.name, "Skipping ACL check: {}", e),
            }

            match self.policy_is_public(&bucket).await {
                Ok(true) => {
                    tracing::info!(bucket = %bucket.name, "S3 public bucket (Policy)");
                    found.policy.push(bucket.name.clone());
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(bucket = %bucket.name, "Skipping policy check: {}", e),
            }
        }

        Ok(found)
    }

    fn locate(&self, bucket: &OwnedBucket) -> (String, String) {
        let region = bucket.region.as_deref().unwrap_or(self.signer.region());
        self.endpoint.locate(&bucket.name, Some(region))
    }

    async fn signed_get(&self, host: &str, path: &str, query: &[(&str, &str)]) -> Result<(u16, String)> {
        let headers = self.signer.sign("GET", host, path, query, Utc::now())?;
        let query_string = query
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    super::sigv4::uri_encode(k, true)
                } else {
                    format!("{}={}", super::sigv4::uri_encode(k, true), super::sigv4::uri_encode(v, true))
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        let url = self.endpoint.url(host, path, &query_string);

        let mut request = self.client.get(&url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

fn api_error(operation: &str, status: u16, body: &str) -> BucketForgeError {
    let code = xml_text(body, "Code").unwrap_or_else(|| "unknown".to_string());
    BucketForgeError::network(
        format!("{} failed with {}", operation, code),
        Some(status),
        None,
    )
}
