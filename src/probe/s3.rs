//! Anonymous S3 probe

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;

use super::classify::{
    classify_list_response, public_acl_grants, public_policy_actions, xml_text, ListVerdict,
};
use super::{BucketProbe, Endpoint};
use crate::error::{BucketForgeError, Result};
use crate::types::{Outcome, ProbeResult, ScanConfig};

pub(crate) const REGION_HEADER: &str = "x-amz-bucket-region";

/// Raw response of a single request
#[derive(Debug)]
struct Fetched {
    status: u16,
    body: String,
    region: Option<String>,
}

/// Probes buckets with unsigned requests against an S3 endpoint.
///
/// Per candidate: list with `max-keys=0`, then read `?acl` when listing is
/// open or `?policy` when it is denied. A regional redirect is followed once.
pub struct S3Probe {
    client: Client,
    endpoint: Endpoint,
    timeout: Duration,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl S3Probe {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bucket-forge/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(config.concurrency)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| crate::config_error!("failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint,
            timeout: config.timeout,
            retry_attempts: config.retry_attempts,
            retry_backoff: config.retry_backoff,
        })
    }

    /// URL for `bucket` with a bare query string such as `acl`
    pub fn bucket_url(&self, bucket: &str, query: &str, region: Option<&str>) -> String {
        let (host, path) = self.endpoint.locate(bucket, region);
        self.endpoint.url(&host, &path, query)
    }

    async fn fetch(&self, url: &str) -> Result<Fetched> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status().as_u16();
        let region = response
            .headers()
            .get(REGION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| self.request_error(e))?;

        Ok(Fetched { status, body, region })
    }

    /// Fetch with bounded retries on throttling, server errors and timeouts.
    /// Returns the last outcome and the number of attempts made.
    async fn fetch_with_retry(&self, url: &str) -> (Result<Fetched>, u32) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.fetch(url).await;

            let retry = match &result {
                Ok(fetched) => is_retryable_status(fetched.status),
                Err(e) => e.is_retryable(),
            };
            if !retry || attempt > self.retry_attempts {
                return (result, attempt);
            }

            let delay = backoff_delay(self.retry_backoff, attempt - 1);
            tracing::debug!("Retrying {} in {:?} (attempt {})", url, delay, attempt);
            tokio::time::sleep(delay).await;
        }
    }

    fn request_error(&self, err: reqwest::Error) -> BucketForgeError {
        if err.is_timeout() {
            BucketForgeError::timeout("S3 probe", self.timeout.as_secs())
        } else {
            BucketForgeError::from(err)
        }
    }

    /// Read a bucket subresource such as `?acl` once listing has been classified.
    ///
    /// `Ok(None)` when access is denied or the document does not exist. Throttling,
    /// timeouts and unexpected statuses are errors.
    async fn read_subresource(
        &self,
        name: &str,
        query: &str,
        region: Option<&str>,
    ) -> (Result<Option<String>>, u32) {
        let url = self.bucket_url(name, query, region);
        let (fetched, attempts) = self.fetch_with_retry(&url).await;

        let document = fetched.and_then(|doc| match doc.status {
            200 => Ok(Some(doc.body)),
            403 | 404 | 405 => Ok(None),
            status => {
                let message = match xml_text(&doc.body, "Code") {
                    Some(code) => format!("HTTP {} {} reading ?{}", status, code, query),
                    None => format!("HTTP {} reading ?{}", status, query),
                };
                Err(BucketForgeError::probe(name, message, Some(status)))
            }
        });
        (document, attempts)
    }

    async fn probe_at(&self, name: &str, region: Option<&str>, redirected: bool) -> Step {
        let url = self.bucket_url(name, "max-keys=0", region);
        let (listed, mut attempts) = self.fetch_with_retry(&url).await;

        let listed = match listed {
            Ok(listed) => listed,
            Err(e) => {
                return Step::Done(
                    transient(name, e.to_string())
                        .with_attempts(attempts)
                        .with_redirect(redirected),
                );
            }
        };

        let bucket_region = listed
            .region
            .clone()
            .or_else(|| region.map(str::to_string));
        let verdict =
            classify_list_response(listed.status, &listed.body, listed.region.as_deref());

        let result = match verdict {
            ListVerdict::Listable => {
                let (acl, extra) = self.read_subresource(name, "acl", region).await;
                attempts += extra;
                match acl {
                    Ok(doc) => {
                        let grants = doc.map(|body| public_acl_grants(&body)).unwrap_or_default();
                        if grants.is_empty() {
                            ProbeResult::new(name, Outcome::PublicPolicy)
                                .with_detail("anonymous listing allowed")
                        } else {
                            ProbeResult::new(name, Outcome::PublicAcl)
                                .with_detail(grants.join(", "))
                        }
                    }
                    Err(e) => transient(name, e.to_string()),
                }
            }
            ListVerdict::Exists { code } => {
                let (policy, extra) = self.read_subresource(name, "policy", region).await;
                attempts += extra;
                match policy {
                    Ok(doc) => {
                        let actions =
                            doc.map(|body| public_policy_actions(&body)).unwrap_or_default();
                        if actions.is_empty() {
                            ProbeResult::new(name, Outcome::Private)
                                .with_detail(code.unwrap_or_else(|| "AccessDenied".to_string()))
                        } else {
                            ProbeResult::new(name, Outcome::PublicPolicy)
                                .with_detail(actions.join(", "))
                        }
                    }
                    Err(e) => transient(name, e.to_string()),
                }
            }
            ListVerdict::Missing => ProbeResult::new(name, Outcome::NotFound),
            ListVerdict::Redirect { region: Some(target) } => {
                return Step::Redirect { region: target, attempts };
            }
            ListVerdict::Redirect { region: None } => transient(name, "redirect without a region"),
            ListVerdict::Throttled { status, code } | ListVerdict::Unexpected { status, code } => {
                let detail = match code {
                    Some(code) => format!("HTTP {} {}", status, code),
                    None => format!("HTTP {}", status),
                };
                transient(name, detail)
            }
        };

        Step::Done(
            result
                .with_region(bucket_region)
                .with_attempts(attempts)
                .with_redirect(redirected),
        )
    }
}

fn transient(name: &str, detail: impl Into<String>) -> ProbeResult {
    ProbeResult::new(name, Outcome::TransientError).with_detail(detail)
}

/// Result of one pass against one regional endpoint
enum Step {
    Done(ProbeResult),
    Redirect { region: String, attempts: u32 },
}

#[async_trait]
impl BucketProbe for S3Probe {
    async fn probe(&self, name: &str) -> ProbeResult {
        let (region, first_attempts) = match self.probe_at(name, None, false).await {
            Step::Done(result) => return result,
            Step::Redirect { region, attempts } => (region, attempts),
        };

        tracing::debug!("{} lives in {}, re-probing", name, region);
        match self.probe_at(name, Some(&region), true).await {
            Step::Done(result) => {
                let attempts = result.attempts + first_attempts;
                result.with_attempts(attempts)
            }
            Step::Redirect { region: again, attempts } => {
                transient(name, format!("redirected again to {}", again))
                    .with_region(Some(region))
                    .with_attempts(attempts + first_attempts)
                    .with_redirect(true)
            }
        }
    }

    fn provider(&self) -> &'static str {
        "s3"
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff with up to 50% jitter: `base * 2^attempt + rand(0..=base*2^attempt/2)`
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1u32 << attempt.min(16));
    let jitter_ms = (exp.as_millis() / 2) as u64;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    };
    exp + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{route, StubServer};
    use std::collections::HashMap;

    fn probe_for(endpoint: &str) -> S3Probe {
        let config = ScanConfig {
            endpoint: endpoint.to_string(),
            timeout: Duration::from_secs(5),
            retry_attempts: 2,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        S3Probe::new(&config).unwrap()
    }

    #[test]
    fn test_virtual_hosted_urls() {
        let probe = probe_for("https://s3.amazonaws.com");
        assert_eq!(
            probe.bucket_url("acme-backup", "max-keys=0", None),
            "https://acme-backup.s3.amazonaws.com/?max-keys=0"
        );
        assert_eq!(
            probe.bucket_url("acme-backup", "acl", Some("eu-west-1")),
            "https://acme-backup.s3.eu-west-1.amazonaws.com/?acl"
        );
    }

    #[test]
    fn test_dotted_and_custom_endpoints_use_path_style() {
        let probe = probe_for("https://s3.amazonaws.com");
        assert_eq!(
            probe.bucket_url("acme.com", "policy", None),
            "https://s3.amazonaws.com/acme.com?policy"
        );

        let probe = probe_for("http://localhost:9000");
        assert_eq!(
            probe.bucket_url("acme", "acl", Some("eu-west-1")),
            "http://localhost:9000/acme?acl"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let config = ScanConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        let err = S3Probe::new(&config).err().unwrap();
        assert!(matches!(err, BucketForgeError::Config { .. }));
    }

    #[test]
    fn test_backoff_grows_with_bounded_jitter() {
        let base = Duration::from_millis(100);
        for attempt in 0..4 {
            let exp = base * (1 << attempt);
            let delay = backoff_delay(base, attempt);
            assert!(delay >= exp);
            assert!(delay <= exp + exp / 2);
        }
        assert_eq!(backoff_delay(Duration::ZERO, 3), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_probe_outcomes() {
        let acl = r#"<AccessControlPolicy><AccessControlList><Grant><Grantee><URI>http://acs.amazonaws.com/groups/global/AllUsers</URI></Grantee><Permission>READ</Permission></Grant></AccessControlList></AccessControlPolicy>"#;
        let policy = r#"{"Statement":[{"Effect":"Allow","Principal":"*","Action":"s3:GetObject"}]}"#;

        let mut routes = HashMap::new();
        routes.insert("/open-acl?max-keys=0".to_string(), route(200, "<ListBucketResult/>"));
        routes.insert("/open-acl?acl".to_string(), route(200, acl));
        routes.insert("/open-list?max-keys=0".to_string(), route(200, "<ListBucketResult/>"));
        routes.insert("/open-list?acl".to_string(), route(403, "<Error><Code>AccessDenied</Code></Error>"));
        routes.insert("/open-policy?max-keys=0".to_string(), route(403, "<Error><Code>AccessDenied</Code></Error>"));
        routes.insert("/open-policy?policy".to_string(), route(200, policy));
        routes.insert("/locked?max-keys=0".to_string(), route(403, "<Error><Code>AccessDenied</Code></Error>"));
        routes.insert("/locked?policy".to_string(), route(403, "<Error><Code>AccessDenied</Code></Error>"));

        let server = StubServer::start(routes).await;
        let probe = probe_for(&server.endpoint);

        assert_eq!(probe.probe("open-acl").await.outcome, Outcome::PublicAcl);
        assert_eq!(probe.probe("open-list").await.outcome, Outcome::PublicPolicy);

        let result = probe.probe("open-policy").await;
        assert_eq!(result.outcome, Outcome::PublicPolicy);
        assert_eq!(result.detail.as_deref(), Some("s3:GetObject"));

        let result = probe.probe("locked").await;
        assert_eq!(result.outcome, Outcome::Private);
        assert_eq!(result.detail.as_deref(), Some("AccessDenied"));

        assert_eq!(probe.probe("missing").await.outcome, Outcome::NotFound);
    }

    #[tokio::test]
    async fn test_throttling_retries_then_gives_up() {
        let mut routes = HashMap::new();
        routes.insert(
            "/busy?max-keys=0".to_string(),
            route(503, "<Error><Code>SlowDown</Code></Error>"),
        );
        let server = StubServer::start(routes).await;
        let probe = probe_for(&server.endpoint);

        let result = probe.probe("busy").await;
        assert_eq!(result.outcome, Outcome::TransientError);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.detail.as_deref(), Some("HTTP 503 SlowDown"));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_throttled_acl_read_is_transient() {
        let mut routes = HashMap::new();
        routes.insert("/open?max-keys=0".to_string(), route(200, "<ListBucketResult/>"));
        routes.insert("/open?acl".to_string(), route(503, "<Error><Code>SlowDown</Code></Error>"));
        let server = StubServer::start(routes).await;
        let probe = probe_for(&server.endpoint);

        let result = probe.probe("open").await;
        assert_eq!(result.outcome, Outcome::TransientError);
        assert!(result.detail.unwrap().contains("HTTP 503 SlowDown reading ?acl"));
        assert_eq!(result.attempts, 4);
        assert_eq!(server.hits(), 4);
    }

    #[tokio::test]
    async fn test_failed_policy_read_is_not_private() {
        let mut routes = HashMap::new();
        routes.insert("/locked?max-keys=0".to_string(), route(403, "<Error><Code>AccessDenied</Code></Error>"));
        routes.insert("/locked?policy".to_string(), route(503, "<Error><Code>SlowDown</Code></Error>"));
        routes.insert("/odd?max-keys=0".to_string(), route(403, "<Error><Code>AccessDenied</Code></Error>"));
        routes.insert("/odd?policy".to_string(), route(400, "<Error><Code>InvalidRequest</Code></Error>"));
        let server = StubServer::start(routes).await;
        let probe = probe_for(&server.endpoint);

        let result = probe.probe("locked").await;
        assert_eq!(result.outcome, Outcome::TransientError);
        assert_eq!(result.attempts, 4);

        let result = probe.probe("odd").await;
        assert_eq!(result.outcome, Outcome::TransientError);
        assert_eq!(result.attempts, 2);
        assert!(result.detail.unwrap().contains("InvalidRequest"));
    }

    #[tokio::test]
    async fn test_redirect_without_region_is_transient() {
        let mut routes = HashMap::new();
        routes.insert("/moved?max-keys=0".to_string(), route(301, "<Error><Code>PermanentRedirect</Code></Error>"));
        let server = StubServer::start(routes).await;
        let probe = probe_for(&server.endpoint);

        let result = probe.probe("moved").await;
        assert_eq!(result.outcome, Outcome::TransientError);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_redirect_followed_once() {
        let mut routes = HashMap::new();
        routes.insert(
            "/moved?max-keys=0".to_string(),
            (
                301,
                vec![(REGION_HEADER, "eu-west-1".to_string())],
                "<Error><Code>PermanentRedirect</Code></Error>".to_string(),
            ),
        );
        let server = StubServer::start(routes).await;
        let probe = probe_for(&server.endpoint);

        // Custom endpoints keep their host, so the second attempt is redirected again
        let result = probe.probe("moved").await;
        assert_eq!(result.outcome, Outcome::TransientError);
        assert!(result.redirected);
        assert_eq!(result.attempts, 2);
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = probe_for(&format!("http://{}", addr));
        let result = probe.probe("anything").await;
        assert_eq!(result.outcome, Outcome::TransientError);
        assert_eq!(result.attempts, 3);
    }
}
