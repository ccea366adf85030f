//! S3 endpoint addressing

use reqwest::Url;

use crate::error::Result;

pub(crate) const AWS_DOMAIN: &str = "amazonaws.com";

/// Base S3 endpoint and how buckets are addressed on it.
///
/// AWS endpoints use virtual-hosted addressing and regional hosts. Dotted
/// bucket names break TLS wildcard matching there, so they fall back to
/// path style. Any other endpoint is path style on its own host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: String,
    host: String,
    aws: bool,
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| crate::config_error!("invalid endpoint '{}': {}", endpoint, e))?;
        let host = url
            .host_str()
            .ok_or_else(|| crate::config_error!("endpoint '{}' has no host", endpoint))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            aws: host.ends_with(AWS_DOMAIN),
            host,
        })
    }

    pub fn is_aws(&self) -> bool {
        self.aws
    }

    /// Service host, regional when on AWS and a region is given
    pub fn service_host(&self, region: Option<&str>) -> String {
        match region {
            Some(region) if self.aws => format!("s3.{}.{}", region, AWS_DOMAIN),
            _ => self.host.clone(),
        }
    }

    /// Host and path addressing `bucket`
    pub fn locate(&self, bucket: &str, region: Option<&str>) -> (String, String) {
        let host = self.service_host(region);
        if self.aws && !bucket.contains('.') {
            (format!("{}.{}", bucket, host), "/".to_string())
        } else {
            (host, format!("/{}", bucket))
        }
    }

    pub fn url(&self, host: &str, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}://{}{}", self.scheme, host, path)
        } else {
            format!("{}://{}{}?{}", self.scheme, host, path, query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_addressing() {
        let endpoint = Endpoint::parse("https://s3.amazonaws.com").unwrap();
        assert!(endpoint.is_aws());
        assert_eq!(
            endpoint.locate("acme", None),
            ("acme.s3.amazonaws.com".to_string(), "/".to_string())
        );
        assert_eq!(
            endpoint.locate("acme", Some("eu-west-1")),
            ("acme.s3.eu-west-1.amazonaws.com".to_string(), "/".to_string())
        );
        assert_eq!(
            endpoint.locate("acme.com", Some("eu-west-1")),
            ("s3.eu-west-1.amazonaws.com".to_string(), "/acme.com".to_string())
        );
    }

    #[test]
    fn test_custom_endpoint_keeps_host_and_port() {
        let endpoint = Endpoint::parse("http://127.0.0.1:9000").unwrap();
        assert!(!endpoint.is_aws());
        assert_eq!(endpoint.service_host(Some("eu-west-1")), "127.0.0.1:9000");
        let (host, path) = endpoint.locate("acme", None);
        assert_eq!(endpoint.url(&host, &path, "acl"), "http://127.0.0.1:9000/acme?acl");
        assert_eq!(endpoint.url(&host, "/", ""), "http://127.0.0.1:9000/");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Endpoint::parse("not a url").is_err());
    }
}
