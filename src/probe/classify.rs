//! Pure classification of S3 responses
//!
//! Kept free of I/O so status-code and document handling can be tested
//! without a network.

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

/// What an anonymous bucket listing response says about the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListVerdict {
    /// Listing succeeded anonymously
    Listable,
    /// Bucket exists, listing denied
    Exists { code: Option<String> },
    /// No such bucket
    Missing,
    /// Bucket lives in another region
    Redirect { region: Option<String> },
    /// Throttled or server-side failure, worth retrying
    Throttled { status: u16, code: Option<String> },
    /// Anything else
    Unexpected { status: u16, code: Option<String> },
}

/// Classify the response to `GET /<bucket>?max-keys=0`
pub fn classify_list_response(status: u16, body: &str, region_header: Option<&str>) -> ListVerdict {
    let code = xml_text(body, "Code");

    match status {
        200 => ListVerdict::Listable,
        301 | 307 => {
            let region = region_header
                .map(str::to_string)
                .or_else(|| xml_text(body, "Region"))
                .or_else(|| xml_text(body, "Endpoint").and_then(|e| region_from_endpoint(&e)));
            ListVerdict::Redirect { region }
        }
        403 => ListVerdict::Exists { code },
        404 => ListVerdict::Missing,
        400 if code.as_deref() == Some("InvalidBucketName") => ListVerdict::Missing,
        429 | 500 | 502 | 503 | 504 => ListVerdict::Throttled { status, code },
        _ => ListVerdict::Unexpected { status, code },
    }
}

/// Permissions an ACL document grants to everyone (or every AWS account)
pub fn public_acl_grants(acl_xml: &str) -> Vec<String> {
    let mut grants = Vec::new();
    for grant in xml_blocks(acl_xml, "Grant") {
        let uri = xml_text(grant, "URI").unwrap_or_default();
        if uri != ALL_USERS_URI && uri != AUTHENTICATED_USERS_URI {
            continue;
        }
        if let Some(permission) = xml_text(grant, "Permission") {
            let group = if uri == ALL_USERS_URI { "AllUsers" } else { "AuthenticatedUsers" };
            let entry = format!("{}:{}", group, permission);
            if !grants.contains(&entry) {
                grants.push(entry);
            }
        }
    }
    grants
}

/// Actions an IAM bucket policy allows to any principal without conditions
pub fn public_policy_actions(policy_json: &str) -> Vec<String> {
    let Ok(policy) = serde_json::from_str::<serde_json::Value>(policy_json) else {
        return Vec::new();
    };

    let statements = match policy.get("Statement") {
        Some(serde_json::Value::Array(items)) => items.clone(),
        Some(single @ serde_json::Value::Object(_)) => vec![single.clone()],
        _ => return Vec::new(),
    };

    let mut actions = Vec::new();
    for statement in &statements {
        let allows = statement.get("Effect").and_then(|e| e.as_str()) == Some("Allow");
        let unconditioned = statement.get("Condition").is_none();
        if !allows || !unconditioned || !principal_is_public(statement.get("Principal")) {
            continue;
        }
        for action in string_or_list(statement.get("Action")) {
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
    }
    actions
}

/// `IsPublic` from a `GetBucketPolicyStatus` response
pub fn policy_status_is_public(status_xml: &str) -> bool {
    xml_text(status_xml, "IsPublic")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn principal_is_public(principal: Option<&serde_json::Value>) -> bool {
    match principal {
        Some(serde_json::Value::String(p)) => p == "*",
        Some(serde_json::Value::Object(map)) => map
            .get("AWS")
            .map(|aws| string_or_list(Some(aws)).iter().any(|p| p == "*"))
            .unwrap_or(false),
        _ => false,
    }
}

fn string_or_list(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Region named by an S3 endpoint host.
///
/// Only the labels right before `amazonaws.com` are read, so a hyphenated
/// bucket name in front never passes for a region.
fn region_from_endpoint(endpoint: &str) -> Option<String> {
    let host = endpoint.trim().trim_end_matches('.').strip_suffix(".amazonaws.com")?;
    let mut labels = host.rsplit('.');
    let last = labels.next()?;
    let previous = labels.next();

    let region = match last.strip_prefix("s3-") {
        Some(region) => region,
        None if matches!(previous, Some("s3") | Some("dualstack")) => last,
        None => return None,
    };
    match region {
        "external-1" => Some("us-east-1".to_string()),
        region if looks_like_region(region) => Some(region.to_string()),
        _ => None,
    }
}

fn looks_like_region(label: &str) -> bool {
    label.contains('-')
        && label.ends_with(|c: char| c.is_ascii_digit())
        && label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Text of the first `<tag>` element
pub fn xml_text(xml: &str, tag: &str) -> Option<String> {
    xml_blocks(xml, tag)
        .into_iter()
        .next()
        .map(|text| text.trim().to_string())
}

/// Inner content of every `<tag>...</tag>` element, in document order
pub fn xml_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find(&open) {
        let after = &rest[start + open.len()..];
        let Some(end) = after.find(&close) else {
            break;
        };
        blocks.push(&after[..end]);
        rest = &after[end + close.len()..];
    }
    blocks
}
