//! Native-account mode - signed S3 calls against the caller's own buckets

mod client;
mod sigv4;

pub use client::{AccountScanner, OwnedBucket, PublicBuckets};
pub use sigv4::{canonical_query, uri_encode, Credentials, SigV4Signer, EMPTY_PAYLOAD_SHA256};
