//! Shared test fixtures and helpers.

use ember_core::FileName;
use ember_storage::ByteStream;
use futures::StreamExt;
use std::time::Duration;

/// Parse a known-good file name.
#[allow(dead_code)]
pub fn name(s: &str) -> FileName {
    FileName::new(s).expect("test name should be valid")
}

/// Drain a blob stream into a single buffer.
#[allow(dead_code)]
pub async fn collect_stream(mut stream: ByteStream) -> Vec<u8> {
    let mut collected = Vec::new();
    while let Some(chunk) = stream.next().await {
        collected.extend_from_slice(&chunk.expect("stream chunk should be readable"));
    }
    collected
}

/// Poll a condition until it holds or the deadline passes.
#[allow(dead_code)]
pub async fn wait_until<F, Fut>(deadline: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let end = tokio::time::Instant::now() + deadline;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() > end {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Multipart form boundary used by the request builders.
#[allow(dead_code)]
pub const BOUNDARY: &str = "ember-test-boundary";

/// Build a multipart upload body with the standard form fields.
#[allow(dead_code)]
pub fn multipart_body(
    name: &str,
    filename: &str,
    content: &[u8],
    life: Option<i64>,
    quota: Option<i64>,
) -> Vec<u8> {
    let mut body = Vec::new();

    let mut text_field = |field: &str, value: &str| {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    };

    text_field("name", name);
    if let Some(life) = life {
        text_field("life", &life.to_string());
    }
    if let Some(quota) = quota {
        text_field("quota", &quota.to_string());
    }

    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    body
}
