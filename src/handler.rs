use bytes::Bytes;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::{debug, error, info, warn, Span};

use crate::generator::{GenerateError, PointGenerator};
use crate::record::BuildRecord;
use crate::sink::PointSink;

#[derive(Debug)]
pub enum HandleError {
    Decompress(String),
    Decode(String),
    Generate(GenerateError),
    SendFailed(String),
}

impl std::fmt::Display for HandleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleError::Decompress(e) => write!(f, "decompress error: {}", e),
            HandleError::Decode(e) => write!(f, "decode error: {}", e),
            HandleError::Generate(e) => write!(f, "generate error: {}", e),
            HandleError::SendFailed(e) => write!(f, "send failed: {}", e),
        }
    }
}

impl std::error::Error for HandleError {}

#[derive(Debug, serde::Serialize)]
pub struct HandleResponse {
    pub status: &'static str,
    pub points: usize,
}

impl HandleResponse {
    pub fn sent(points: usize) -> Self {
        Self {
            status: "ok",
            points,
        }
    }
}

/// Upper bound on a build event body, before or after inflating
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn too_large(size: usize) -> HandleError {
    warn!(size, limit = MAX_BODY_BYTES, "build event body too large");
    HandleError::Decompress(format!(
        "body larger than {} MiB",
        MAX_BODY_BYTES / (1024 * 1024)
    ))
}

/// Inflate a gzip body, reading at most one byte past the limit
fn gunzip(compressed: &[u8]) -> Result<Vec<u8>, HandleError> {
    let mut inflated = Vec::new();
    GzDecoder::new(compressed)
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut inflated)
        .map_err(|e| {
            warn!(error = %e, "gzip body could not be inflated");
            HandleError::Decompress(format!("invalid gzip body: {}", e))
        })?;
    if inflated.len() > MAX_BODY_BYTES {
        return Err(too_large(inflated.len()));
    }
    Ok(inflated)
}

/// Return the JSON bytes of a request body, inflating it when gzipped
pub(crate) fn request_payload(body: Bytes, is_gzipped: bool) -> Result<Bytes, HandleError> {
    if !is_gzipped {
        if body.len() > MAX_BODY_BYTES {
            return Err(too_large(body.len()));
        }
        return Ok(body);
    }
    let inflated = gunzip(&body)?;
    debug!(
        compressed = body.len(),
        inflated = inflated.len(),
        "inflated gzip body"
    );
    Ok(Bytes::from(inflated))
}

/// Decode a JSON build record
pub fn decode_record(body: &[u8]) -> Result<BuildRecord, HandleError> {
    serde_json::from_slice(body).map_err(|e| {
        error!(error = %e, "failed to decode build record");
        HandleError::Decode(e.to_string())
    })
}

/// Run one build event through the generator and hand the points to the sink.
///
/// A generator failure drops the event: it is logged and returned, and
/// nothing reaches the sink.
#[tracing::instrument(
    name = "build_event",
    skip(body, generator, sink),
    fields(
        gzipped = is_gzipped,
        job = tracing::field::Empty,
        build = tracing::field::Empty,
        points = tracing::field::Empty,
    )
)]
pub async fn handle_build_event<G, S>(
    body: Bytes,
    is_gzipped: bool,
    generator: &G,
    sink: &S,
) -> Result<HandleResponse, HandleError>
where
    G: PointGenerator + ?Sized,
    S: PointSink + ?Sized,
{
    debug!(body_size = body.len(), is_gzipped, "handling build event");

    let body = request_payload(body, is_gzipped)?;
    let record = decode_record(&body)?;

    Span::current().record("job", record.job_name.as_str());
    Span::current().record("build", record.build_number);

    let points = generator.generate(&record).map_err(|e| {
        warn!(
            job = %record.job_name,
            build = record.build_number,
            error = %e,
            "dropping build event"
        );
        HandleError::Generate(e)
    })?;

    Span::current().record("points", points.len());

    let result = sink.send_points(points).await;
    if !result.failed.is_empty() {
        for err in &result.failed {
            warn!(error = %err, "point write failed");
        }
        return Err(HandleError::SendFailed(result.failed.join("; ")));
    }

    info!(
        job = %record.job_name,
        build = record.build_number,
        points = result.sent,
        "build event complete"
    );

    Ok(HandleResponse::sent(result.sent))
}
