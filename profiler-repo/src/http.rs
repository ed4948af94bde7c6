use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use profiler_core::{OutputRepository, RepositoryError, SampleRecord};
use reqwest::blocking::Client as HttpClient;
use serde::Serialize;
use thiserror::Error;

// === RepositoryUrlError === //

/// Raised at construction (spec §7: "Configuration error"), mirroring
/// `pysample.client.Client.parse_url`'s validation of scheme, host, and
/// trailing project segment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepositoryUrlError {
    #[error("invalid scheme '{0}', only http(s) is supported")]
    InvalidScheme(String),

    #[error("url has no host")]
    MissingHost,

    #[error("url has no project segment; expected .../<project>")]
    MissingProject,
}

#[derive(Debug, Serialize)]
struct SamplePayload<'a> {
    sample_id: String,
    process_id: u32,
    thread_id: u64,
    timestamp: f64,
    name: &'a str,
    stack_info: &'a str,
    execution_time: u64,
}

/// `std::thread::ThreadId` has no stable numeric representation, but spec
/// §6 specifies `thread_id` as `int`. Assign each thread a small, stable
/// `u64` the first time it sends a sample, via a thread-local lazily
/// initialized from a process-wide counter.
fn numeric_thread_id() -> u64 {
    thread_local! {
        static ID: u64 = next_thread_id();
    }
    ID.with(|id| *id)
}

fn next_thread_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

// === HttpRepository === //

/// POSTs each terminated context's output to a remote collector as
/// zlib-deflated JSON (spec §6). Mirrors `pysample.client.Client` /
/// `pysample.transport.ThreadTransport`, collapsed to a single synchronous
/// send per `store` call — there is no background queue here, so a slow
/// collector is felt directly by the caller of `Sampler::end`.
pub struct HttpRepository {
    add_url: String,
    http: HttpClient,
}

impl HttpRepository {
    pub fn new(base_url: &str) -> Result<Self, RepositoryUrlError> {
        let add_url = Self::build_add_url(base_url)?;
        Ok(Self {
            add_url,
            http: HttpClient::new(),
        })
    }

    /// Splits `scheme://host[/path.../]project` into `scheme://host/path...`
    /// and `project`, then rebuilds the `.../<project>/sample/add` endpoint.
    fn build_add_url(base_url: &str) -> Result<String, RepositoryUrlError> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|_| RepositoryUrlError::InvalidScheme(base_url.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RepositoryUrlError::InvalidScheme(url.scheme().to_string()));
        }
        if url.host_str().is_none() {
            return Err(RepositoryUrlError::MissingHost);
        }

        let path = url.path().trim_end_matches('/');
        if path.is_empty() {
            return Err(RepositoryUrlError::MissingProject);
        }
        let (prefix, project) = match path.rsplit_once('/') {
            Some((prefix, project)) => (prefix, project),
            None => ("", path.trim_start_matches('/')),
        };
        if project.is_empty() || !project.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(RepositoryUrlError::MissingProject);
        }

        let origin = format!("{}://{}", url.scheme(), url.host_str().unwrap());
        let base = if prefix.is_empty() {
            origin
        } else {
            format!("{origin}{prefix}")
        };
        Ok(format!("{base}/{project}/sample/add"))
    }

    fn encode(payload: &SamplePayload) -> Result<Vec<u8>, RepositoryError> {
        let json = serde_json::to_vec(payload)
            .map_err(|err| RepositoryError(format!("failed to encode sample payload: {err}")))?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|err| RepositoryError(format!("failed to deflate sample payload: {err}")))?;
        encoder
            .finish()
            .map_err(|err| RepositoryError(format!("failed to deflate sample payload: {err}")))
    }
}

impl OutputRepository for HttpRepository {
    fn store(&self, record: &SampleRecord) -> Result<(), RepositoryError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let payload = SamplePayload {
            sample_id: record.ident.as_hex(),
            process_id: std::process::id(),
            thread_id: numeric_thread_id(),
            timestamp,
            name: &record.name,
            stack_info: &record.flame_output,
            execution_time: record.lifecycle_ms,
        };
        let body = Self::encode(&payload)?;

        self.http
            .post(&self.add_url)
            .header("Content-Encoding", "deflate")
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .map_err(|err| RepositoryError(format!("failed to send sample to {}: {err}", self.add_url)))?
            .error_for_status()
            .map_err(|err| RepositoryError(format!("collector rejected sample: {err}")))?;
        Ok(())
    }
}
