//! Shipping stage: batch unique records and POST them with bounded retry.

use crossbeam_channel::{Receiver, Sender};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::errors::{PipelineError, ShipError};
use crate::pipeline::cancel::CancelToken;
use crate::types::{Credentials, FileRecord};
use crate::utils::config::{BackoffConsts, ShipperConsts};

/// Batches records and delivers them to a remote HTTP endpoint. Clone is
/// cheap and shares the batch buffer and connection pool.
///
/// Sends are sequential: the ingest thread snapshots a full batch under the
/// mutex, releases it, and performs the POST itself, so at most one send is
/// ever in flight and the lock is never held across network I/O. Terminal
/// delivery failures surface on the error channel; batch records are not
/// re-queued.
#[derive(Clone)]
pub struct ApiShipper {
    pub endpoint: String,
    pub credentials: Credentials,
    pub batch_size: usize,
    /// Retries after the first attempt; total attempts <= max_retries + 1.
    pub max_retries: u32,
    pub max_backoff: Duration,
    pub user_agent: String,

    client: Client,
    batch: Arc<Mutex<Vec<FileRecord>>>,
}

impl ApiShipper {
    pub fn new(endpoint: String, credentials: Credentials) -> ApiShipper {
        ApiShipper {
            endpoint,
            credentials,
            batch_size: ShipperConsts::DEFAULT_BATCH_SIZE,
            max_retries: ShipperConsts::DEFAULT_MAX_RETRIES,
            max_backoff: ShipperConsts::DEFAULT_MAX_BACKOFF,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            client: Client::builder()
                .timeout(ShipperConsts::HTTP_TIMEOUT)
                .build()
                .expect("default HTTP client"),
            batch: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawn the ingest thread. On input closure or cancellation any
    /// residual batch is flushed best-effort; a cancellation-time flush is
    /// not itself subject to cancellation, so buffered records still get
    /// their delivery attempt.
    pub fn ship(
        &self,
        cancel: &CancelToken,
        input: Receiver<FileRecord>,
        error_tx: Sender<PipelineError>,
    ) -> JoinHandle<()> {
        let shipper = self.clone();
        let cancel = cancel.clone();

        thread::spawn(move || {
            log::info!("Starting to process results");
            loop {
                crossbeam_channel::select! {
                    recv(cancel.signal()) -> _ => {
                        log::info!("Cancelled, flushing remaining results");
                        shipper.flush(&error_tx);
                        break;
                    }
                    recv(input) -> msg => match msg {
                        Ok(record) => shipper.append(record, &error_tx),
                        Err(_) => {
                            log::info!("Result channel closed, flushing remaining results");
                            shipper.flush(&error_tx);
                            break;
                        }
                    }
                }
            }
            // error_tx drops here; the error channel closes once the walker
            // side has finished too.
        })
    }

    /// Append one record; a full batch is snapshotted, cleared, and sent
    /// outside the lock.
    fn append(&self, record: FileRecord, error_tx: &Sender<PipelineError>) {
        let full = {
            let mut batch = self.batch.lock().unwrap();
            batch.push(record);
            if batch.len() >= self.batch_size {
                Some(std::mem::replace(
                    &mut *batch,
                    Vec::with_capacity(self.batch_size),
                ))
            } else {
                None
            }
        };
        if let Some(batch) = full {
            self.send_batch(batch, error_tx);
        }
    }

    /// Send whatever is buffered, if anything.
    fn flush(&self, error_tx: &Sender<PipelineError>) {
        let batch = std::mem::take(&mut *self.batch.lock().unwrap());
        self.send_batch(batch, error_tx);
    }

    /// Number of records currently buffered.
    pub fn pending(&self) -> usize {
        self.batch.lock().unwrap().len()
    }

    /// POST one batch with the retry policy: network errors, 5xx and 429
    /// retry with capped exponential backoff; other 4xx fail immediately.
    fn send_batch(&self, batch: Vec<FileRecord>, error_tx: &Sender<PipelineError>) {
        if batch.is_empty() {
            return;
        }

        let body = match serde_json::to_vec(&batch) {
            Ok(body) => body,
            Err(e) => {
                report_ship_error(error_tx, ShipError::Serialize(e));
                return;
            }
        };

        log::debug!("Sending batch of {} items to API", batch.len());
        let max_attempts = self.max_retries + 1;
        let mut last_err = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let jitter = rand::thread_rng()
                    .gen_range(BackoffConsts::JITTER_MIN..BackoffConsts::JITTER_MAX);
                let delay = backoff_delay(attempt, self.max_backoff, jitter);
                log::debug!(
                    "Retrying request after {:?} (attempt {}/{})",
                    delay,
                    attempt + 1,
                    max_attempts
                );
                thread::sleep(delay);
            }

            let req = self
                .client
                .post(self.endpoint.as_str())
                .header(CONTENT_TYPE, "application/json")
                .header(USER_AGENT, self.user_agent.as_str())
                .body(body.clone());

            let resp = match self.credentials.apply(req).send() {
                Ok(resp) => resp,
                Err(e) => {
                    log::debug!("HTTP request failed: {}", e);
                    last_err = Some(ShipError::Request {
                        attempts: attempt + 1,
                        max_attempts,
                        source: e,
                    });
                    continue;
                }
            };

            let status = resp.status();
            if status.is_success() {
                // Drain and discard the body so the connection can be reused.
                let _ = resp.bytes();
                return;
            }

            let mut snippet = resp
                .text()
                .unwrap_or_else(|_| String::from("[error reading response body]"));
            snippet.truncate(ShipperConsts::ERROR_BODY_LIMIT);
            last_err = Some(ShipError::Status {
                attempts: attempt + 1,
                max_attempts,
                status: status.as_u16(),
                body: snippet,
            });

            // Client errors other than 429 are not retryable.
            if status.is_client_error() && status.as_u16() != 429 {
                break;
            }
        }

        if let Some(err) = last_err {
            report_ship_error(error_tx, err);
        }
    }
}

/// Retry delay for attempt `n` (n >= 1): `min(base * 2^n * jitter,
/// max_backoff)`. The jitter factor is passed in so tests can pin it.
pub fn backoff_delay(attempt: u32, max_backoff: Duration, jitter: f64) -> Duration {
    let scaled = BackoffConsts::BASE_MS as f64 * 2f64.powi(attempt as i32) * jitter;
    Duration::from_millis(scaled as u64).min(max_backoff)
}

/// Non-blocking error report; a full channel drops the error with a log.
fn report_ship_error(error_tx: &Sender<PipelineError>, err: ShipError) {
    let err = PipelineError::Api(err);
    if let Err(crossbeam_channel::TrySendError::Full(err)) = error_tx.try_send(err) {
        log::warn!("Error channel full, dropping API error: {}", err);
    }
}
