//! Boundary to the image-recognition service.
//!
//! The pipeline only sees [`RecognitionClient`]; [`FixtureClient`] replays
//! recorded service responses and [`RetryingClient`] adds the retry policy.

mod fixture;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::RecognitionConfig;
use crate::error::ServiceError;
use crate::models::{Label, TextDetection};

pub use fixture::{parse_labels, parse_text, FixtureClient};

pub trait RecognitionClient: Send + Sync {
    /// Labels found in `image` (encoded image bytes), at most `max_labels`
    fn detect_labels(&self, image: &[u8], max_labels: usize) -> Result<Vec<Label>, ServiceError>;

    /// Text lines and words found in `image`
    fn detect_text(&self, image: &[u8]) -> Result<Vec<TextDetection>, ServiceError>;
}

impl<C: RecognitionClient + ?Sized> RecognitionClient for Arc<C> {
    fn detect_labels(&self, image: &[u8], max_labels: usize) -> Result<Vec<Label>, ServiceError> {
        (**self).detect_labels(image, max_labels)
    }

    fn detect_text(&self, image: &[u8]) -> Result<Vec<TextDetection>, ServiceError> {
        (**self).detect_text(image)
    }
}

/// Retries transient failures of the wrapped client with exponential backoff
pub struct RetryingClient<C> {
    inner: C,
    config: RecognitionConfig,
}

impl<C: RecognitionClient> RetryingClient<C> {
    pub fn new(inner: C, config: RecognitionConfig) -> Self {
        Self { inner, config }
    }

    fn with_retry<T>(
        &self,
        operation: &str,
        mut call: impl FnMut(&C) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call(&self.inner) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Recognition call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        ?delay,
                        "Retrying recognition call"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<C: RecognitionClient> RecognitionClient for RetryingClient<C> {
    fn detect_labels(&self, image: &[u8], max_labels: usize) -> Result<Vec<Label>, ServiceError> {
        self.with_retry("detect_labels", |client| client.detect_labels(image, max_labels))
    }

    fn detect_text(&self, image: &[u8]) -> Result<Vec<TextDetection>, ServiceError> {
        self.with_retry("detect_text", |client| client.detect_text(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails with the queued errors, then succeeds
    struct Flaky {
        failures: Mutex<Vec<ServiceError>>,
        calls: Mutex<u32>,
    }

    impl Flaky {
        fn new(failures: Vec<ServiceError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }

        fn next(&self) -> Result<(), ServiceError> {
            *self.calls.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok(())
            } else {
                Err(failures.remove(0))
            }
        }
    }

    impl RecognitionClient for Flaky {
        fn detect_labels(
            &self,
            _image: &[u8],
            _max_labels: usize,
        ) -> Result<Vec<Label>, ServiceError> {
            self.next().map(|_| vec![Label::new("Cat", 99.0)])
        }

        fn detect_text(&self, _image: &[u8]) -> Result<Vec<TextDetection>, ServiceError> {
            self.next().map(|_| Vec::new())
        }
    }

    fn no_delay(max_attempts: u32) -> RecognitionConfig {
        RecognitionConfig::new()
            .with_max_attempts(max_attempts)
            .with_delays(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn transient_failures_are_retried() {
        let flaky = Arc::new(Flaky::new(vec![
            ServiceError::Throttled("rate".into()),
            ServiceError::Network("reset".into()),
        ]));
        let client = RetryingClient::new(flaky.clone(), no_delay(5));
        let labels = client.detect_labels(b"img", 10).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(flaky.calls(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let failures = (0..5).map(|_| ServiceError::Network("down".into())).collect();
        let flaky = Arc::new(Flaky::new(failures));
        let client = RetryingClient::new(flaky.clone(), no_delay(3));
        let err = client.detect_text(b"img").unwrap_err();
        assert!(matches!(err, ServiceError::Network(_)));
        assert_eq!(flaky.calls(), 3);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let flaky = Arc::new(Flaky::new(vec![ServiceError::Auth("denied".into())]));
        let client = RetryingClient::new(flaky.clone(), no_delay(10));
        assert!(matches!(client.detect_labels(b"img", 10), Err(ServiceError::Auth(_))));
        assert_eq!(flaky.calls(), 1);
    }

    #[test]
    fn zero_attempts_still_calls_once() {
        let flaky = Arc::new(Flaky::new(vec![]));
        let client = RetryingClient::new(flaky.clone(), no_delay(0));
        assert!(client.detect_text(b"img").is_ok());
        assert_eq!(flaky.calls(), 1);
    }
}
