use crate::scrapers::ScrapeError;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Backoff before retry `attempt` (0-based): 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: usize) -> Duration {
    let secs = 1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX);
    Duration::from_secs(secs)
}

/// Fetch a page body with bounded retries and exponential backoff.
///
/// Every failure mode (connect error, timeout, non-2xx status, body read
/// error) is retried the same way; after `max_attempts` the last error is
/// surfaced as [`ScrapeError::Fetch`].
pub async fn fetch_page(
    client: &Client,
    url: &str,
    max_attempts: usize,
) -> Result<String, ScrapeError> {
    let max_attempts = max_attempts.max(1);
    let mut last_error: Option<reqwest::Error> = None;

    for attempt in 0..max_attempts {
        let result = match client.get(url).send().await {
            Ok(response) => match response.error_for_status() {
                Ok(response) => response.text().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(body) => return Ok(body),
            Err(e) => {
                if attempt + 1 < max_attempts {
                    let wait = backoff_delay(attempt);
                    warn!(
                        "Fetch attempt {} of {} for {} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        max_attempts,
                        url,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(ScrapeError::Fetch {
        url: url.to_string(),
        attempts: max_attempts,
        source: last_error.expect("retry loop always records an error before exiting"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn unreachable_host_exhausts_attempts() {
        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        // Reserved TEST-NET-1 address; nothing listens there.
        let err = fetch_page(&client, "http://192.0.2.1:9/", 1).await.unwrap_err();
        match err {
            ScrapeError::Fetch { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }
}
