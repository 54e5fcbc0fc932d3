//! HTTP retry with exponential backoff for the weather endpoints.
//!
//! Connection errors, timeouts, HTTP 429 and 5xx are retried; other 4xx
//! responses are permanent. Everything that cannot be recovered surfaces
//! as [`WeatherError::Unavailable`] so callers fall back to mock data.

use std::time::Duration;

use raahi_environment::WeatherError;

/// Sends the request built by `build_request` and parses the body as JSON.
///
/// The closure is called once per attempt because a
/// [`reqwest::RequestBuilder`] is consumed by `send()`.
///
/// # Errors
///
/// * [`WeatherError::Unavailable`] if every attempt fails or the server
///   returns a non-retryable status.
/// * [`WeatherError::Malformed`] if the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<serde_json::Value, WeatherError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries, base_delay).await?;
    let url = response.url().clone();
    let text = response.text().await.map_err(|e| WeatherError::Unavailable {
        message: format!("reading body from {}: {e}", redact(&url)),
    })?;

    serde_json::from_str(&text).map_err(|e| WeatherError::Malformed {
        message: format!("{} returned invalid JSON: {e}", redact(&url)),
    })
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<reqwest::Response, WeatherError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff(base_delay, attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                let transient = is_transient(&e);
                let message = e.without_url().to_string();
                if transient && attempt < max_retries {
                    log::warn!("  transient error: {message}");
                    last_error = Some(message);
                    continue;
                }
                return Err(WeatherError::Unavailable { message });
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        last_error = Some(format!("HTTP {status}"));
                        continue;
                    }
                    return Err(WeatherError::Unavailable {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                if status.is_client_error() {
                    return Err(WeatherError::Unavailable {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }

    Err(WeatherError::Unavailable {
        message: last_error.unwrap_or_else(|| "request failed after all retries".to_string()),
    })
}

/// `base * 2^(attempt - 1)`, so the first retry waits `base`.
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

/// Drops the query string, which carries the API key.
fn redact(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff(base, 1), Duration::from_millis(500));
        assert_eq!(backoff(base, 2), Duration::from_secs(1));
        assert_eq!(backoff(base, 3), Duration::from_secs(2));
    }

    #[test]
    fn redact_strips_api_key() {
        let url = reqwest::Url::parse(
            "https://api.openweathermap.org/data/2.5/weather?lat=1&lon=2&appid=secret",
        )
        .unwrap();
        let redacted = redact(&url);
        assert!(!redacted.contains("secret"));
        assert!(redacted.ends_with("/weather"));
    }
}
