//! First-party client for the Effizienz API.
//!
//! Every request built through [`OriginClient`] carries a freshly minted
//! `x-app-origin` token, generated right before the request is sent.

use std::time::Duration;

use anyhow::{Context, Result};
use effizienz_server::{OriginAuthenticator, OriginError, OriginToken, ORIGIN_HEADER};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

pub struct OriginClient {
    http: reqwest::Client,
    origin: OriginAuthenticator,
    base_url: String,
}

impl OriginClient {
    pub fn new(base_url: impl Into<String>, origin: OriginAuthenticator) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            origin,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Start a request to `path`, signed for the current instant. No header
    /// is attached when the authenticator is disabled.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.http.request(method, url);

        let token = self.origin.generate();
        if token.is_empty() {
            builder
        } else {
            builder.header(ORIGIN_HEADER, token)
        }
    }

    /// Send a request with an optional JSON body and return the status and
    /// decoded body (`Value::Null` when the body is empty or not JSON).
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.request(method.clone(), path);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("{method} {path}"))?;
        let status = resp.status();
        let text = resp.text().await.context("read response body")?;
        debug!(%method, path, %status, "response received");

        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok((status, value))
    }
}

// ── Token inspection ──────────────────────────────────────────────────────────

/// What a raw token says, checked against a given authenticator.
#[derive(Debug)]
pub struct TokenReport {
    pub token: OriginToken,
    /// Milliseconds since the token was minted; negative if future-dated.
    pub age_ms: i64,
    pub verdict: Result<(), OriginError>,
}

impl TokenReport {
    pub fn age_text(&self) -> String {
        let abs = humantime::format_duration(Duration::from_millis(self.age_ms.unsigned_abs()));
        if self.age_ms < 0 {
            format!("{abs} in the future")
        } else {
            format!("{abs} ago")
        }
    }
}

pub fn inspect_token(origin: &OriginAuthenticator, raw: &str) -> Result<TokenReport> {
    let token = OriginToken::decode(raw).context("decode origin token")?;
    let age_ms = origin.now_millis().saturating_sub(token.timestamp);
    let verdict = origin.verify(Some(raw));
    Ok(TokenReport {
        token,
        age_ms,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use effizienz_server::{ManualClock, OriginMode, OriginSecret};

    const T0: i64 = 1_700_000_000_000;

    fn authenticator(clock: &ManualClock) -> OriginAuthenticator {
        OriginAuthenticator::with_clock(
            OriginMode::Enforced(OriginSecret::new("client-secret")),
            clock.clone(),
        )
    }

    #[test]
    fn inspect_reports_age_and_verdict() {
        let clock = ManualClock::new(T0);
        let origin = authenticator(&clock);
        let raw = origin.generate();

        clock.advance(Duration::from_secs(90));
        let report = inspect_token(&origin, &raw).unwrap();
        assert_eq!(report.token.timestamp, T0);
        assert_eq!(report.age_ms, 90_000);
        assert!(report.verdict.is_ok());
        assert_eq!(report.age_text(), "1m 30s ago");

        clock.advance(Duration::from_secs(300));
        let report = inspect_token(&origin, &raw).unwrap();
        assert_eq!(report.verdict, Err(OriginError::Expired));
    }

    #[test]
    fn inspect_flags_future_tokens() {
        let clock = ManualClock::new(T0);
        let origin = authenticator(&clock);
        let raw = origin.generate_at(T0 + 2_000);

        let report = inspect_token(&origin, &raw).unwrap();
        assert_eq!(report.age_ms, -2_000);
        assert_eq!(report.verdict, Err(OriginError::FutureDated));
        assert_eq!(report.age_text(), "2s in the future");
    }

    #[test]
    fn inspect_rejects_undecodable_input() {
        let clock = ManualClock::new(T0);
        assert!(inspect_token(&authenticator(&clock), "###").is_err());
    }
}
