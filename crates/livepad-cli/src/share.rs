use anyhow::{Context, Result, anyhow};
use livepad_core::ShareLinks;
use reqwest::blocking::Client;
use std::time::Duration;

/// Exchanges a long link for a short one through a form-POST shortener that
/// answers with the short URL as plain text.
pub(crate) struct Shortener {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Shortener {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn shorten(&self, long_url: &str) -> Result<String> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("failed to build HTTP client")?;

        let response = client
            .post(&self.endpoint)
            .form(&[("url", long_url)])
            .send()
            .with_context(|| format!("failed calling shortener {}", self.endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .unwrap_or_else(|_| "<unavailable>".to_string());
            return Err(anyhow!("shortener request failed ({status}): {body}"));
        }

        let short = response
            .text()
            .context("failed reading shortener response")?;
        let short = short.trim();
        if short.is_empty() {
            return Err(anyhow!("shortener returned an empty response"));
        }
        Ok(short.to_string())
    }
}

/// The lines `livepad share` prints. With `preview_only` only the preview link
/// is kept.
pub(crate) fn share_lines(
    links: &ShareLinks,
    preview_only: bool,
    shortener: Option<&Shortener>,
) -> Vec<String> {
    let mut targets = Vec::new();
    if !preview_only {
        targets.push(links.view.as_str());
    }
    targets.push(links.preview.as_str());

    targets
        .into_iter()
        .map(|long| match shortener {
            Some(shortener) => match shortener.shorten(long) {
                Ok(short) => short,
                Err(err) => {
                    eprintln!("[livepad] warning: could not shorten link: {err:#}");
                    long.to_string()
                }
            },
            None => long.to_string(),
        })
        .collect()
}
