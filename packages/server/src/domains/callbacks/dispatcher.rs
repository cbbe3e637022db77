//! Callback delivery with bounded retries.
//!
//! Delivery outcome is audited as a `callback_delivery` event either way;
//! a failed callback never changes the job's terminal status.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use sqlx::PgPool;

use crate::config::Config;
use crate::domains::jobs::repository::log_job_event;
use crate::domains::jobs::{EventLevel, Job, JobStatus};

#[derive(Clone)]
pub struct CallbackDispatcher {
    client: reqwest::Client,
    max_retries: u32,
}

impl CallbackDispatcher {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.callback_timeout_seconds))
            .build()
            .context("build callback http client")?;

        Ok(Self {
            client,
            max_retries: config.callback_max_retries,
        })
    }

    fn backoff_delay(attempt: u32) -> Duration {
        Duration::from_secs_f64((1.5 * attempt as f64).min(3.0))
    }

    /// POST the payload, retrying on non-2xx and transport errors. Returns
    /// whether delivery eventually succeeded plus a detail string for audit.
    pub async fn deliver(&self, callback_url: &str, payload: &serde_json::Value) -> (bool, String) {
        let attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.client.post(callback_url).json(payload).send().await {
                Ok(response) if response.status().is_success() => {
                    return (true, format!("status={}", response.status()));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let body: String = body.chars().take(200).collect();
                    last_error = format!("status={status} body={body}");
                }
                Err(err) => {
                    last_error = err.to_string();
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Self::backoff_delay(attempt)).await;
            }
        }

        tracing::warn!(url = %callback_url, error = %last_error, "callback delivery failed");
        (false, last_error)
    }
}

/// Notify the registered callback about a terminal transition.
pub async fn notify_terminal(
    pool: &PgPool,
    dispatcher: &CallbackDispatcher,
    job: &Job,
    final_status: JobStatus,
    qa_report: Option<&serde_json::Value>,
    output_uri: Option<&str>,
) -> Result<()> {
    let Some(callback_url) = job.callback_url() else {
        return Ok(());
    };

    let payload = json!({
        "job_id": job.id,
        "status": final_status.as_str(),
        "instruction": job.instruction,
        "capability": job.capability,
        "output_uri": output_uri.map(str::to_string).or_else(|| job.output_uri.clone()),
        "latest_qa_score": job.latest_qa_score,
        "qa_report": qa_report.cloned().unwrap_or_else(|| json!({})),
    });

    let (ok, detail) = dispatcher.deliver(&callback_url, &payload).await;
    log_job_event(
        pool,
        Some(job.id),
        "callback_delivery",
        if ok { EventLevel::Info } else { EventLevel::Warning },
        if ok {
            "Callback delivered"
        } else {
            "Callback delivery failed"
        },
        json!({
            "callback_url": callback_url,
            "detail": detail,
            "status": final_status.as_str(),
        }),
    )
    .await?;

    Ok(())
}

/// Notify the registered callback about a manual-review decision.
pub async fn notify_review_decision(
    pool: &PgPool,
    dispatcher: &CallbackDispatcher,
    job: &Job,
) -> Result<()> {
    let Some(callback_url) = job.callback_url() else {
        return Ok(());
    };

    let payload = json!({
        "job_id": job.id,
        "status": job.status.as_str(),
        "source": "manual_review",
        "instruction": job.instruction,
        "output_uri": job.output_uri,
        "latest_qa_score": job.latest_qa_score,
    });

    let (ok, detail) = dispatcher.deliver(&callback_url, &payload).await;
    log_job_event(
        pool,
        Some(job.id),
        "callback_delivery",
        if ok { EventLevel::Info } else { EventLevel::Warning },
        if ok {
            "Callback delivered"
        } else {
            "Callback delivery failed"
        },
        json!({
            "callback_url": callback_url,
            "detail": detail,
            "status": job.status.as_str(),
        }),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_then_caps_at_three_seconds() {
        assert_eq!(
            CallbackDispatcher::backoff_delay(1),
            Duration::from_secs_f64(1.5)
        );
        assert_eq!(
            CallbackDispatcher::backoff_delay(2),
            Duration::from_secs_f64(3.0)
        );
        assert_eq!(
            CallbackDispatcher::backoff_delay(5),
            Duration::from_secs_f64(3.0)
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_failure_detail() {
        let mut config = Config::for_tests();
        config.callback_max_retries = 0;
        config.callback_timeout_seconds = 0.2;
        let dispatcher = CallbackDispatcher::from_config(&config).unwrap();

        let (ok, detail) = dispatcher
            .deliver("http://127.0.0.1:9/callback", &json!({ "job_id": "x" }))
            .await;
        assert!(!ok);
        assert!(!detail.is_empty());
    }
}
