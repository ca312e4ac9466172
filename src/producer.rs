//! NATS publisher for scoring outcomes

use crate::types::ScoreOutcome;
use anyhow::Result;
use async_nats::Client;
use tracing::{debug, error};

/// Publishes scored transactions to the audit subject.
#[derive(Clone)]
pub struct OutcomePublisher {
    client: Client,
    subject: String,
}

impl OutcomePublisher {
    /// Create a new outcome publisher
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Connect to `url` and publish on `subject`.
    pub async fn connect(url: &str, subject: &str) -> Result<Self> {
        let client = async_nats::connect(url).await?;
        Ok(Self::new(client, subject))
    }

    /// Publish one outcome and flush it to the server.
    pub async fn publish(&self, outcome: &ScoreOutcome) -> Result<()> {
        let payload = serde_json::to_vec(outcome)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;
        self.client.flush().await?;

        debug!(
            outcome_id = %outcome.outcome_id,
            verdict = ?outcome.verdict,
            probability = outcome.probability,
            "Published score outcome"
        );

        Ok(())
    }

    /// Fire-and-forget: failures are logged, never returned.
    pub async fn report(&self, outcome: &ScoreOutcome) {
        if let Err(e) = self.publish(outcome).await {
            error!(
                outcome_id = %outcome.outcome_id,
                subject = %self.subject,
                error = %e,
                "Failed to publish score outcome"
            );
        }
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
