// Normalize -> assemble -> invoke -> recover, one request at a time

use crate::prompt::{assemble, build_prompt};
use crate::recovery::recover;
use crate::request::{AnalysisRequest, RequestError, normalize};
use crate::verdict::Verdict;
use phishwatch_model::{ModelClient, ModelError, PromptPayload};
use serde_json::Value;
use thiserror::Error;
use tracing::{Instrument, Span, info, info_span, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0}")]
    Rejected(#[from] RequestError),

    #[error("{0}")]
    Invocation(#[from] ModelError),
}

impl AnalysisError {
    /// Whether the caller is at fault (bad input) rather than the upstream model
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::Rejected(_))
    }
}

/// Run the full pipeline on an untyped request body.
pub async fn analyze(client: &dyn ModelClient, raw: &Value) -> Result<Verdict, AnalysisError> {
    let request = normalize(raw)?;
    analyze_request(client, &request).await
}

/// Run the pipeline on an already-validated request.
pub async fn analyze_request(
    client: &dyn ModelClient,
    request: &AnalysisRequest,
) -> Result<Verdict, AnalysisError> {
    let span = info_span!("analyze", request_id = %Uuid::new_v4(), url = %request.url);

    async move {
        let payload = assemble_blocking(request).await;
        let raw_text = client.generate(&payload).await?;
        let verdict = recover(&raw_text);

        info!(
            risk_score = ?verdict.risk_score,
            risk_label = verdict.risk_label.map(|label| label.as_str()).unwrap_or("-"),
            fallback = verdict.is_fallback(),
            "Analysis complete"
        );
        Ok(verdict)
    }
    .instrument(span)
    .await
}

/// Screenshot decoding is CPU-bound, so it runs off the async workers.
async fn assemble_blocking(request: &AnalysisRequest) -> PromptPayload {
    let owned = request.clone();
    let span = Span::current();
    match tokio::task::spawn_blocking(move || span.in_scope(|| assemble(&owned))).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Screenshot processing task failed, continuing text-only");
            PromptPayload::new(build_prompt(request))
        }
    }
}
