use serde::{Deserialize, Serialize};

use super::strip_code_fences;
use crate::error::{Error, Result};
use crate::storage::repository::{self, StoredNarrative};
use crate::storage::Database;
use crate::summary::SummaryResponse;

const PROMPT_VERSION: &str = "narrative-v1";

/// AI-polished rendition of a generated summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiNarrative {
    pub headline: String,
    pub narrative: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl From<StoredNarrative> for AiNarrative {
    fn from(stored: StoredNarrative) -> Self {
        Self {
            headline: stored.headline,
            narrative: stored.narrative,
            key_points: stored.key_points,
        }
    }
}

/// Ask the agent to rewrite a generated summary as a short executive
/// narrative. Results are cached per period and reused unless `force` or the
/// report differs from the one the cached narrative was written from.
pub async fn polish_summary(
    db: &Database,
    agent: &mixtape_core::Agent,
    period_key: &str,
    response: &SummaryResponse,
    force: bool,
) -> Result<AiNarrative> {
    let report = report_json(response)?;
    if !force {
        if let Some(cached) = get_cached(db, period_key, &report).await? {
            log::debug!("using cached narrative for {period_key}");
            return Ok(cached);
        }
    }

    let prompt = build_prompt(period_key, &report);
    let reply = agent.run(&prompt).await.map_err(|e| Error::Llm(e.to_string()))?;
    let narrative = parse_narrative(reply.text())?;

    store(db, period_key, &report, &narrative).await?;
    log::info!("generated narrative for {period_key}");
    Ok(narrative)
}

/// The summary as the model sees it: without raw processing data or the
/// generation timestamp, so identical reports serialize identically.
pub fn report_json(response: &SummaryResponse) -> Result<String> {
    let mut value = serde_json::to_value(response)?;
    if let Some(fields) = value.as_object_mut() {
        fields.remove("raw_data");
        fields.remove("generated_at");
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn build_prompt(period_key: &str, summary_json: &str) -> String {
    format!(
        r#"You are writing an executive update on team activity for the period {period_key}.
Rewrite the generated report below into a concise narrative for leadership.
Do not invent numbers; use only the figures in the report.

Report:
{summary_json}

Respond with ONLY a JSON object (no markdown, no code fences):
{{
  "headline": "One-sentence executive summary",
  "narrative": "One or two short paragraphs covering progress, risks and next steps",
  "key_points": ["list of 3-5 points leadership should take away"]
}}"#
    )
}

pub fn parse_narrative(text: &str) -> Result<AiNarrative> {
    let text = text.trim();
    serde_json::from_str(strip_code_fences(text))
        .map_err(|e| Error::Llm(format!("Failed to parse LLM response: {e}\nResponse: {text}")))
}

async fn get_cached(db: &Database, period_key: &str, report: &str) -> Result<Option<AiNarrative>> {
    let key = period_key.to_string();
    let stored = db
        .reader()
        .call(move |conn| repository::get_cached_narrative(conn, &key, PROMPT_VERSION))
        .await?;
    match stored {
        Some(stored) if stored.input == report => Ok(Some(stored.into())),
        Some(_) => {
            log::debug!("cached narrative for {period_key} was written from a different report");
            Ok(None)
        }
        None => Ok(None),
    }
}

async fn store(
    db: &Database,
    period_key: &str,
    report: &str,
    narrative: &AiNarrative,
) -> Result<()> {
    let period_key = period_key.to_string();
    let report = report.to_string();
    let narrative = narrative.clone();
    db.writer()
        .call(move |conn| {
            repository::store_narrative(
                conn,
                &period_key,
                PROMPT_VERSION,
                &narrative.headline,
                &narrative.narrative,
                &narrative.key_points,
                &report,
            )
        })
        .await?;
    Ok(())
}
