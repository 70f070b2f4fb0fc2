pub mod narrative;

use crate::error::{Error, Result};
use crate::storage::repository;
use crate::storage::Database;

pub const DEFAULT_PROVIDER: &str = "bedrock";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Bedrock,
    Anthropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChoice {
    Sonnet,
    Haiku,
}

/// Map the `llm_provider` / `llm_model` config values onto a supported
/// combination. Unknown model names fall back to Sonnet.
pub fn resolve_model(provider: &str, model: &str) -> Result<(Provider, ModelChoice)> {
    let provider = match provider.trim().to_ascii_lowercase().as_str() {
        "bedrock" => Provider::Bedrock,
        "anthropic" => Provider::Anthropic,
        other => return Err(Error::Config(format!("unknown llm_provider: {other}"))),
    };
    let model = match model.trim() {
        "claude-haiku-4-5" | "haiku" => ModelChoice::Haiku,
        "claude-sonnet-4-5" | "sonnet" => ModelChoice::Sonnet,
        other => {
            log::warn!("unrecognized llm_model '{other}', using {DEFAULT_MODEL}");
            ModelChoice::Sonnet
        }
    };
    Ok((provider, model))
}

/// Create a mixtape Agent configured from the database's LLM settings.
pub async fn create_agent(db: &Database) -> Result<mixtape_core::Agent> {
    let (provider, model) = db
        .reader()
        .call(|conn| {
            let provider = repository::get_config(conn, "llm_provider")?;
            let model = repository::get_config(conn, "llm_model")?;
            Ok::<(Option<String>, Option<String>), rusqlite::Error>((provider, model))
        })
        .await?;

    let (provider, model) = resolve_model(
        provider.as_deref().unwrap_or(DEFAULT_PROVIDER),
        model.as_deref().unwrap_or(DEFAULT_MODEL),
    )?;
    log::debug!("building {model:?} agent via {provider:?}");
    build_agent(provider, model).await
}

async fn build_agent(provider: Provider, model: ModelChoice) -> Result<mixtape_core::Agent> {
    // Each combination needs its own builder call since the model types are different.
    match (provider, model) {
        (Provider::Bedrock, ModelChoice::Haiku) => {
            mixtape_core::Agent::builder()
                .bedrock(mixtape_core::ClaudeHaiku4_5)
                .build()
                .await
                .map_err(|e| Error::Llm(e.to_string()))
        }
        (Provider::Bedrock, ModelChoice::Sonnet) => {
            mixtape_core::Agent::builder()
                .bedrock(mixtape_core::ClaudeSonnet4_5)
                .build()
                .await
                .map_err(|e| Error::Llm(e.to_string()))
        }
        (Provider::Anthropic, ModelChoice::Haiku) => {
            mixtape_core::Agent::builder()
                .anthropic_from_env(mixtape_core::ClaudeHaiku4_5)
                .build()
                .await
                .map_err(|e| Error::Llm(e.to_string()))
        }
        (Provider::Anthropic, ModelChoice::Sonnet) => {
            mixtape_core::Agent::builder()
                .anthropic_from_env(mixtape_core::ClaudeSonnet4_5)
                .build()
                .await
                .map_err(|e| Error::Llm(e.to_string()))
        }
    }
}

/// Remove a surrounding markdown code fence (with or without a `json` tag)
/// from a model response.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model() {
        assert_eq!(
            resolve_model("bedrock", "claude-sonnet-4-5").unwrap(),
            (Provider::Bedrock, ModelChoice::Sonnet)
        );
        assert_eq!(
            resolve_model("Anthropic", "haiku").unwrap(),
            (Provider::Anthropic, ModelChoice::Haiku)
        );
        assert_eq!(
            resolve_model("bedrock", "gpt-9").unwrap(),
            (Provider::Bedrock, ModelChoice::Sonnet)
        );
        assert!(matches!(resolve_model("openai", "haiku"), Err(Error::Config(_))));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{}"), "{}");
    }
}
