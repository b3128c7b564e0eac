// In crates/advisor/src/chat.rs

use crate::parser::parse_plan;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::{Error, PlanAdvisor, Result};
use app_config::types::ModelEndpoint;
use async_trait::async_trait;
use core_types::{TradePlan, TradeSignal};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize, Debug)]
struct ChatReply {
    content: Option<String>,
}

/// An advisor backed by an OpenAI-compatible `POST /chat/completions` endpoint.
///
/// The same type serves the hosted primary model and a local fallback; only
/// the endpoint and the label differ.
#[derive(Debug, Clone)]
pub struct ChatCompletionAdvisor {
    http_client: Client,
    endpoint: ModelEndpoint,
    label: &'static str,
}

impl ChatCompletionAdvisor {
    pub fn new(endpoint: ModelEndpoint, label: &'static str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;
        Ok(Self { http_client, endpoint, label })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PlanAdvisor for ChatCompletionAdvisor {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn refine(&self, signal: &TradeSignal, context: &str) -> Result<TradePlan> {
        let prompt = build_prompt(signal, context);
        let body = ChatRequest {
            model: &self.endpoint.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: self.endpoint.temperature,
        };

        let mut request = self.http_client.post(self.url()).json(&body);
        if let Some(key) = &self.endpoint.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http { status: status.as_u16(), body });
        }

        let reply: ChatResponse = serde_json::from_str(&response.text().await?)?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(Error::EmptyReply)?;

        tracing::debug!(advisor = self.label, symbol = %signal.symbol, %content, "Advisor replied.");
        parse_plan(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Side, SignalSource, Symbol};
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    fn signal() -> TradeSignal {
        TradeSignal {
            symbol: Symbol::from("AAPL"),
            side: Side::Buy,
            entry_price: dec!(50),
            stop_guess: Some(dec!(48)),
            target_guess: Some(dec!(56)),
            reason: "breakout".into(),
            source: SignalSource::Technical,
        }
    }

    fn advisor(url: &str) -> ChatCompletionAdvisor {
        let endpoint = ModelEndpoint {
            base_url: url.into(),
            model: "gpt-4o-mini".into(),
            api_key: Some("sk-test".into()),
            temperature: Some(0.0),
        };
        ChatCompletionAdvisor::new(endpoint, "primary", Duration::from_secs(5)).unwrap()
    }

    fn completion(content: &str) -> String {
        serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
            .to_string()
    }

    #[tokio::test]
    async fn refines_a_signal_into_a_plan() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({ "model": "gpt-4o-mini" })))
            .with_body(completion(
                "```json\n{\"symbol\":\"AAPL\",\"side\":\"buy\",\"stop\":47.5,\"target\":58,\"confidence\":0.8,\"reason\":\"ok\"}\n```",
            ))
            .create_async()
            .await;

        let plan = advisor(&server.url()).refine(&signal(), "").await.unwrap();
        assert_eq!(plan.stop, Some(dec!(47.5)));
        assert_eq!(plan.target, Some(dec!(58)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_errors_yield_no_plan() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = advisor(&server.url()).refine(&signal(), "").await.unwrap_err();
        assert!(matches!(err, Error::Http { status: 429, .. }));
    }

    #[tokio::test]
    async fn prose_reply_yields_no_plan() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_body(completion("Looks good, buy it."))
            .create_async()
            .await;

        assert!(advisor(&server.url()).refine(&signal(), "").await.is_err());
    }
}
