use crate::app::ports::ExtractionPort;
use crate::config::LlmConfig;
use crate::constants::{OPTIONAL_KEYS, REQUIRED_KEYS};
use crate::error::{Result, ScraperError};
use crate::metrics::LLM_REQUEST_SECONDS;
use crate::parser::clean_model_output;
use crate::pipeline::RetryPolicy;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

const INSTRUCTIONS: &str = "\
You extract structured information about a single comedy event from the text of its web page.
Answer with one JSON object that follows the given schema, and nothing else.

- title: the complete title of the event
- venue: the name of the venue where the event is held
- summary: a concise description of the event (1-3 sentences)
- address: the full physical address of the venue
- email: any contact email for the event or venue; \"Not provided\" if none is given
- city: only the city name
- province: only the province name
- producers: people or organizations producing or hosting the event
- date: the date and time of the event
- price, capacity, duration, performers, age_restriction: only when stated, otherwise null

If a required field is not stated explicitly, make your best inference from the page.";

fn field_description(key: &str) -> &'static str {
    match key {
        "title" => "The title of the comedy event",
        "venue" => "The name of the venue where the event is held",
        "summary" => "A brief summary or description of the event",
        "address" => "The physical address of the venue",
        "email" => "Contact email for the event or venue",
        "city" => "The city where the event is taking place",
        "province" => "The province where the event is taking place",
        "producers" => "Individuals or organizations producing the event",
        "event_link" => "URL of the event page",
        "date" => "The date and time when the event takes place",
        "price" => "Ticket price or price range",
        "capacity" => "Number of seats or attendees",
        "duration" => "Length of the show",
        "performers" => "Comedians performing",
        "age_restriction" => "Minimum age or age policy",
        _ => "",
    }
}

/// JSON schema of an event record as sent to the model.
pub fn event_schema() -> Value {
    let mut properties = Map::new();
    for key in REQUIRED_KEYS {
        properties.insert(
            key.to_string(),
            json!({ "type": "string", "description": field_description(key) }),
        );
    }
    for key in OPTIONAL_KEYS {
        properties.insert(
            key.to_string(),
            json!({ "type": ["string", "null"], "description": field_description(key) }),
        );
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": REQUIRED_KEYS,
    })
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Token totals accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl UsageTotals {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Default)]
struct UsageCounter {
    requests: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl UsageCounter {
    fn record(&self, usage: &TokenUsage) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
    }

    fn snapshot(&self) -> UsageTotals {
        UsageTotals {
            requests: self.requests.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Extraction over an OpenAI-compatible chat completions endpoint (Groq by
/// default).
pub struct ChatCompletionsExtractor {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: f32,
    retry: RetryPolicy,
    usage: UsageCounter,
}

impl ChatCompletionsExtractor {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            retry: RetryPolicy::new(config.max_attempts),
            usage: UsageCounter::default(),
        })
    }

    pub fn usage(&self) -> UsageTotals {
        self.usage.snapshot()
    }

    pub fn log_usage(&self) {
        let usage = self.usage();
        info!(
            "🧮 LLM usage: {} requests, {} prompt tokens, {} completion tokens, {} total",
            usage.requests,
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens()
        );
    }

    fn request_body(&self, url: &str, page_content: &str) -> Value {
        let user = format!(
            "Event page URL: {url}\n\nJSON schema:\n{}\n\nPage content:\n{page_content}",
            event_schema()
        );
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": INSTRUCTIONS },
                { "role": "user", "content": user }
            ]
        })
    }

    async fn send_once(&self, api_key: &str, body: &Value) -> Result<String> {
        let started = Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        metrics::histogram!(LLM_REQUEST_SECONDS).record(started.elapsed().as_secs_f64());

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ScraperError::Api {
                status: status.as_u16(),
                message: message.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        if let Some(usage) = &parsed.usage {
            self.usage.record(usage);
        }
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ScraperError::Extraction("response had no message content".to_string()))
    }
}

#[async_trait]
impl ExtractionPort for ChatCompletionsExtractor {
    #[instrument(skip(self, page_content), fields(chars = page_content.len()))]
    async fn extract(&self, url: &str, page_content: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ScraperError::Config(format!("{} is not set", self.api_key_env))
        })?;
        let body = self.request_body(url, page_content);

        let content = self
            .retry
            .run("LLM extraction", |attempt| {
                debug!("LLM request attempt {}", attempt);
                self.send_once(api_key, &body)
            })
            .await?;
        Ok(clean_model_output(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(api_key: Option<&str>) -> ChatCompletionsExtractor {
        let mut extractor = ChatCompletionsExtractor::new(&LlmConfig::default()).unwrap();
        extractor.api_key = api_key.map(str::to_string);
        extractor
    }

    #[test]
    fn schema_requires_every_required_key() {
        let schema = event_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, REQUIRED_KEYS);
        assert_eq!(schema["properties"]["capacity"]["type"], json!(["string", "null"]));
    }

    #[test]
    fn request_asks_for_json_with_page_content() {
        let body = extractor(Some("k")).request_body("http://x/1", "Late Show at Comedy Bar");
        assert_eq!(body["response_format"]["type"], "json_object");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("http://x/1"));
        assert!(user.contains("Late Show at Comedy Bar"));
    }

    #[test]
    fn response_usage_is_accumulated() {
        let raw = r#"{
            "choices": [{ "message": { "role": "assistant", "content": "{\"title\": \"x\"}" } }],
            "usage": { "prompt_tokens": 1200, "completion_tokens": 80, "total_tokens": 1280 }
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let counter = UsageCounter::default();
        counter.record(parsed.usage.as_ref().unwrap());
        counter.record(&TokenUsage { prompt_tokens: 10, completion_tokens: 5 });

        let totals = counter.snapshot();
        assert_eq!(totals.requests, 2);
        assert_eq!(totals.total_tokens(), 1295);
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"title\": \"x\"}"));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_a_request() {
        let err = extractor(None).extract("http://x/1", "text").await.unwrap_err();
        assert!(matches!(err, ScraperError::Config(msg) if msg.contains("GROQ_API_KEY")));
    }
}
