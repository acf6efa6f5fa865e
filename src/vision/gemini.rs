use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{VisionError, VisionProvider, success_body};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct Gemini {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl Gemini {
    pub const fn new(client: Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    fn url(&self) -> String {
        format!("{ENDPOINT}/{}:generateContent", self.model)
    }
}

/// Concatenated text parts of the first candidate.
fn reply_text(body: &str) -> Result<String, VisionError> {
    let response: Response =
        serde_json::from_str(body).map_err(|_| VisionError::malformed(body))?;
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .filter(|t| !t.trim().is_empty());
    text.ok_or_else(|| VisionError::malformed(body))
}

#[async_trait]
impl VisionProvider for Gemini {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str, png: &[u8]) -> Result<String, VisionError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": "image/png", "data": STANDARD.encode(png) } },
                ],
            }],
            "generationConfig": { "temperature": 0 },
        });

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        reply_text(&success_body(self.name(), response).await?)
    }
}
