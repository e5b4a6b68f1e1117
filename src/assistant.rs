use std::fmt::Write;

use futures::StreamExt;
use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::profile::Profile;

pub const UNAVAILABLE_REPLY: &str =
    "Sorry, the AI assistant is not available at the moment due to a configuration issue.";
pub const ERROR_REPLY: &str = "I encountered an error. Please try asking again.";

/// System instruction for the assistant: a fixed preamble followed by the
/// profile rendered as markdown.
pub fn build_context(profile: &Profile) -> String {
    let mut context = format!(
        "You are a helpful and professional AI assistant for {name}'s personal website. \
         Your purpose is to answer questions from visitors about their skills, experience, and leadership principles. \
         You must base your answers *only* on the context provided below. Do not invent information. \
         Be concise, professional, and friendly. Use markdown for formatting like lists or bold text where appropriate.\n\n\
         --- CONTEXT ---\n\n",
        name = profile.name
    );

    context.push_str("## Introduction\n");
    for paragraph in &profile.intro {
        let _ = writeln!(context, "- {}", paragraph);
    }
    context.push('\n');

    context.push_str("## Skills & Expertise\n");
    for category in &profile.skill_categories {
        let _ = writeln!(context, "### {}", category.category);
        for skill in &category.skills {
            let _ = writeln!(context, "- **{}:** {}", skill.name, skill.description);
        }
    }
    context.push('\n');

    context.push_str("## Leadership Principles\n");
    for principle in &profile.principles {
        let _ = writeln!(context, "- **{}:** {}", principle.title, principle.description);
    }
    context.push('\n');

    context.push_str("## Work Experience\n");
    for company in &profile.work {
        let subtitle = company
            .subtitle
            .as_deref()
            .map(|s| format!(" - {}", s))
            .unwrap_or_default();
        let _ = writeln!(context, "### {}{} ({})", company.company, subtitle, company.total_duration);
        for role in &company.roles {
            let _ = writeln!(context, "- **{}** ({} | {})", role.title, role.duration, role.location);
            if !role.description.is_empty() {
                let _ = writeln!(context, "  - {}", role.description.replace('\n', "\n    "));
            }
        }
        context.push('\n');
    }

    context.push_str("\n--- END OF CONTEXT ---");
    context
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Speaker,
    pub text: String,
}

impl Message {
    fn user(text: &str) -> Self {
        Self {
            role: Speaker::User,
            text: text.to_string(),
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: Speaker::Model,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Speaker>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<Speaker>, text: &str) -> Self {
        Self {
            role,
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

/// Client for the hosted chat-completion API.
pub struct AssistantClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl AssistantClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    fn body(system: &str, history: &[Message]) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Content::text(None, system),
            contents: history
                .iter()
                .map(|message| Content::text(Some(message.role), &message.text))
                .collect(),
        }
    }

    async fn post(&self, url: &str, system: &str, history: &[Message]) -> Result<reqwest::Response> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::body(system, history))
            .send()
            .await
            .map_err(|e| FolioError::Assistant(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FolioError::Assistant(format!("chat API returned status {}", status.as_u16())));
        }
        Ok(response)
    }

    /// One complete reply.
    pub async fn generate(&self, system: &str, history: &[Message]) -> Result<String> {
        let response = self.post(&self.endpoint("generateContent"), system, history).await?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Assistant(e.to_string()))?;
        Ok(body.text())
    }

    /// A reply delivered as server-sent events. `on_chunk` sees each text
    /// fragment as it arrives; the full reply is returned at the end.
    pub async fn generate_stream<F>(&self, system: &str, history: &[Message], mut on_chunk: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(&url, system, history).await?;

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut reply = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FolioError::Assistant(e.to_string()))?;
            buffer.extend_from_slice(&chunk);
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(text) = sse_text(&String::from_utf8_lossy(&line))? {
                    reply.push_str(&text);
                    on_chunk(&text);
                }
            }
        }
        if let Some(text) = sse_text(&String::from_utf8_lossy(&buffer))? {
            reply.push_str(&text);
            on_chunk(&text);
        }

        Ok(reply)
    }
}

/// Text carried by one SSE line, if it is a non-empty `data:` event.
fn sse_text(line: &str) -> Result<Option<String>> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    let event: GenerateResponse =
        serde_json::from_str(data).map_err(|e| FolioError::Assistant(format!("malformed stream event: {}", e)))?;
    let text = event.text();
    Ok((!text.is_empty()).then_some(text))
}

/// One visitor's conversation with the assistant.
pub struct ChatSession {
    client: Option<AssistantClient>,
    system: String,
    /// What the visitor sees, greeting and fallbacks included.
    transcript: Vec<Message>,
    /// Turns sent to the API.
    history: Vec<Message>,
    streaming: bool,
}

impl ChatSession {
    pub fn new(profile: &Profile, client: Option<AssistantClient>) -> Self {
        let greeting = if client.is_some() {
            format!(
                "Hello! How can I help you learn more about {}'s experience?",
                profile.first_name()
            )
        } else {
            error!("Assistant API key is not configured");
            UNAVAILABLE_REPLY.to_string()
        };

        Self {
            client,
            system: build_context(profile),
            transcript: vec![Message::model(&greeting)],
            history: Vec::new(),
            streaming: true,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn system_instruction(&self) -> &str {
        &self.system
    }

    /// Send one visitor message. Blank messages and an unavailable session
    /// send nothing and return `None`. Otherwise the returned message is the
    /// model's reply, or the fixed apology when the call failed.
    pub async fn send<F>(&mut self, text: &str, on_chunk: F) -> Option<&Message>
    where
        F: FnMut(&str),
    {
        if text.trim().is_empty() {
            return None;
        }
        let client = self.client.as_ref()?;

        let user = Message::user(text);
        self.transcript.push(user.clone());
        self.history.push(user);

        let outcome = if self.streaming {
            client.generate_stream(&self.system, &self.history, on_chunk).await
        } else {
            client.generate(&self.system, &self.history).await
        };

        match outcome {
            Ok(reply) => {
                info!("Assistant replied with {} characters", reply.len());
                let reply = Message::model(&reply);
                self.history.push(reply.clone());
                self.transcript.push(reply);
            }
            Err(e) => {
                error!("Error sending message to assistant: {}", e);
                self.history.pop();
                self.transcript.push(Message::model(ERROR_REPLY));
            }
        }
        self.transcript.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_contains_every_section() {
        let profile = Profile::builtin().unwrap();
        let context = build_context(&profile);

        assert!(context.starts_with("You are a helpful and professional AI assistant for Aminuddin Shroff's"));
        assert!(context.contains("## Introduction\n- A results-driven"));
        assert!(context.contains("### Core Sourcing & Procurement"));
        assert!(context.contains("- **Clarity is Kindness:**"));
        assert!(context.contains("### Deloitte - India (Offices of the US) ()"));
        assert!(context.ends_with("--- END OF CONTEXT ---"));
        assert_eq!(context, build_context(&profile));
    }

    #[test]
    fn request_body_uses_api_field_names() {
        let body = AssistantClient::body("sys", &[Message::user("hi"), Message::model("hello")]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "hello");
    }

    #[test]
    fn sse_lines() {
        assert_eq!(sse_text(": keep-alive").unwrap(), None);
        assert_eq!(sse_text("data: ").unwrap(), None);
        assert_eq!(
            sse_text(r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"Hi"}]}}]}"#).unwrap(),
            Some("Hi".to_string())
        );
        assert!(sse_text("data: {oops").is_err());
    }

    #[tokio::test]
    async fn unavailable_session_refuses_sends() {
        let profile = Profile::builtin().unwrap();
        let mut session = ChatSession::new(&profile, None);
        assert!(!session.is_available());
        assert_eq!(session.transcript(), &[Message::model(UNAVAILABLE_REPLY)]);
        assert!(session.send("hello", |_| {}).await.is_none());
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn blank_message_is_ignored() {
        let profile = Profile::builtin().unwrap();
        let client = AssistantClient::new("http://127.0.0.1:9", "test-model", "key");
        let mut session = ChatSession::new(&profile, Some(client));
        assert!(session.send("   ", |_| {}).await.is_none());
        assert_eq!(
            session.transcript()[0].text,
            "Hello! How can I help you learn more about Aminuddin's experience?"
        );
        assert_eq!(session.transcript().len(), 1);
    }
}
