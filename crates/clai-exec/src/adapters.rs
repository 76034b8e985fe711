use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;

use crate::contracts::CommandModel;
use crate::contracts::PlatformContext;
use crate::error::ExecError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

static CODE_FENCE: OnceLock<Option<Regex>> = OnceLock::new();

fn code_fence() -> Option<&'static Regex> {
    CODE_FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\n?(.*?)```").ok())
        .as_ref()
}

fn build_command_prompt(context: &PlatformContext) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You translate natural-language requests into shell commands.\n\
Reply with the command only: no explanation, no instructions, no markdown.\n\
The command will run on this system:\n",
    );
    prompt.push_str("OS: ");
    prompt.push_str(&context.os);
    prompt.push_str("\nARCH: ");
    prompt.push_str(&context.arch);
    prompt.push_str("\nCURRENT_DATE: ");
    prompt.push_str(&context.current_date);
    prompt.push_str(
        "\n\nExample:\n\
USER: how to list files?\n\
ASSISTANT: ls -la",
    );
    prompt
}

const EXPLAIN_PROMPT: &str = "You explain shell commands. You receive one command and reply with \
an explanation of it, nothing else. Keep it short and simple. Use a markdown list where each item \
covers one piece of the command or one of its arguments.";

/// Strips the markdown wrapping models tend to add around a bare command.
pub fn sanitize_command(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = code_fence()
        .and_then(|fence| fence.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str())
        .trim();
    let unquoted = inner
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
        .unwrap_or(inner);
    unquoted.trim().to_string()
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiModel {
    client: Client,
    model: String,
    base_url: String,
    api_key_env: String,
}

impl OpenAiModel {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Result<Self, ExecError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            model: model.into(),
            base_url: base_url.into(),
            api_key_env: api_key_env.into(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// The key is looked up on every call so a key exported after startup works.
    fn api_key(&self) -> Result<String, ExecError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ExecError::MissingCredential(self.api_key_env.clone()))
    }

    fn complete(&self, system: &str, user: &str) -> Result<String, ExecError> {
        let api_key = self.api_key()?;
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        tracing::debug!(model = %self.model, url = %self.completions_url(), "sending chat completion");
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .unwrap_or_else(|_| "failed to read error body".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body_text)
                .map(|wrapper| wrapper.error.message)
                .unwrap_or(body_text);
            tracing::warn!(status = status.as_u16(), "chat completion rejected");
            return Err(ExecError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ExecError::EmptyResponse)
    }
}

impl CommandModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate_command(
        &self,
        prompt: &str,
        context: &PlatformContext,
    ) -> Result<String, ExecError> {
        let raw = self.complete(&build_command_prompt(context), prompt)?;
        let command = sanitize_command(&raw);
        if command.is_empty() {
            return Err(ExecError::EmptyResponse);
        }
        Ok(command)
    }

    fn explain_command(&self, command: &str) -> Result<String, ExecError> {
        self.complete(EXPLAIN_PROMPT, command)
            .map(|text| text.trim().to_string())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
