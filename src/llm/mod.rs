pub mod classify;
pub mod client;
pub mod gemini;
pub mod openai;

pub use client::GenerationClient;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    /// Thinking tokens the provider may spend before answering.
    pub reasoning_budget: u32,
    /// Analysis mode label, used for span attributes only.
    pub stage: String,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
}

/// A single text-generation backend. The credential is passed per call so the
/// client can refuse to reach the network when it is missing.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(
        &self,
        credential: &str,
        req: &GenerateRequest,
    ) -> anyhow::Result<GenerateResponse>;

    fn name(&self) -> &str;

    fn server_address(&self) -> &str;
}
