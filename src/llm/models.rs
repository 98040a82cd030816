//! Model definitions for the OpenAI-compatible providers we talk to

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Groq,
    OpenAI,
}

impl Provider {
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Chat completions endpoint
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1/chat/completions",
            Provider::OpenAI => "https://api.openai.com/v1/chat/completions",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID
    pub id: &'static str,
    pub provider: Provider,
    /// Name sent in the request body
    pub api_name: &'static str,
}

/// Preferred default, matching the model the travel agent was tuned on
pub const DEFAULT_MODEL_ID: &str = "llama3-70b-8192";

pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "llama3-70b-8192",
            provider: Provider::Groq,
            api_name: "llama3-70b-8192",
        },
        ModelDef {
            id: "llama-3.3-70b-versatile",
            provider: Provider::Groq,
            api_name: "llama-3.3-70b-versatile",
        },
        ModelDef {
            id: "llama-3.1-8b-instant",
            provider: Provider::Groq,
            api_name: "llama-3.1-8b-instant",
        },
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            api_name: "gpt-4o",
        },
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            api_name: "gpt-4o-mini",
        },
    ]
}

pub fn find_model(id: &str) -> Option<&'static ModelDef> {
    all_models().iter().find(|m| m.id == id)
}
