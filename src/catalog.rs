//! Static model registry.
//!
//! Maps a model id to its vendor and capability flags. Pure lookup, no state.

use serde::{Deserialize, Serialize};

/// Vendor a model belongs to. One `ProviderAdapter` exists per vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    OpenAi,
    Anthropic,
    Google,
    Cohere,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Anthropic => "anthropic",
            Vendor::Google => "google",
            Vendor::Cohere => "cohere",
        }
    }
}

/// Entry in the static model catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub vendor: Vendor,
    pub supports_vision: bool,
}

/// Models selectable for a comparison run.
pub const AVAILABLE_MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "gpt-4o",
        display_name: "GPT-4o",
        vendor: Vendor::OpenAi,
        supports_vision: true,
    },
    ModelDescriptor {
        id: "gpt-4-turbo",
        display_name: "GPT-4 Turbo",
        vendor: Vendor::OpenAi,
        supports_vision: true,
    },
    ModelDescriptor {
        id: "gpt-3.5-turbo",
        display_name: "GPT-3.5 Turbo",
        vendor: Vendor::OpenAi,
        supports_vision: false,
    },
    ModelDescriptor {
        id: "claude-3-5-sonnet-20241022",
        display_name: "Claude 3.5 Sonnet",
        vendor: Vendor::Anthropic,
        supports_vision: true,
    },
    ModelDescriptor {
        id: "claude-3-opus-20240229",
        display_name: "Claude 3 Opus",
        vendor: Vendor::Anthropic,
        supports_vision: true,
    },
    ModelDescriptor {
        id: "claude-3-haiku-20240307",
        display_name: "Claude 3 Haiku",
        vendor: Vendor::Anthropic,
        supports_vision: true,
    },
    ModelDescriptor {
        id: "gemini-1.5-pro",
        display_name: "Gemini 1.5 Pro",
        vendor: Vendor::Google,
        supports_vision: true,
    },
    ModelDescriptor {
        id: "gemini-1.5-flash",
        display_name: "Gemini 1.5 Flash",
        vendor: Vendor::Google,
        supports_vision: true,
    },
    ModelDescriptor {
        id: "command-r-plus",
        display_name: "Command R+",
        vendor: Vendor::Cohere,
        supports_vision: false,
    },
];

/// The fixed model that issues the final ranking, independent of which models
/// were compared.
pub const ARBITER_MODEL: &str = "gemini-1.5-pro";

/// Vendor of the arbiter model.
pub const ARBITER_VENDOR: Vendor = Vendor::Google;

/// Look up a model by id. Unknown ids return `None`; callers skip them.
pub fn find(id: &str) -> Option<&'static ModelDescriptor> {
    AVAILABLE_MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_known_model() {
        let m = find("gpt-4o").unwrap();
        assert_eq!(m.vendor, Vendor::OpenAi);
        assert!(m.supports_vision);
    }

    #[test]
    fn find_unknown_model_is_none() {
        assert!(find("llama-70b").is_none());
    }

    #[test]
    fn arbiter_is_in_catalog() {
        let m = find(ARBITER_MODEL).unwrap();
        assert_eq!(m.vendor, ARBITER_VENDOR);
    }

    #[test]
    fn vendor_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Vendor::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(serde_json::to_string(&Vendor::Cohere).unwrap(), "\"cohere\"");
    }

    #[test]
    fn model_ids_are_unique() {
        for (i, a) in AVAILABLE_MODELS.iter().enumerate() {
            for b in &AVAILABLE_MODELS[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
