//! Persona descriptor.
//!
//! One descriptor carries everything that used to differ between branded
//! front-ends: display name and tagline, the system instruction sent with every
//! request, and the placeholder strings used when the backend omits data.

use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are Azure, an expert software engineering assistant.
Provide production-ready, clean and optimized code (HTML/CSS/JS, C#, Python, Rust and others).
Prefer current, stable framework versions and cite sources found through search when relevant.
Keep answers precise and skip filler.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persona {
    /// Display name shown in the CLI banner and prompt.
    pub name: String,
    pub tagline: String,
    pub system_instruction: String,
    /// Returned as the answer when the backend produces no text.
    pub empty_response_text: String,
    /// Title given to citations whose source has none.
    pub citation_fallback_title: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Azure".to_string(),
            tagline: "Real-time engineering with search grounding".to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            empty_response_text: "Synthesis failed: no response text was returned.".to_string(),
            citation_fallback_title: "Official Source".to_string(),
        }
    }
}

impl Persona {
    /// One-line banner for interactive sessions.
    pub fn banner(&self) -> String {
        if self.tagline.is_empty() {
            self.name.clone()
        } else {
            format!("{} · {}", self.name, self.tagline)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_persona_has_placeholders() {
        let p = Persona::default();
        assert!(!p.system_instruction.is_empty());
        assert!(!p.empty_response_text.is_empty());
        assert_eq!(p.citation_fallback_title, "Official Source");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let p: Persona = serde_json::from_str(r#"{"name": "Nexus"}"#).unwrap();
        assert_eq!(p.name, "Nexus");
        assert_eq!(p.citation_fallback_title, "Official Source");
    }

    #[test]
    fn test_banner() {
        let mut p = Persona::default();
        assert!(p.banner().starts_with("Azure · "));
        p.tagline.clear();
        assert_eq!(p.banner(), "Azure");
    }
}
