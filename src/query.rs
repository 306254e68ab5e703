use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::{Result, RagError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedQuestion {
    pub original: String,
    /// Whitespace-collapsed text shown to the generator.
    pub normalized: String,
    /// Text that gets embedded; carries acronym expansions.
    pub search_text: String,
    pub schemes_mentioned: Vec<String>,
}

struct SchemeAlias {
    pattern: Regex,
    canonical: &'static str,
    expansion: &'static str,
}

const SCHEME_ALIASES: &[(&str, &str, &str)] = &[
    (r"(?i)\bpm[\s-]?kisan\b", "PM-KISAN", "Pradhan Mantri Kisan Samman Nidhi"),
    (
        r"(?i)\b(mgnrega|mgnregs|nrega)\b",
        "MGNREGA",
        "Mahatma Gandhi National Rural Employment Guarantee Act",
    ),
    (r"(?i)\bpmay[\s-]?g\b", "PMAY-G", "Pradhan Mantri Awas Yojana Gramin"),
    (
        r"(?i)\b(pm[\s-]?jay|ayushman)\b",
        "Ayushman Bharat",
        "Ayushman Bharat Pradhan Mantri Jan Arogya Yojana",
    ),
];

pub struct QueryProcessor {
    whitespace: Regex,
    scheme_aliases: Vec<SchemeAlias>,
}

impl QueryProcessor {
    pub fn new() -> Result<Self> {
        let whitespace = Regex::new(r"\s+")
            .map_err(|e| RagError::Config(format!("invalid whitespace pattern: {}", e)))?;

        let scheme_aliases = SCHEME_ALIASES
            .iter()
            .map(|&(pattern, canonical, expansion)| {
                Ok(SchemeAlias {
                    pattern: Regex::new(pattern)
                        .map_err(|e| RagError::Config(format!("invalid alias pattern {}: {}", pattern, e)))?,
                    canonical,
                    expansion,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { whitespace, scheme_aliases })
    }

    /// Independent of the answer language, so retrieval is too.
    pub fn process(&self, text: &str) -> Result<ProcessedQuestion> {
        let normalized = self.whitespace.replace_all(text.trim(), " ").to_string();
        if normalized.is_empty() {
            return Err(RagError::InvalidQuestion("question is empty".to_string()));
        }

        let mut schemes_mentioned = Vec::new();
        let mut expansions = Vec::new();
        for alias in &self.scheme_aliases {
            if alias.pattern.is_match(&normalized) {
                schemes_mentioned.push(alias.canonical.to_string());
                expansions.push(alias.expansion);
            }
        }

        let search_text = if expansions.is_empty() {
            normalized.clone()
        } else {
            format!("{} ({})", normalized, expansions.join("; "))
        };

        Ok(ProcessedQuestion {
            original: text.to_string(),
            normalized,
            search_text,
            schemes_mentioned,
        })
    }
}
