//! Typed inference result produced by the native engine at the end of a
//! listening cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The intent/slot structure decoded from one spoken phrase.
///
/// Produced at most once per completed listening cycle, rendered to a display
/// string, and discarded — never persisted. `slots` is a `BTreeMap` so the
/// rendered order is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inference {
    /// Whether the spoken phrase matched the compiled grammar at all.
    pub is_understood: bool,
    /// Classified action label; present only when understood.
    pub intent: Option<String>,
    /// Named parameter values extracted alongside the intent.
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
}

impl Inference {
    /// An understood phrase with its intent label and slot values.
    pub fn understood<I, K, V>(intent: &str, slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            is_understood: true,
            intent: Some(intent.to_string()),
            slots: slots
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// A phrase the grammar did not match.
    pub fn not_understood() -> Self {
        Self {
            is_understood: false,
            intent: None,
            slots: BTreeMap::new(),
        }
    }

    /// Render the result as the indented text block shown in the result panel.
    ///
    /// The intent line and slots block appear only for understood phrases;
    /// a rejected phrase renders the `isUnderstood` field alone.
    pub fn render(&self) -> String {
        let mut out = format!("{{\n    \"isUnderstood\" : \"{}\",\n", self.is_understood);
        if self.is_understood {
            if let Some(intent) = &self.intent {
                out.push_str(&format!("    \"intent\" : \"{intent}\",\n"));
            }
            if !self.slots.is_empty() {
                out.push_str("    \"slots\" : {\n");
                for (name, value) in &self.slots {
                    out.push_str(&format!("        \"{name}\" : \"{value}\",\n"));
                }
                out.push_str("    }\n");
            }
        }
        out.push('}');
        out
    }
}
