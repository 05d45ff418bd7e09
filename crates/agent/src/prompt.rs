//! Two-slot prompt templates for context augmentation.

use toolloop_core::{Error, Result};

/// Slot replaced by the joined context fragments.
pub const CONTEXT_SLOT: &str = "{context_str}";

/// Slot replaced by the original user message.
pub const QUERY_SLOT: &str = "{query_str}";

/// Default template: answer from the retrieved context, not prior knowledge.
pub const DEFAULT_CONTEXT_TEMPLATE: &str = "Context information is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
Given the context information and not prior knowledge, either pick the corresponding tool or answer the function: {query_str}\n";

/// A template with exactly the `{context_str}` and `{query_str}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Parse a template. Both slots must appear at least once.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for slot in [CONTEXT_SLOT, QUERY_SLOT] {
            if !template.contains(slot) {
                return Err(Error::config(format!(
                    "Prompt template is missing the {slot} placeholder"
                )));
            }
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute both slots in a single left-to-right pass.
    ///
    /// Slot markers appearing inside `context` or `query` are left as-is.
    pub fn render(&self, context: &str, query: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + query.len());
        let mut rest = self.template.as_str();

        loop {
            let next = [(CONTEXT_SLOT, context), (QUERY_SLOT, query)]
                .into_iter()
                .filter_map(|(slot, value)| rest.find(slot).map(|pos| (pos, slot, value)))
                .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, slot, value)) => {
                    out.push_str(&rest[..pos]);
                    out.push_str(value);
                    rest = &rest[pos + slot.len()..];
                }
                None => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_CONTEXT_TEMPLATE.to_string(),
        }
    }
}

impl std::str::FromStr for PromptTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
