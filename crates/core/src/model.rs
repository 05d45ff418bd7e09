//! The allow-list of model identifiers the agent accepts.
//!
//! The loop relies on native function calling, so only models known to
//! support it are accepted. Parsing an unknown identifier is a
//! configuration error.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::error::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SupportedModel {
    #[default]
    Gpt35Turbo0613,
    Gpt40613,
    Gpt4o,
    Gpt4oMini,
}

impl SupportedModel {
    pub const ALL: [SupportedModel; 4] = [
        SupportedModel::Gpt35Turbo0613,
        SupportedModel::Gpt40613,
        SupportedModel::Gpt4o,
        SupportedModel::Gpt4oMini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedModel::Gpt35Turbo0613 => "gpt-3.5-turbo-0613",
            SupportedModel::Gpt40613 => "gpt-4-0613",
            SupportedModel::Gpt4o => "gpt-4o",
            SupportedModel::Gpt4oMini => "gpt-4o-mini",
        }
    }

    /// All accepted identifiers, comma separated (for error messages).
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for SupportedModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                Error::config(format!(
                    "Model name {s} not supported. Supported model names: {}",
                    Self::supported_names()
                ))
            })
    }
}

impl TryFrom<String> for SupportedModel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SupportedModel> for String {
    fn from(model: SupportedModel) -> Self {
        model.as_str().to_string()
    }
}

impl std::fmt::Display for SupportedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_listed_model() {
        for model in SupportedModel::ALL {
            assert_eq!(model.as_str().parse::<SupportedModel>().unwrap(), model);
        }
    }

    #[test]
    fn rejects_unknown_model() {
        let err = "text-davinci-003".parse::<SupportedModel>().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("text-davinci-003"));
        assert!(err.to_string().contains("gpt-4-0613"));
    }

    #[test]
    fn default_is_gpt35_0613() {
        assert_eq!(SupportedModel::default().as_str(), "gpt-3.5-turbo-0613");
    }

    #[test]
    fn serde_uses_identifier() {
        let json = serde_json::to_string(&SupportedModel::Gpt4o).unwrap();
        assert_eq!(json, "\"gpt-4o\"");
        assert!(serde_json::from_str::<SupportedModel>("\"gpt-5\"").is_err());
    }
}
