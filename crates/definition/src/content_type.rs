use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::Error;

/// MIME type of a payload sent to the control plane.
///
/// Selects both the serialization of the body and, for the patch
/// variants, the merge semantics applied by the remote API.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    #[default]
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "application/yaml")]
    Yaml,
    #[serde(rename = "application/json-patch+json")]
    JsonPatch,
    #[serde(rename = "application/merge-patch+json")]
    MergePatch,
    #[serde(rename = "application/strategic-merge-patch+json")]
    StrategicMergePatch,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Json,
        ContentType::Yaml,
        ContentType::JsonPatch,
        ContentType::MergePatch,
        ContentType::StrategicMergePatch,
    ];

    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Yaml => "application/yaml",
            ContentType::JsonPatch => "application/json-patch+json",
            ContentType::MergePatch => "application/merge-patch+json",
            ContentType::StrategicMergePatch => "application/strategic-merge-patch+json",
        }
    }

    /// Whether payloads of this type are YAML rather than JSON.
    pub fn is_yaml(&self) -> bool {
        matches!(self, ContentType::Yaml)
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mime())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    /// Parameters such as `; charset=utf-8` are ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        ContentType::ALL
            .into_iter()
            .find(|content_type| content_type.mime() == essence)
            .ok_or_else(|| Error::validation("content_type", format!("unknown MIME type \"{}\"", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ContentType::Json, "application/json")]
    #[case(ContentType::Yaml, "application/yaml")]
    #[case(ContentType::JsonPatch, "application/json-patch+json")]
    #[case(ContentType::MergePatch, "application/merge-patch+json")]
    #[case(ContentType::StrategicMergePatch, "application/strategic-merge-patch+json")]
    fn mime_strings(#[case] content_type: ContentType, #[case] mime: &str) {
        assert_eq!(content_type.mime(), mime);
        assert_eq!(mime.parse::<ContentType>(), Ok(content_type));
    }

    #[test]
    fn parse_ignores_parameters_and_case() {
        assert_eq!(
            "Application/JSON; charset=utf-8".parse::<ContentType>(),
            Ok(ContentType::Json)
        );
    }

    #[test]
    fn parse_rejects_unknown_types() {
        assert!("text/html".parse::<ContentType>().is_err());
    }

    #[test]
    fn json_is_the_default() {
        assert_eq!(ContentType::default(), ContentType::Json);
        assert!(!ContentType::default().is_yaml());
    }
}
