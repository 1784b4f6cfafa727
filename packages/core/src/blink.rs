//! Wire types for the Solana Actions ("blinks") JSON contract.
//!
//! Field names and tag values follow the Solana Actions contract exactly;
//! wallets render whatever these serialize to, so any rename here is a
//! breaking change for clients.

use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A renderable action. The `type` tag distinguishes an interactive action
/// from the terminal "completed" card shown after the last step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Action(ActionBody),
    Completed(ActionBody),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    pub icon: String,
    pub title: String,
    pub description: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ActionLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

impl ActionBody {
    pub fn new(
        icon: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            icon: icon.into(),
            title: title.into(),
            description: description.into(),
            label: label.into(),
            disabled: false,
            links: None,
            error: None,
        }
    }

    pub fn with_actions(mut self, actions: Vec<LinkedAction>) -> Self {
        self.links = Some(ActionLinks { actions });
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLinks {
    pub actions: Vec<LinkedAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkedActionType {
    Transaction,
    Message,
    Post,
    ExternalLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedAction {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LinkedActionType>,
    pub href: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ActionParameter>,
}

impl LinkedAction {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: None,
            href: href.into(),
            label: label.into(),
            parameters: Vec::new(),
        }
    }

    pub fn of_type(mut self, kind: LinkedActionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ActionParameter>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Text,
    Email,
    Url,
    Number,
    Date,
    #[serde(rename = "datetime-local")]
    DatetimeLocal,
    Checkbox,
    Radio,
    Textarea,
    Select,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ParameterType>,
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl ActionParameter {
    /// A required parameter of the given input type.
    pub fn required(kind: ParameterType, name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            name: name.into(),
            label: label.into(),
            required: true,
            pattern: None,
            pattern_description: None,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>, description: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self.pattern_description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            selected: None,
        }
    }
}

/// Body the wallet POSTs to an action endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionPostRequest<T> {
    pub account: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostResponseType {
    Transaction,
    Post,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPostResponse {
    #[serde(rename = "type")]
    pub kind: PostResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<PostResponseLinks>,
}

impl ActionPostResponse {
    /// A response carrying a base64 transaction for the wallet to sign.
    pub fn transaction(transaction: String, message: impl Into<String>) -> Self {
        Self {
            kind: PostResponseType::Transaction,
            transaction: Some(transaction),
            message: Some(message.into()),
            links: None,
        }
    }

    /// A response that only advances the action chain.
    pub fn post(message: impl Into<String>) -> Self {
        Self {
            kind: PostResponseType::Post,
            transaction: None,
            message: Some(message.into()),
            links: None,
        }
    }

    pub fn then_inline(mut self, action: Action) -> Self {
        self.links = Some(PostResponseLinks {
            next: NextActionLink::Inline { action },
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponseLinks {
    pub next: NextActionLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NextActionLink {
    Inline { action: Action },
    Post { href: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionError {
    pub message: String,
}

/// `actions.json` served at the domain root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsJson {
    pub rules: Vec<ActionRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRule {
    pub path_pattern: String,
    pub api_path: String,
}

/// Build `path?k=v&...` with form-urlencoded values.
pub fn relative_href(path: &str, pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }

    // Url needs an absolute base; only the serialized query is kept.
    let mut url = Url::parse("http://localhost/").expect("static base URL is valid");
    url.query_pairs_mut().extend_pairs(pairs.iter().copied());

    format!("{}?{}", path, url.query().unwrap_or_default())
}

/// Accepts a JSON string or number and yields it as a string.
///
/// Wallets send form inputs as strings, but some clients send numeric
/// fields (`quantity`, `unitPrice`) as JSON numbers.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}
