//! Capability descriptors and invocation payloads shared by every backend.
//!
//! ```rust
//! use rtooling::ResourceUri;
//!
//! let template = ResourceUri::parse("papers://{topic}");
//! assert!(template.is_template());
//! assert_eq!(template.scheme(), Some("papers"));
//! assert!(template.matches("papers://graph_neural_networks"));
//! assert!(!template.matches("notes://graph_neural_networks"));
//! ```

use std::fmt::{Display, Formatter};

use rprovider::ToolDefinition;
use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Converts the descriptor into the shape handed to the model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptArgument {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<String>,
}

impl PromptArgument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

impl PromptDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: PromptArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// `/prompt name arg=<arg> ...`
    pub fn usage(&self) -> String {
        let mut usage = format!("/prompt {}", self.name);
        for argument in &self.arguments {
            usage.push_str(&format!(" {0}=<{0}>", argument.name));
        }
        usage
    }
}

/// A resource address: either a concrete URI or an RFC 6570 style template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceUri {
    Literal(String),
    Template { scheme: String, template: String },
}

impl ResourceUri {
    pub fn literal(uri: impl Into<String>) -> Self {
        Self::Literal(uri.into())
    }

    /// Classifies `uri`; anything with a `{name}` expression after the scheme is a template.
    pub fn parse(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        match split_scheme(&uri) {
            Some((scheme, rest)) if has_placeholder(rest) => Self::Template {
                scheme: scheme.to_string(),
                template: uri,
            },
            _ => Self::Literal(uri),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(uri) => uri,
            Self::Template { template, .. } => template,
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template { .. })
    }

    pub fn scheme(&self) -> Option<&str> {
        match self {
            Self::Literal(uri) => split_scheme(uri).map(|(scheme, _)| scheme),
            Self::Template { scheme, .. } => Some(scheme),
        }
    }

    /// Structural match of a concrete URI against this address.
    ///
    /// Every placeholder must bind at least one character and literal text
    /// between placeholders must appear in order.
    pub fn matches(&self, concrete: &str) -> bool {
        match self {
            Self::Literal(uri) => uri == concrete,
            Self::Template { template, .. } => match_template(template, concrete),
        }
    }
}

impl Display for ResourceUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits `scheme://rest`, requiring an RFC 3986 scheme.
pub fn split_scheme(uri: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = uri.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, rest))
}

fn has_placeholder(value: &str) -> bool {
    value
        .find('{')
        .is_some_and(|open| value[open..].find('}').is_some_and(|close| close > 1))
}

fn template_literals(template: &str) -> Vec<&str> {
    let mut literals = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        literals.push(&rest[..open]);
        match rest[open..].find('}') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                rest = "";
                break;
            }
        }
    }
    literals.push(rest);
    literals
}

fn match_template(template: &str, concrete: &str) -> bool {
    let literals = template_literals(template);
    let (first, rest) = match literals.split_first() {
        Some(split) => split,
        None => return false,
    };
    let Some(mut remaining) = concrete.strip_prefix(first) else {
        return false;
    };

    for (index, literal) in rest.iter().enumerate() {
        let is_last = index + 1 == rest.len();
        if is_last {
            return remaining.len() > literal.len() && remaining.ends_with(literal);
        }
        // Each placeholder binds at least one character.
        let skip = remaining.chars().next().map_or(0, char::len_utf8);
        if skip == 0 {
            return false;
        }
        if literal.is_empty() {
            remaining = &remaining[skip..];
            continue;
        }
        match remaining[skip..].find(literal) {
            Some(position) => remaining = &remaining[skip + position + literal.len()..],
            None => return false,
        }
    }

    remaining.is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub uri: ResourceUri,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(uri: ResourceUri, name: impl Into<String>) -> Self {
        Self {
            uri,
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(String),
    Image { mime_type: String, bytes: usize },
    Audio { mime_type: String, bytes: usize },
    Resource { uri: String, text: Option<String> },
    ResourceLink { uri: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Image { mime_type, bytes } => format!("[image: {mime_type}, {bytes} bytes]"),
            Self::Audio { mime_type, bytes } => format!("[audio: {mime_type}, {bytes} bytes]"),
            Self::Resource {
                text: Some(text), ..
            } => text.clone(),
            Self::Resource { uri, text: None } => format!("[embedded resource: {uri}]"),
            Self::ResourceLink { uri } => format!("[resource link: {uri}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    pub structured: Option<Value>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured: None,
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Flattens the output into the string fed back to the model.
    pub fn render(&self) -> String {
        if self.content.is_empty() {
            return self
                .structured
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_default();
        }

        self.content
            .iter()
            .map(ContentBlock::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedPrompt {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

impl RenderedPrompt {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            description: None,
            messages: vec![PromptMessage {
                role: "user".to_string(),
                text: text.into(),
            }],
        }
    }

    pub fn text(&self) -> String {
        self.messages
            .iter()
            .map(|message| message.text.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceBody {
    Text(String),
    Blob { bytes: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    pub uri: String,
    pub mime_type: Option<String>,
    pub body: ResourceBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceContents {
    pub items: Vec<ResourceItem>,
}

impl ResourceContents {
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            items: vec![ResourceItem {
                uri: uri.into(),
                mime_type: Some("text/plain".to_string()),
                body: ResourceBody::Text(text.into()),
            }],
        }
    }

    /// Text items verbatim; blobs as a placeholder line.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|item| match &item.body {
                ResourceBody::Text(text) => text.clone(),
                ResourceBody::Blob { bytes } => format!(
                    "[binary resource {}: {}, {} bytes]",
                    item.uri,
                    item.mime_type.as_deref().unwrap_or("application/octet-stream"),
                    bytes
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_templates_structurally() {
        assert_eq!(
            ResourceUri::parse("papers://folders"),
            ResourceUri::Literal("papers://folders".to_string())
        );
        assert_eq!(
            ResourceUri::parse("papers://{topic}"),
            ResourceUri::Template {
                scheme: "papers".to_string(),
                template: "papers://{topic}".to_string(),
            }
        );
        assert!(!ResourceUri::parse("not a uri {x}").is_template());
    }

    #[test]
    fn template_matching_requires_non_empty_bindings() {
        let template = ResourceUri::parse("papers://{topic}");
        assert!(template.matches("papers://ai"));
        assert!(!template.matches("papers://"));

        let nested = ResourceUri::parse("repo://{owner}/{name}/readme");
        assert!(nested.matches("repo://rust-lang/rust/readme"));
        assert!(!nested.matches("repo://rust-lang/readme"));
        assert!(!nested.matches("repo://rust-lang/rust/license"));
    }

    #[test]
    fn split_scheme_rejects_invalid_schemes() {
        assert_eq!(split_scheme("papers://ai"), Some(("papers", "ai")));
        assert_eq!(split_scheme("1abc://x"), None);
        assert_eq!(split_scheme("plain text"), None);
    }

    #[test]
    fn prompt_usage_lists_arguments() {
        let prompt = PromptDescriptor::new("generate_search_prompt", "Search prompt")
            .with_argument(PromptArgument::new("topic").required())
            .with_argument(PromptArgument::new("num_papers").with_default("5"));

        assert_eq!(
            prompt.usage(),
            "/prompt generate_search_prompt topic=<topic> num_papers=<num_papers>"
        );
    }

    #[test]
    fn outputs_render_text_and_placeholders() {
        let output = ToolOutput {
            content: vec![
                ContentBlock::text("first"),
                ContentBlock::Image {
                    mime_type: "image/png".to_string(),
                    bytes: 12,
                },
            ],
            structured: None,
            is_error: false,
        };
        assert_eq!(output.render(), "first\n[image: image/png, 12 bytes]");

        let structured = ToolOutput {
            content: Vec::new(),
            structured: Some(serde_json::json!({"ok": true})),
            is_error: false,
        };
        assert_eq!(structured.render(), r#"{"ok":true}"#);

        let contents = ResourceContents {
            items: vec![ResourceItem {
                uri: "papers://raw".to_string(),
                mime_type: None,
                body: ResourceBody::Blob { bytes: 3 },
            }],
        };
        assert_eq!(
            contents.render(),
            "[binary resource papers://raw: application/octet-stream, 3 bytes]"
        );
    }
}
