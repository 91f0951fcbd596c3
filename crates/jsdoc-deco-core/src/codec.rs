//! Documentation channel codec
//!
//! The editor asks the language service for documentation through the
//! ordinary `quickinfo` request. The language-service plugin answers through
//! the ordinary `documentation` field, so an override has to be told apart
//! from the documentation every quick-info reply already carries. The
//! plugin fences override text between two zero-width sentinels; this module
//! owns both sides of that convention and turns it into a typed
//! [`TaggedDoc`] at the boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host command that forwards a request to the language service
pub const TSSERVER_REQUEST_COMMAND: &str = "typescript.tsserverRequest";

/// Language-service operation queried for documentation
pub const QUICKINFO_COMMAND: &str = "quickinfo";

/// Fence placed before and after override text. Two zero-width spaces:
/// invisible if it ever leaks into a hover, and not whitespace to `trim`.
pub const SENTINEL: &str = "\u{200b}\u{200b}";

/// Payload of a documentation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickInfoRequest {
    pub file: String,
    /// Byte offset of the member-name token start
    pub position: u32,
}

impl QuickInfoRequest {
    /// Offsets past `u32::MAX` saturate, which no file position matches.
    pub fn new(file: impl Into<String>, position: usize) -> Self {
        Self {
            file: file.into(),
            position: u32::try_from(position).unwrap_or(u32::MAX),
        }
    }

    /// Arguments for [`TSSERVER_REQUEST_COMMAND`]: the operation name
    /// followed by the request payload.
    pub fn to_command_args(&self) -> Vec<Value> {
        vec![
            Value::String(QUICKINFO_COMMAND.to_string()),
            serde_json::json!({ "file": self.file, "position": self.position }),
        ]
    }
}

/// One fragment of display or documentation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPart {
    pub text: String,
    #[serde(default)]
    pub kind: String,
}

impl DisplayPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: "text".to_string(),
        }
    }
}

/// Documentation as it travels on the wire: a plain string or fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Documentation {
    Text(String),
    Parts(Vec<DisplayPart>),
}

impl Documentation {
    /// Concatenated text, untrimmed.
    pub fn joined(&self) -> String {
        match self {
            Documentation::Text(text) => text.clone(),
            Documentation::Parts(parts) => parts.iter().map(|p| p.text.as_str()).collect(),
        }
    }
}

/// A JSDoc tag as reported by quick-info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsDocTagInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// The body of a quick-info reply. Only `documentation` matters to the
/// pipeline; the rest is kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInfoBody {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub kind_modifiers: String,
    #[serde(default)]
    pub display_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Documentation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<JsDocTagInfo>,
}

/// Documentation text classified at the codec boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedDoc {
    /// True when the text came out of the plugin's override path
    pub is_override: bool,
    /// Trimmed text, sentinels removed
    pub text: String,
}

impl TaggedDoc {
    /// Classify raw documentation text.
    ///
    /// The text is an override only if, once trimmed, it both starts and
    /// ends with [`SENTINEL`] and something non-blank remains between them.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        let fenced = trimmed
            .strip_prefix(SENTINEL)
            .and_then(|rest| rest.strip_suffix(SENTINEL))
            .map(str::trim)
            .filter(|inner| !inner.is_empty());

        match fenced {
            Some(inner) => Self {
                is_override: true,
                text: inner.to_string(),
            },
            None => Self {
                is_override: false,
                text: trimmed.to_string(),
            },
        }
    }

    pub fn into_override(self) -> Option<String> {
        self.is_override.then_some(self.text)
    }
}

/// Fence `text` as override documentation.
pub fn wrap_override(text: &str) -> String {
    format!("{SENTINEL}{text}{SENTINEL}")
}

/// Pull the quick-info body out of a language-service reply.
///
/// Replies have been observed in three shapes: a full envelope with `body`,
/// an object carrying the body under `response`, or the body itself. An
/// envelope that reports `success: false` yields nothing whatever its shape.
pub fn extract_quick_info_body(reply: &Value) -> Option<QuickInfoBody> {
    let object = reply.as_object()?;

    if object.get("success") == Some(&Value::Bool(false)) {
        return None;
    }

    let candidate = if let Some(body) = object.get("body") {
        body
    } else if let Some(response) = object.get("response") {
        response
    } else if has_documentation(reply) {
        reply
    } else {
        return None;
    };

    if candidate.is_null() {
        return None;
    }
    serde_json::from_value(candidate.clone()).ok()
}

fn has_documentation(value: &Value) -> bool {
    match value.get("documentation") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(_) => true,
    }
}

/// Classify the documentation carried by a body, if any.
pub fn decode_documentation(body: &QuickInfoBody) -> Option<TaggedDoc> {
    let documentation = body.documentation.as_ref()?;
    let tagged = TaggedDoc::classify(&documentation.joined());
    if tagged.text.is_empty() {
        return None;
    }
    Some(tagged)
}

/// Decode a raw reply all the way to override text.
///
/// Returns `None` for failures, missing bodies and ordinary (non-override)
/// documentation alike: the editor only ever renders override text.
pub fn decode_override(reply: &Value) -> Option<String> {
    let body = extract_quick_info_body(reply)?;
    decode_documentation(&body)?.into_override()
}
