use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Stored conversation message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// History entry handed to completion backends (timestamp dropped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

// ===== REQUEST MODELS =====

/// Fields are optional so missing ones surface as validation errors, not rejections.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub no_relevant_content_found: bool,
    pub used_fallback: bool,
    #[serde(rename = "usedFAQ")]
    pub used_faq: bool,
}

impl ChatResponse {
    pub fn from_faq(answer: String) -> Self {
        Self {
            message: answer,
            no_relevant_content_found: false,
            used_fallback: false,
            used_faq: true,
        }
    }

    /// Whether the widget should surface WhatsApp/email contact options.
    /// FAQ answers are trusted and never trigger them.
    pub fn should_offer_contact_options(&self) -> bool {
        !self.used_faq && (self.no_relevant_content_found || self.used_fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_relevant_content_found: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_fallback: Option<bool>,
}

impl ChatErrorResponse {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            no_relevant_content_found: None,
            used_fallback: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_uses_widget_field_names() {
        let response = ChatResponse {
            message: "hi".to_string(),
            no_relevant_content_found: true,
            used_fallback: false,
            used_faq: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["noRelevantContentFound"], true);
        assert_eq!(json["usedFallback"], false);
        assert_eq!(json["usedFAQ"], false);
    }

    #[test]
    fn test_contact_options_never_for_faq() {
        let mut response = ChatResponse::from_faq("answer".to_string());
        assert!(!response.should_offer_contact_options());

        response.no_relevant_content_found = true;
        assert!(!response.should_offer_contact_options());

        response.used_faq = false;
        assert!(response.should_offer_contact_options());
    }

    #[test]
    fn test_error_response_omits_unset_flags() {
        let json = serde_json::to_value(ChatErrorResponse::message("Internal server error")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
    }

    #[test]
    fn test_request_accepts_camel_case() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message":"hello","sessionId":"abc"}"#).unwrap();
        assert_eq!(request.message.as_deref(), Some("hello"));
        assert_eq!(request.session_id.as_deref(), Some("abc"));
    }
}
