use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// -- Auth forms --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Hidden field echoing the `next` query parameter.
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// -- Messages --

/// Body of `POST /send_message`. Every field is optional so that an
/// incomplete payload is reported as a 400 rather than a rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendMessageRequest {
    pub chat_type: Option<String>,
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub chat_id: Option<i64>,
    pub message: Option<String>,
}

/// Browsers often post ids lifted from `data-*` attributes, so accept
/// `"7"` as well as `7`.
fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Number(n)) => Some(n),
        Some(Id::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self { status: "success".into(), message: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error".into(), message: Some(message.into()) }
    }
}

/// One entry of `GET /get_chat_messages`. Direct messages carry
/// `receiver_id`, group messages carry `group_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub sender_name: String,
}

// -- Groups --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateGroupForm {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroupMessageForm {
    pub group_id: String,
    pub message: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_accepts_string_or_number() {
        let a: SendMessageRequest =
            serde_json::from_str(r#"{"chat_type":"user","chat_id":"12","message":"hi"}"#).unwrap();
        let b: SendMessageRequest =
            serde_json::from_str(r#"{"chat_type":"user","chat_id":12,"message":"hi"}"#).unwrap();
        assert_eq!(a.chat_id, Some(12));
        assert_eq!(b.chat_id, Some(12));
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let req: SendMessageRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.chat_type.is_none());
        assert!(req.chat_id.is_none());
    }

    #[test]
    fn success_status_omits_message() {
        let json = serde_json::to_string(&StatusResponse::success()).unwrap();
        assert_eq!(json, r#"{"status":"success"}"#);
    }
}
