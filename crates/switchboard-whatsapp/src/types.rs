// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Business Platform webhook and Graph API types.
//!
//! Every field the vendor may omit is defaulted, so a structurally odd
//! payload deserializes and is then rejected by [`text_messages`] instead
//! of failing the request.

use serde::{Deserialize, Serialize};

/// Top-level webhook body: `{object, entry: [{changes: [{value}]}]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    /// Absent on delivery-status callbacks.
    #[serde(default)]
    pub messages: Vec<WaMessage>,
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    /// Business phone number id; identifies the tenant.
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaMessage {
    pub from: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// A text message that passed shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundText {
    pub phone_number_id: String,
    /// Sender's WhatsApp id.
    pub from: String,
    pub message_id: String,
    pub body: String,
}

/// Why a webhook carried nothing to process.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Status callbacks and empty `messages` arrays.
    NoMessages,
    /// Only non-text messages (images, reactions, ...).
    NonText(Vec<String>),
    /// Messages without the business phone number id.
    MissingMetadata,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoMessages => write!(f, "no messages"),
            SkipReason::NonText(kinds) => write!(f, "non-text message types: {}", kinds.join(", ")),
            SkipReason::MissingMetadata => write!(f, "missing phone number metadata"),
        }
    }
}

/// Extracts the processable text messages of a webhook.
///
/// Non-text and empty messages are dropped. An error means there is
/// nothing to process at all.
pub fn text_messages(envelope: &WebhookEnvelope) -> Result<Vec<InboundText>, SkipReason> {
    let mut texts = Vec::new();
    let mut other_kinds = Vec::new();
    let mut saw_message = false;
    let mut missing_metadata = false;

    for change in envelope.entry.iter().flat_map(|e| &e.changes) {
        let value = &change.value;
        if value.messages.is_empty() {
            continue;
        }
        saw_message = true;
        let Some(metadata) = &value.metadata else {
            missing_metadata = true;
            continue;
        };
        for message in &value.messages {
            let body = message
                .text
                .as_ref()
                .map(|t| t.body.trim())
                .filter(|b| !b.is_empty());
            match (message.kind.as_str(), body) {
                ("text", Some(body)) => texts.push(InboundText {
                    phone_number_id: metadata.phone_number_id.clone(),
                    from: message.from.clone(),
                    message_id: message.id.clone(),
                    body: body.to_string(),
                }),
                (kind, _) => other_kinds.push(kind.to_string()),
            }
        }
    }

    if !texts.is_empty() {
        Ok(texts)
    } else if !saw_message {
        Err(SkipReason::NoMessages)
    } else if missing_metadata && other_kinds.is_empty() {
        Err(SkipReason::MissingMetadata)
    } else {
        Err(SkipReason::NonText(other_kinds))
    }
}

/// Outbound text message body for `POST /{phone_number_id}/messages`.
#[derive(Debug, Serialize)]
pub struct SendTextRequest<'a> {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: OutboundText<'a>,
}

#[derive(Debug, Serialize)]
pub struct OutboundText<'a> {
    pub preview_url: bool,
    pub body: &'a str,
}

impl<'a> SendTextRequest<'a> {
    pub fn new(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            kind: "text",
            text: OutboundText {
                preview_url: false,
                body,
            },
        }
    }
}

/// Read receipt body.
#[derive(Debug, Serialize)]
pub struct MarkReadRequest<'a> {
    pub messaging_product: &'static str,
    pub status: &'static str,
    pub message_id: &'a str,
}

impl<'a> MarkReadRequest<'a> {
    pub fn new(message_id: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            status: "read",
            message_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphErrorResponse {
    pub error: GraphError,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> WebhookEnvelope {
        serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "WABA", "changes": [{"field": "messages", "value": value}]}]
        }))
        .unwrap()
    }

    fn metadata() -> serde_json::Value {
        json!({"display_phone_number": "15550001", "phone_number_id": "1001"})
    }

    #[test]
    fn extracts_text_message() {
        let env = envelope(json!({
            "messaging_product": "whatsapp",
            "metadata": metadata(),
            "contacts": [{"wa_id": "254700000001", "profile": {"name": "Wanjiru"}}],
            "messages": [{
                "from": "254700000001",
                "id": "wamid.1",
                "timestamp": "1700000000",
                "type": "text",
                "text": {"body": "what's my balance"}
            }]
        }));
        let texts = text_messages(&env).unwrap();
        assert_eq!(
            texts,
            vec![InboundText {
                phone_number_id: "1001".into(),
                from: "254700000001".into(),
                message_id: "wamid.1".into(),
                body: "what's my balance".into(),
            }]
        );
    }

    #[test]
    fn empty_or_absent_messages_are_skipped() {
        let empty = envelope(json!({"metadata": metadata(), "messages": []}));
        assert_eq!(text_messages(&empty), Err(SkipReason::NoMessages));

        let status = envelope(json!({"metadata": metadata(), "statuses": [{"status": "read"}]}));
        assert_eq!(text_messages(&status), Err(SkipReason::NoMessages));

        let nothing: WebhookEnvelope = serde_json::from_value(json!({})).unwrap();
        assert_eq!(text_messages(&nothing), Err(SkipReason::NoMessages));
    }

    #[test]
    fn non_text_messages_are_skipped() {
        let env = envelope(json!({
            "metadata": metadata(),
            "messages": [{"from": "1", "id": "wamid.2", "type": "image", "image": {"id": "m1"}}]
        }));
        assert_eq!(
            text_messages(&env),
            Err(SkipReason::NonText(vec!["image".into()]))
        );
    }

    #[test]
    fn missing_metadata_is_skipped() {
        let env = envelope(json!({
            "messages": [{"from": "1", "id": "wamid.3", "type": "text", "text": {"body": "hi"}}]
        }));
        assert_eq!(text_messages(&env), Err(SkipReason::MissingMetadata));
    }

    #[test]
    fn send_request_serializes_to_graph_shape() {
        let body = serde_json::to_value(SendTextRequest::new("2547", "hello")).unwrap();
        assert_eq!(
            body,
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "2547",
                "type": "text",
                "text": {"preview_url": false, "body": "hello"}
            })
        );
    }
}
