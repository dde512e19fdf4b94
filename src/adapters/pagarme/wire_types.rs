//! Pagar.me transaction API wire types.

use serde::{Deserialize, Serialize};

/// Body of `POST /transactions`.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest<'a> {
    pub api_key: &'a str,

    /// Amount in cents.
    pub amount: i64,

    /// `credit_card`, `boleto`, or `pix`.
    pub payment_method: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_hash: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postback_url: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_descriptor: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub boleto_instructions: Option<&'a str>,

    /// Required by the API for pix, ISO 8601 date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_expiration_date: Option<String>,

    pub metadata: TransactionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionMetadata {
    pub payment_id: String,
    pub user_id: String,
}

/// Transaction object returned by the API.
///
/// Only the fields billing reads; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: serde_json::Value,
    pub status: String,

    #[serde(default)]
    pub refuse_reason: Option<String>,

    #[serde(default)]
    pub acquirer_response_code: Option<String>,

    #[serde(default)]
    pub boleto_barcode: Option<String>,

    #[serde(default)]
    pub boleto_url: Option<String>,

    /// EMV copy-and-paste payload.
    #[serde(default)]
    pub pix_qr_code: Option<String>,

    /// Hosted QR code image.
    #[serde(default)]
    pub pix_qr_code_url: Option<String>,
}

impl Transaction {
    /// Transaction ids come back as numbers; keep them as strings.
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Error body returned with 4xx responses.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorItem {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub parameter_name: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    /// Joined messages, for logs and error text.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| match (&e.parameter_name, &e.message) {
                (Some(param), Some(msg)) => format!("{}: {}", param, msg),
                (None, Some(msg)) => msg.clone(),
                (Some(param), None) => param.clone(),
                (None, None) => e.kind.clone().unwrap_or_else(|| "unknown".to_string()),
            })
            .collect();
        if parts.is_empty() {
            "no error details".to_string()
        } else {
            parts.join("; ")
        }
    }
}
