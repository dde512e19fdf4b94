//! Payment instrument chosen at checkout.

use crate::domain::foundation::ValidationError;

use super::PaymentMethod;

pub const MIN_INSTALLMENTS: u32 = 1;
pub const MAX_INSTALLMENTS: u32 = 12;

/// Method plus the fields that method needs.
///
/// Card data arrives already tokenized by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentInstrument {
    Card { card_token: String, installments: u32 },
    Boleto,
    Pix,
}

impl PaymentInstrument {
    /// Validates raw checkout fields into an instrument.
    ///
    /// # Errors
    ///
    /// - `method` missing or unsupported
    /// - card without `card_token`, or `installments` outside 1..=12
    /// - boleto or pix carrying card fields
    pub fn from_parts(
        method: &str,
        card_token: Option<String>,
        installments: Option<u32>,
    ) -> Result<Self, ValidationError> {
        if method.trim().is_empty() {
            return Err(ValidationError::empty_field("method"));
        }
        let method: PaymentMethod = method
            .parse()
            .map_err(|reason: String| ValidationError::invalid_format("method", reason))?;

        match method {
            PaymentMethod::Card => {
                let card_token = card_token
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| ValidationError::empty_field("card_token"))?;
                let installments = installments.unwrap_or(MIN_INSTALLMENTS);
                if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&installments) {
                    return Err(ValidationError::out_of_range(
                        "installments",
                        i64::from(MIN_INSTALLMENTS),
                        i64::from(MAX_INSTALLMENTS),
                        i64::from(installments),
                    ));
                }
                Ok(PaymentInstrument::Card {
                    card_token,
                    installments,
                })
            }
            PaymentMethod::Boleto | PaymentMethod::Pix => {
                if card_token.is_some() {
                    return Err(ValidationError::invalid_format(
                        "card_token",
                        format!("not accepted for {}", method),
                    ));
                }
                if installments.is_some() {
                    return Err(ValidationError::invalid_format(
                        "installments",
                        format!("not accepted for {}", method),
                    ));
                }
                Ok(if method == PaymentMethod::Boleto {
                    PaymentInstrument::Boleto
                } else {
                    PaymentInstrument::Pix
                })
            }
        }
    }

    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentInstrument::Card { .. } => PaymentMethod::Card,
            PaymentInstrument::Boleto => PaymentMethod::Boleto,
            PaymentInstrument::Pix => PaymentMethod::Pix,
        }
    }
}
