//! Payment provider callback.

use crate::{AppError, WebResult};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use courtside_core::environment::Clock;
use courtside_core::payment::{CallbackOutcome, PaymentCallback, TransactionStatus};
use courtside_core::store::BookingStore;
use courtside_core::{BookingError, FieldError, Money, OrderId};
use serde::Deserialize;
use serde_json::json;

/// Providers send ids and amounts either as strings or as JSON numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    /// `"50000.00"`
    Text(String),
    /// `50000`
    Number(serde_json::Number),
}

impl TextOrNumber {
    fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        }
    }

    fn to_money(&self) -> Option<Money> {
        Money::parse_decimal(&self.as_text())
    }

    fn to_order_id(&self) -> Option<OrderId> {
        self.as_text().parse::<i64>().ok().map(OrderId::new)
    }
}

/// `POST /api/payments/callback` body.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    /// Order the payment belongs to, `"42"` or `42`
    pub order_id: TextOrNumber,
    /// Provider status, e.g. `settlement`
    pub transaction_status: String,
    /// Reported amount
    pub gross_amount: TextOrNumber,
    /// Provider status code; logged only
    #[serde(default)]
    pub status_code: Option<String>,
    /// Provider signature; not verified here
    #[serde(default)]
    pub signature_key: Option<String>,
}

impl CallbackBody {
    /// Decode into a callback.
    ///
    /// # Errors
    ///
    /// Returns the invalid fields.
    pub fn to_callback(&self) -> Result<PaymentCallback, Vec<FieldError>> {
        let mut errors = Vec::new();

        let order_id = self.order_id.to_order_id();
        if order_id.is_none() {
            errors.push(FieldError::new("order_id", "must be an integer order id"));
        }
        let status = self
            .transaction_status
            .parse::<TransactionStatus>()
            .map_err(|message| errors.push(FieldError::new("transaction_status", message)))
            .ok();
        let amount = self.gross_amount.to_money();
        if amount.is_none() {
            errors.push(FieldError::new(
                "gross_amount",
                "must be a non-negative amount with at most two decimals",
            ));
        }

        match (order_id, status, amount) {
            (Some(order_id), Some(transaction_status), Some(gross_amount)) => Ok(PaymentCallback {
                order_id,
                transaction_status,
                gross_amount,
            }),
            _ => Err(errors),
        }
    }
}

/// `POST /api/payments/callback`
///
/// 200 when the callback is acknowledged (settled, already settled or a
/// non-settlement status), 404 for an unknown order or an amount mismatch.
///
/// # Errors
///
/// 400 for a malformed payload, 503/500 on store failure.
pub async fn payment_callback<S, C>(
    State(state): State<AppState<S, C>>,
    body: Result<Json<CallbackBody>, JsonRejection>,
) -> WebResult<ApiResponse<serde_json::Value>>
where
    S: BookingStore + 'static,
    C: Clock + 'static,
{
    let Json(body) = body?;
    let callback = body
        .to_callback()
        .map_err(|errors| AppError::validation(&errors))?;

    tracing::debug!(
        order_id = %callback.order_id,
        status_code = body.status_code.as_deref().unwrap_or("none"),
        signed = body.signature_key.is_some(),
        "Payment callback received"
    );

    let outcome = state.payments.handle_callback(&callback).await?;
    let data = json!({ "order_id": callback.order_id.get(), "outcome": outcome.as_str() });

    match outcome {
        CallbackOutcome::Ignored(status) => Ok(ApiResponse::new(
            format!("Transaction status {status} acknowledged"),
            data,
        )),
        CallbackOutcome::Settled | CallbackOutcome::AlreadySettled => {
            Ok(ApiResponse::new("Payment settled", data))
        }
        CallbackOutcome::UnknownOrder => Err(BookingError::OrderNotFound(callback.order_id).into()),
        CallbackOutcome::AmountMismatch { .. } => Err(AppError::new(
            StatusCode::NOT_FOUND,
            "Gross amount does not match the order total",
            json!("AMOUNT_MISMATCH"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn body(status: &str, amount: serde_json::Value) -> CallbackBody {
        serde_json::from_value(json!({
            "order_id": 7,
            "transaction_status": status,
            "gross_amount": amount,
        }))
        .unwrap()
    }

    #[test]
    fn amount_may_be_a_string_or_a_number() {
        let text = body("settlement", json!("50000.00")).to_callback().unwrap();
        let number = body("settlement", json!(50000)).to_callback().unwrap();
        assert_eq!(text.gross_amount, Money::from_cents(5_000_000));
        assert_eq!(number.gross_amount, text.gross_amount);
        assert_eq!(text.transaction_status, TransactionStatus::Settlement);
    }

    #[test]
    fn unknown_status_and_bad_amount_are_field_errors() {
        let errors = body("paid", json!("12.345")).to_callback().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["transaction_status", "gross_amount"]);
    }

    #[test]
    fn order_id_may_be_a_string_or_a_number() {
        let mut text: CallbackBody = body("settlement", json!("25.00"));
        text.order_id = TextOrNumber::Text(" 42 ".to_string());
        assert_eq!(text.to_callback().unwrap().order_id, OrderId::new(42));

        let mut bad = body("settlement", json!("25.00"));
        bad.order_id = TextOrNumber::Text("order-42".to_string());
        let errors = bad.to_callback().unwrap_err();
        assert_eq!(errors[0].field, "order_id");
    }
}
