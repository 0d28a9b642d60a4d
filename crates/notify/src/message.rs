use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tera::{Context, Tera};
use thiserror::Error;

/// Inputs for one award message, captured at selection time so the rendered
/// notice stays stable even if the underlying rows change later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AwardNoticeContext {
    pub notice_id: String,
    pub boq_id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub supplier_email: String,
    pub fuel_type: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub price_per_unit: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub decided_at: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("award template failed to render: {0}")]
    Template(#[from] tera::Error),
    #[error("award payload failed to encode: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A rendered notice ready for a transport. `payload_hash` is the digest
/// persisted on the award notice row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AwardMessage {
    pub subject: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub payload_hash: String,
}

const AWARD_TEMPLATE: &str = "\
Dear {{ supplier_name }},

Your bid for {{ description }} ({{ boq_id }}) has been selected.

  Fuel type:      {{ fuel_type }}
  Quantity:       {{ quantity }} {{ unit }}
  Price per unit: {{ price_per_unit }} {{ currency }}
  Total:          {{ total_price }} {{ currency }}

Please confirm the delivery schedule with the procurement office.
";

/// Renders the notice body and computes the payload digest.
pub fn render_award_message(context: &AwardNoticeContext) -> Result<AwardMessage, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_template("award_notice.txt", AWARD_TEMPLATE)?;

    let body = tera.render("award_notice.txt", &Context::from_serialize(context)?)?;
    let payload = serde_json::to_value(context)?;
    let payload_hash = payload_digest(&payload);
    let subject = format!("Fuel supply award for {}", context.boq_id);

    Ok(AwardMessage { subject, body, payload, payload_hash })
}

/// Lowercase hex SHA-256 over the serialized payload. serde_json orders map
/// keys, so the digest is stable for equal contexts.
pub fn payload_digest(payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hasher.finalize().iter().map(|byte| format!("{byte:02x}")).collect()
}
