use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A ledger object as returned by the owned-objects query: a type tag plus
/// an opaque field bag. Everything else about the object is chain-internal.
#[derive(Debug, Clone)]
pub struct OwnedObject {
    pub object_id: String,
    pub type_tag: String,
    pub fields: Value,
}

/// A transaction sent by an address, with execution effects expanded.
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub digest: String,
    pub success: bool,
    pub timestamp_ms: Option<i64>,
}

/// One owned object after classification. The type tag is only ever
/// inspected here, at the ingestion boundary; downstream code matches on the
/// variant.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub object_id: String,
    pub kind: RecordKind,
}

#[derive(Debug, Clone)]
pub enum RecordKind {
    Invoice(InvoiceFields),
    Payment(PaymentFields),
    MedicalRecord(MedicalRecordFields),
    Prescription(PrescriptionFields),
    Unknown { type_tag: String },
}

impl LedgerRecord {
    /// Classify an owned object by its reported type tag. Kind detection is
    /// substring-based because deployments embed the package id and module
    /// path in the tag; anything unrecognized becomes `Unknown` rather than
    /// being dropped silently here.
    pub fn classify(object: OwnedObject) -> LedgerRecord {
        let OwnedObject {
            object_id,
            type_tag,
            fields,
        } = object;

        let kind = if type_tag.contains("Invoice") {
            RecordKind::Invoice(parse_fields(fields))
        } else if type_tag.contains("PaymentRecord") {
            RecordKind::Payment(parse_fields(fields))
        } else if type_tag.contains("MedicalRecord") {
            RecordKind::MedicalRecord(parse_fields(fields))
        } else if type_tag.contains("Prescription") {
            RecordKind::Prescription(parse_fields(fields))
        } else {
            RecordKind::Unknown { type_tag }
        };

        LedgerRecord { object_id, kind }
    }
}

/// Field bags are best-effort: a malformed bag yields a record with every
/// field absent, which normalization then fills with defaults.
fn parse_fields<T: Default + for<'de> Deserialize<'de>>(fields: Value) -> T {
    serde_json::from_value(fields).unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InvoiceFields {
    pub patient_address: Option<String>,
    pub doctor_address: Option<String>,
    pub institution_address: Option<String>,
    pub service_description: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub total_amount: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub insurance_covered_amount: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub patient_copay_amount: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub payment_type: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub status: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub created_at: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaymentFields {
    pub invoice_id: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub amount: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub payment_type: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub timestamp: Option<u64>,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MedicalRecordFields {
    pub patient_address: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub visit_date: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrescriptionFields {
    pub patient_address: Option<String>,
    pub medication_name: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub created_at: Option<u64>,
}

/// Move u64 fields arrive as JSON strings from the fullnode; older tooling
/// emitted plain numbers. Accept both and treat anything else as absent.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}
