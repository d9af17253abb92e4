use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Invoice,
    MedicalRecord,
    Prescription,
    Payment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
    Approved,
    PartiallyPaid,
}

impl TransactionStatus {
    /// Invoice status codes as stored on chain. Codes 3 and 4 are unused by
    /// the deployed contract; any unrecognized code reads as pending.
    pub fn from_invoice_code(code: u64) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Approved,
            2 => Self::Confirmed,
            5 => Self::PartiallyPaid,
            _ => Self::Pending,
        }
    }
}

/// Payment method recorded on a payment record. The on-chain code space also
/// has a split variant, but an individual payment record is always one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Insurance,
}

impl PaymentMethod {
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Insurance,
            _ => Self::Cash,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Insurance => write!(f, "insurance"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Insurance,
    Split,
}

impl PaymentType {
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Insurance,
            2 => Self::Split,
            _ => Self::Cash,
        }
    }
}

/// Nested invoice detail carried by invoice entries and enriched payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub service_description: String,
    pub total_amount: u64,
    pub insurance_covered_amount: u64,
    pub patient_copay_amount: u64,
    pub payment_type: PaymentType,
    pub doctor_address: String,
    pub institution_address: String,
}

/// One normalized entry in a wallet's transaction history. Amounts are in
/// the smallest currency unit, timestamps in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTransaction {
    pub id: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: Option<u64>,
    pub timestamp_ms: i64,
    pub description: String,
    pub ledger_hash: Option<String>,
    pub related_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
    pub invoice_details: Option<InvoiceSummary>,
}
