use crate::config::Config;
use crate::ledger::client::{ClientError, LedgerReader};
use crate::ledger::models::{
    InvoiceFields, LedgerRecord, MedicalRecordFields, PaymentFields, PrescriptionFields,
    RecordKind, SentTransaction,
};
use crate::ledger::resolver;
use crate::models::{
    InvoiceSummary, PaymentMethod, PaymentType, TransactionKind, TransactionStatus,
    UserTransaction,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Assembles the user-facing transaction history for an address: classifies
/// the address's owned ledger objects, enriches them with display names and
/// invoice summaries, folds in outbound payments, and sorts the result.
pub struct HistoryProcessor<R> {
    reader: Arc<R>,
    package_id: String,
    lookup_timeout: Duration,
    max_in_flight: usize,
    sent_tx_limit: usize,
}

impl<R: LedgerReader> HistoryProcessor<R> {
    pub fn new(reader: Arc<R>, config: &Config) -> Self {
        Self {
            reader,
            package_id: config.package_id.clone(),
            lookup_timeout: Duration::from_secs(config.lookup_timeout_secs),
            max_in_flight: config.max_concurrent_objects.max(1),
            sent_tx_limit: config.sent_tx_limit,
        }
    }

    /// Full history assembly. Fails only if one of the two top-level ledger
    /// queries fails; per-object enrichment problems degrade to fallbacks.
    pub async fn user_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<UserTransaction>, ClientError> {
        let owned = self.reader.owned_objects(address).await?;

        let records: Vec<LedgerRecord> = owned
            .into_iter()
            .filter(|object| object.type_tag.contains(&self.package_id))
            .map(LedgerRecord::classify)
            .collect();

        // Bounded fan-out that preserves input order, so repeated assemblies
        // over unchanged ledger state come out identical.
        let mut transactions: Vec<UserTransaction> = stream::iter(records)
            .map(|record| self.normalize(record))
            .buffered(self.max_in_flight)
            .filter_map(|entry| async move { entry })
            .collect()
            .await;

        let sent = self
            .reader
            .sent_transactions(address, self.sent_tx_limit)
            .await?;
        transactions.extend(sent.into_iter().filter(|tx| tx.success).map(outbound_payment));

        // Stable sort: ties keep their arrival order
        transactions.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));

        Ok(transactions)
    }

    async fn normalize(&self, record: LedgerRecord) -> Option<UserTransaction> {
        match record.kind {
            RecordKind::Invoice(fields) => Some(self.invoice_entry(record.object_id, fields).await),
            RecordKind::Payment(fields) => Some(self.payment_entry(record.object_id, fields).await),
            RecordKind::MedicalRecord(fields) => {
                Some(self.medical_record_entry(record.object_id, fields).await)
            }
            RecordKind::Prescription(fields) => {
                Some(self.prescription_entry(record.object_id, fields).await)
            }
            RecordKind::Unknown { type_tag } => {
                debug!(
                    "Skipping unrecognized ledger object {} of type {}",
                    record.object_id, type_tag
                );
                None
            }
        }
    }

    async fn invoice_entry(&self, object_id: String, fields: InvoiceFields) -> UserTransaction {
        let (patient_name, doctor_name) = self
            .participant_names(
                fields.patient_address.as_deref(),
                fields.doctor_address.as_deref(),
            )
            .await;

        UserTransaction {
            id: object_id.clone(),
            kind: TransactionKind::Invoice,
            status: TransactionStatus::from_invoice_code(fields.status.unwrap_or(0)),
            amount: Some(fields.total_amount.unwrap_or(0)),
            timestamp_ms: fields.created_at.map(|t| t as i64).unwrap_or_else(now_ms),
            description: format!(
                "Invoice for {}",
                fields
                    .service_description
                    .as_deref()
                    .unwrap_or("medical service")
            ),
            ledger_hash: Some(object_id.clone()),
            related_id: Some(object_id),
            payment_method: None,
            patient_name,
            doctor_name,
            invoice_details: Some(invoice_summary(&fields)),
        }
    }

    async fn payment_entry(&self, object_id: String, fields: PaymentFields) -> UserTransaction {
        let enrichment = match fields.invoice_id.as_deref() {
            Some(invoice_id) => self.invoice_enrichment(invoice_id).await,
            None => None,
        };
        let (invoice_details, patient_name, doctor_name) = match enrichment {
            Some(e) => (Some(e.summary), e.patient_name, e.doctor_name),
            None => (None, None, None),
        };

        let amount = fields.amount.unwrap_or(0);
        let method = PaymentMethod::from_code(fields.payment_type.unwrap_or(0));

        UserTransaction {
            id: object_id.clone(),
            kind: TransactionKind::Payment,
            status: TransactionStatus::Confirmed,
            amount: Some(amount),
            timestamp_ms: fields.timestamp.map(|t| t as i64).unwrap_or_else(now_ms),
            description: format!("Payment of ${} via {}", amount, method),
            ledger_hash: Some(fields.transaction_hash.unwrap_or_else(|| object_id.clone())),
            related_id: fields.invoice_id,
            payment_method: Some(method),
            patient_name,
            doctor_name,
            invoice_details,
        }
    }

    async fn medical_record_entry(
        &self,
        object_id: String,
        fields: MedicalRecordFields,
    ) -> UserTransaction {
        let patient_name = self.maybe_patient_name(fields.patient_address.as_deref()).await;

        UserTransaction {
            id: object_id.clone(),
            kind: TransactionKind::MedicalRecord,
            status: TransactionStatus::Confirmed,
            amount: None,
            timestamp_ms: fields.visit_date.map(|t| t as i64).unwrap_or_else(now_ms),
            description: "Medical record created".to_string(),
            ledger_hash: Some(object_id.clone()),
            related_id: Some(object_id),
            payment_method: None,
            patient_name,
            doctor_name: None,
            invoice_details: None,
        }
    }

    async fn prescription_entry(
        &self,
        object_id: String,
        fields: PrescriptionFields,
    ) -> UserTransaction {
        let patient_name = self.maybe_patient_name(fields.patient_address.as_deref()).await;

        UserTransaction {
            id: object_id.clone(),
            kind: TransactionKind::Prescription,
            status: TransactionStatus::Confirmed,
            amount: None,
            timestamp_ms: fields.created_at.map(|t| t as i64).unwrap_or_else(now_ms),
            description: format!(
                "Prescription for {}",
                fields.medication_name.as_deref().unwrap_or("medication")
            ),
            ledger_hash: Some(object_id.clone()),
            related_id: Some(object_id),
            payment_method: None,
            patient_name,
            doctor_name: None,
            invoice_details: None,
        }
    }

    /// Secondary read resolving the invoice a payment record references.
    /// Tolerates failure: the payment entry is still produced, unenriched.
    async fn invoice_enrichment(&self, invoice_id: &str) -> Option<InvoiceEnrichment> {
        let object = match timeout(self.lookup_timeout, self.reader.object(invoice_id)).await {
            Ok(Ok(object)) => object,
            Ok(Err(e)) => {
                warn!(
                    "Failed to fetch invoice {} for payment record: {}",
                    invoice_id, e
                );
                return None;
            }
            Err(_) => {
                warn!("Timed out fetching invoice {} for payment record", invoice_id);
                return None;
            }
        };

        let fields: InvoiceFields = serde_json::from_value(object.fields).unwrap_or_default();
        let (patient_name, doctor_name) = self
            .participant_names(
                fields.patient_address.as_deref(),
                fields.doctor_address.as_deref(),
            )
            .await;

        Some(InvoiceEnrichment {
            summary: invoice_summary(&fields),
            patient_name,
            doctor_name,
        })
    }

    /// The two name lookups for one entry are issued together and awaited
    /// jointly.
    async fn participant_names(
        &self,
        patient_address: Option<&str>,
        doctor_address: Option<&str>,
    ) -> (Option<String>, Option<String>) {
        tokio::join!(
            self.maybe_patient_name(patient_address),
            async {
                match doctor_address {
                    Some(addr) => Some(
                        resolver::doctor_name(&*self.reader, addr, self.lookup_timeout)
                            .await
                            .into_display(),
                    ),
                    None => None,
                }
            }
        )
    }

    async fn maybe_patient_name(&self, patient_address: Option<&str>) -> Option<String> {
        match patient_address {
            Some(addr) => Some(
                resolver::patient_name(&*self.reader, addr, self.lookup_timeout)
                    .await
                    .into_display(),
            ),
            None => None,
        }
    }
}

struct InvoiceEnrichment {
    summary: InvoiceSummary,
    patient_name: Option<String>,
    doctor_name: Option<String>,
}

fn invoice_summary(fields: &InvoiceFields) -> InvoiceSummary {
    InvoiceSummary {
        service_description: fields.service_description.clone().unwrap_or_default(),
        total_amount: fields.total_amount.unwrap_or(0),
        insurance_covered_amount: fields.insurance_covered_amount.unwrap_or(0),
        patient_copay_amount: fields.patient_copay_amount.unwrap_or(0),
        payment_type: PaymentType::from_code(fields.payment_type.unwrap_or(0)),
        doctor_address: fields.doctor_address.clone().unwrap_or_default(),
        institution_address: fields.institution_address.clone().unwrap_or_default(),
    }
}

/// Generic entry for an outbound transaction the owned-object scan did not
/// capture. No enrichment is attempted on this path.
fn outbound_payment(tx: SentTransaction) -> UserTransaction {
    UserTransaction {
        id: tx.digest.clone(),
        kind: TransactionKind::Payment,
        status: TransactionStatus::Confirmed,
        amount: None,
        timestamp_ms: tx.timestamp_ms.unwrap_or_else(now_ms),
        description: "Payment transaction".to_string(),
        ledger_hash: Some(tx.digest),
        related_id: None,
        payment_method: None,
        patient_name: None,
        doctor_name: None,
        invoice_details: None,
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
