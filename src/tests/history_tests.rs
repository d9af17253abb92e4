//! End-to-end assembly and aggregation tests against an in-memory ledger.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::history::{HistoryService, HistorySnapshot};
    use crate::ledger::client::{ClientError, LedgerReader};
    use crate::ledger::models::{OwnedObject, SentTransaction};
    use crate::ledger::processor::HistoryProcessor;
    use crate::ledger::resolver;
    use crate::models::{PaymentMethod, PaymentType, TransactionKind, TransactionStatus};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const PACKAGE_ID: &str = "0x7a11ce";
    const WALLET: &str = "0x1111aabbcc";
    const PATIENT_ADDR: &str = "0x2222ddeeff";
    const DOCTOR_ADDR: &str = "0x3333445566";

    #[derive(Default)]
    struct MockLedger {
        owned: Mutex<HashMap<String, Vec<OwnedObject>>>,
        objects: Mutex<HashMap<String, OwnedObject>>,
        sent: Mutex<HashMap<String, Vec<SentTransaction>>>,
        fail_owned: AtomicBool,
        owned_calls: AtomicUsize,
        delay_ms: AtomicU64,
    }

    impl MockLedger {
        fn add_owned(&self, owner: &str, object: OwnedObject) {
            self.objects
                .lock()
                .unwrap()
                .insert(object.object_id.clone(), object.clone());
            self.owned
                .lock()
                .unwrap()
                .entry(owner.to_string())
                .or_default()
                .push(object);
        }

        fn add_sent(&self, from: &str, tx: SentTransaction) {
            self.sent
                .lock()
                .unwrap()
                .entry(from.to_string())
                .or_default()
                .push(tx);
        }
    }

    #[async_trait]
    impl LedgerReader for MockLedger {
        async fn owned_objects(&self, owner: &str) -> Result<Vec<OwnedObject>, ClientError> {
            self.owned_calls.fetch_add(1, Ordering::SeqCst);

            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            if self.fail_owned.load(Ordering::SeqCst) {
                return Err(ClientError::MalformedResponse("simulated outage".to_string()));
            }

            Ok(self
                .owned
                .lock()
                .unwrap()
                .get(owner)
                .cloned()
                .unwrap_or_default())
        }

        async fn object(&self, object_id: &str) -> Result<OwnedObject, ClientError> {
            self.objects
                .lock()
                .unwrap()
                .get(object_id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(object_id.to_string()))
        }

        async fn sent_transactions(
            &self,
            from: &str,
            _limit: usize,
        ) -> Result<Vec<SentTransaction>, ClientError> {
            Ok(self
                .sent
                .lock()
                .unwrap()
                .get(from)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn test_config() -> Config {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            sui_rpc_url: String::new(),
            package_id: PACKAGE_ID.to_string(),
            rpc_timeout_secs: 5,
            lookup_timeout_secs: 1,
            max_concurrent_objects: 4,
            sent_tx_limit: 50,
        }
    }

    fn processor(ledger: Arc<MockLedger>) -> HistoryProcessor<MockLedger> {
        HistoryProcessor::new(ledger, &test_config())
    }

    fn medipay_object(id: &str, kind: &str, fields: serde_json::Value) -> OwnedObject {
        OwnedObject {
            object_id: id.to_string(),
            type_tag: format!("{PACKAGE_ID}::medipay_contracts::{kind}"),
            fields,
        }
    }

    fn register_patient(ledger: &MockLedger, address: &str, patient_id: &str) {
        ledger.add_owned(
            address,
            medipay_object("0xpat1", "Patient", json!({ "patient_id": patient_id })),
        );
    }

    fn register_doctor(ledger: &MockLedger, address: &str, license: &str) {
        ledger.add_owned(
            address,
            medipay_object("0xdoc1", "DoctorCap", json!({ "license_number": license })),
        );
    }

    #[tokio::test]
    async fn partially_paid_invoice_normalizes() {
        let ledger = Arc::new(MockLedger::default());
        ledger.add_owned(
            WALLET,
            medipay_object(
                "0xinv1",
                "Invoice",
                json!({
                    "service_description": "MRI Scan",
                    "total_amount": "300",
                    "insurance_covered_amount": "200",
                    "patient_copay_amount": "100",
                    "status": "5",
                    "payment_type": 2,
                    "created_at": "1700000000000",
                }),
            ),
        );

        let transactions = processor(ledger).user_transactions(WALLET).await.unwrap();

        assert_eq!(transactions.len(), 1);
        let tx = &transactions[0];
        assert_eq!(tx.kind, TransactionKind::Invoice);
        assert_eq!(tx.status, TransactionStatus::PartiallyPaid);
        assert_eq!(tx.amount, Some(300));
        assert_eq!(tx.description, "Invoice for MRI Scan");
        assert_eq!(tx.timestamp_ms, 1_700_000_000_000);

        let details = tx.invoice_details.as_ref().unwrap();
        assert_eq!(details.service_description, "MRI Scan");
        assert_eq!(details.total_amount, 300);
        assert_eq!(details.payment_type, PaymentType::Split);
    }

    #[tokio::test]
    async fn payment_record_with_missing_invoice_still_produces_entry() {
        let ledger = Arc::new(MockLedger::default());
        ledger.add_owned(
            WALLET,
            medipay_object(
                "0xpay1",
                "PaymentRecord",
                json!({
                    "invoice_id": "0xmissing",
                    "amount": "120",
                    "payment_type": "1",
                    "timestamp": "1700000001000",
                }),
            ),
        );

        let transactions = processor(ledger).user_transactions(WALLET).await.unwrap();

        assert_eq!(transactions.len(), 1);
        let tx = &transactions[0];
        assert_eq!(tx.kind, TransactionKind::Payment);
        assert_eq!(tx.status, TransactionStatus::Confirmed);
        assert_eq!(tx.amount, Some(120));
        assert_eq!(tx.description, "Payment of $120 via insurance");
        assert_eq!(tx.payment_method, Some(PaymentMethod::Insurance));
        assert_eq!(tx.related_id.as_deref(), Some("0xmissing"));
        assert_eq!(tx.ledger_hash.as_deref(), Some("0xpay1"));
        assert!(tx.invoice_details.is_none());
        assert!(tx.patient_name.is_none());
        assert!(tx.doctor_name.is_none());
    }

    #[tokio::test]
    async fn payment_record_enriched_from_referenced_invoice() {
        let ledger = Arc::new(MockLedger::default());
        register_patient(&ledger, PATIENT_ADDR, "PAT-7");
        register_doctor(&ledger, DOCTOR_ADDR, "MD-551");
        ledger.add_owned(
            PATIENT_ADDR,
            medipay_object(
                "0xinv2",
                "Invoice",
                json!({
                    "service_description": "Blood Panel",
                    "total_amount": "80",
                    "payment_type": 0,
                    "patient_address": PATIENT_ADDR,
                    "doctor_address": DOCTOR_ADDR,
                }),
            ),
        );
        ledger.add_owned(
            WALLET,
            medipay_object(
                "0xpay2",
                "PaymentRecord",
                json!({
                    "invoice_id": "0xinv2",
                    "amount": "80",
                    "payment_type": 0,
                    "timestamp": "1700000002000",
                    "transaction_hash": "0xhash2",
                }),
            ),
        );

        let transactions = processor(ledger).user_transactions(WALLET).await.unwrap();

        assert_eq!(transactions.len(), 1);
        let tx = &transactions[0];
        assert_eq!(tx.description, "Payment of $80 via cash");
        assert_eq!(tx.ledger_hash.as_deref(), Some("0xhash2"));
        assert_eq!(tx.patient_name.as_deref(), Some("PAT-7"));
        assert_eq!(tx.doctor_name.as_deref(), Some("Dr. MD-551"));

        let details = tx.invoice_details.as_ref().unwrap();
        assert_eq!(details.service_description, "Blood Panel");
        assert_eq!(details.total_amount, 80);
        assert_eq!(details.doctor_address, DOCTOR_ADDR);
    }

    #[tokio::test]
    async fn outbound_transaction_becomes_generic_payment() {
        let ledger = Arc::new(MockLedger::default());
        ledger.add_sent(
            WALLET,
            SentTransaction {
                digest: "0xabc".to_string(),
                success: true,
                timestamp_ms: Some(1_700_000_003_000),
            },
        );
        ledger.add_sent(
            WALLET,
            SentTransaction {
                digest: "0xbad".to_string(),
                success: false,
                timestamp_ms: Some(1_700_000_004_000),
            },
        );

        let transactions = processor(ledger).user_transactions(WALLET).await.unwrap();

        assert_eq!(transactions.len(), 1);
        let tx = &transactions[0];
        assert_eq!(tx.id, "0xabc");
        assert_eq!(tx.kind, TransactionKind::Payment);
        assert_eq!(tx.status, TransactionStatus::Confirmed);
        assert_eq!(tx.description, "Payment transaction");
        assert_eq!(tx.ledger_hash.as_deref(), Some("0xabc"));
        assert!(tx.amount.is_none());
    }

    #[tokio::test]
    async fn unrecognized_objects_are_skipped() {
        let ledger = Arc::new(MockLedger::default());
        ledger.add_owned(
            WALLET,
            medipay_object("0xpol1", "InsurancePolicy", json!({ "premium": "10" })),
        );
        // Objects from other packages never reach classification
        ledger.add_owned(
            WALLET,
            OwnedObject {
                object_id: "0xcoin".to_string(),
                type_tag: "0x2::coin::Coin<0x2::sui::SUI>".to_string(),
                fields: json!({ "balance": "100" }),
            },
        );

        let transactions = processor(ledger).user_transactions(WALLET).await.unwrap();

        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn history_sorts_descending_and_repeats_identically() {
        let ledger = Arc::new(MockLedger::default());
        register_patient(&ledger, PATIENT_ADDR, "PAT-7");
        register_doctor(&ledger, DOCTOR_ADDR, "MD-551");
        ledger.add_owned(
            WALLET,
            medipay_object(
                "0xinv3",
                "Invoice",
                json!({
                    "service_description": "X-Ray",
                    "total_amount": "50",
                    "created_at": "100",
                    "patient_address": PATIENT_ADDR,
                    "doctor_address": DOCTOR_ADDR,
                }),
            ),
        );
        ledger.add_owned(
            WALLET,
            medipay_object(
                "0xmed1",
                "MedicalRecord",
                json!({ "visit_date": "200", "patient_address": PATIENT_ADDR }),
            ),
        );
        ledger.add_owned(
            WALLET,
            medipay_object(
                "0xrx1",
                "Prescription",
                json!({
                    "medication_name": "Amoxicillin",
                    "created_at": "300",
                    "patient_address": PATIENT_ADDR,
                }),
            ),
        );
        ledger.add_sent(
            WALLET,
            SentTransaction {
                digest: "0xfeed".to_string(),
                success: true,
                timestamp_ms: Some(250),
            },
        );

        let processor = processor(ledger.clone());
        let first = processor.user_transactions(WALLET).await.unwrap();
        let calls_after_first = ledger.owned_calls.load(Ordering::SeqCst);

        let ids: Vec<&str> = first.iter().map(|tx| tx.id.as_str()).collect();
        assert_eq!(ids, vec!["0xrx1", "0xfeed", "0xmed1", "0xinv3"]);
        for pair in first.windows(2) {
            assert!(pair[0].timestamp_ms >= pair[1].timestamp_ms);
        }

        assert_eq!(first[0].description, "Prescription for Amoxicillin");
        assert_eq!(first[0].patient_name.as_deref(), Some("PAT-7"));
        assert_eq!(first[2].description, "Medical record created");
        assert_eq!(first[3].patient_name.as_deref(), Some("PAT-7"));
        assert_eq!(first[3].doctor_name.as_deref(), Some("Dr. MD-551"));

        // No caching anywhere: a second assembly repeats every lookup and
        // produces the identical list
        let second = processor.user_transactions(WALLET).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            ledger.owned_calls.load(Ordering::SeqCst),
            calls_after_first * 2
        );
    }

    #[tokio::test]
    async fn resolver_distinguishes_resolved_from_fallback() {
        let ledger = MockLedger::default();
        register_patient(&ledger, PATIENT_ADDR, "PAT-7");
        register_doctor(&ledger, DOCTOR_ADDR, "MD-551");

        let timeout = Duration::from_secs(1);

        let name = resolver::patient_name(&ledger, PATIENT_ADDR, timeout).await;
        assert!(name.is_resolved());
        assert_eq!(name.into_display(), "PAT-7");

        let name = resolver::doctor_name(&ledger, DOCTOR_ADDR, timeout).await;
        assert!(name.is_resolved());
        assert_eq!(name.into_display(), "Dr. MD-551");

        // Nothing owned at the wallet address: address-derived defaults
        let name = resolver::patient_name(&ledger, WALLET, timeout).await;
        assert!(!name.is_resolved());
        assert_eq!(name.into_display(), "Patient aabbcc");

        let name = resolver::doctor_name(&ledger, WALLET, timeout).await;
        assert!(!name.is_resolved());
        assert_eq!(name.into_display(), "Dr. aabbcc");
    }

    #[tokio::test]
    async fn resolver_absorbs_lookup_failures() {
        let ledger = MockLedger::default();
        ledger.fail_owned.store(true, Ordering::SeqCst);

        let name = resolver::patient_name(&ledger, PATIENT_ADDR, Duration::from_secs(1)).await;
        assert!(!name.is_resolved());
        assert_eq!(name.into_display(), "Patient ddeeff");
    }

    #[tokio::test]
    async fn missing_address_resets_without_network_calls() {
        let ledger = Arc::new(MockLedger::default());
        let service = HistoryService::new(processor(ledger.clone()));

        service.set_address(Some(String::new())).await;
        assert_eq!(service.snapshot(), HistorySnapshot::default());

        service.set_address(None).await;
        service.refetch().await;
        assert_eq!(service.snapshot(), HistorySnapshot::default());

        assert_eq!(ledger.owned_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_error_preserves_previous_transactions() {
        let ledger = Arc::new(MockLedger::default());
        ledger.add_owned(
            WALLET,
            medipay_object(
                "0xinv4",
                "Invoice",
                json!({ "total_amount": "10", "created_at": "100" }),
            ),
        );

        let service = HistoryService::new(processor(ledger.clone()));
        service.set_address(Some(WALLET.to_string())).await;

        let healthy = service.snapshot();
        assert_eq!(healthy.transactions.len(), 1);
        assert!(healthy.error.is_none());
        assert!(!healthy.is_loading);

        ledger.fail_owned.store(true, Ordering::SeqCst);
        service.refetch().await;

        let degraded = service.snapshot();
        assert!(degraded.error.is_some());
        assert!(!degraded.is_loading);
        assert_eq!(degraded.transactions, healthy.transactions);
    }

    #[tokio::test]
    async fn superseded_fetch_is_discarded() {
        let ledger = Arc::new(MockLedger::default());
        ledger.add_owned(
            WALLET,
            medipay_object(
                "0xinv5",
                "Invoice",
                json!({ "total_amount": "10", "created_at": "100" }),
            ),
        );
        ledger.delay_ms.store(100, Ordering::SeqCst);

        let service = Arc::new(HistoryService::new(processor(ledger.clone())));

        let slow_service = service.clone();
        let slow = tokio::spawn(async move {
            slow_service.set_address(Some(WALLET.to_string())).await;
        });

        // Let the slow fetch claim its generation, then supersede it
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.set_address(None).await;
        slow.await.unwrap();

        assert_eq!(service.snapshot(), HistorySnapshot::default());
    }
}
