use crate::ledger::client::LedgerReader;
use crate::ledger::models::OwnedObject;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Outcome of a display-name lookup. Both variants carry a usable label; the
/// distinction exists so callers can tell a real profile hit from an
/// address-derived default without scraping logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedName {
    Resolved(String),
    Fallback(String),
}

impl ResolvedName {
    pub fn into_display(self) -> String {
        match self {
            ResolvedName::Resolved(name) | ResolvedName::Fallback(name) => name,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedName::Resolved(_))
    }
}

/// Patient display name for a wallet address: the `patient_id` of an owned
/// Patient object, else a truncated-address label. Never fails.
pub async fn patient_name<R: LedgerReader>(
    reader: &R,
    address: &str,
    lookup_timeout: Duration,
) -> ResolvedName {
    match find_owned(reader, address, "Patient", lookup_timeout).await {
        Some(object) => match field_text(&object.fields, "patient_id") {
            Some(id) => ResolvedName::Resolved(id),
            None => ResolvedName::Fallback(format!("Patient {}", address_fragment(address))),
        },
        None => ResolvedName::Fallback(format!("Patient {}", address_fragment(address))),
    }
}

/// Doctor display name for a wallet address: "Dr." plus the license number
/// of an owned DoctorCap, else a truncated-address label. Never fails.
pub async fn doctor_name<R: LedgerReader>(
    reader: &R,
    address: &str,
    lookup_timeout: Duration,
) -> ResolvedName {
    match find_owned(reader, address, "DoctorCap", lookup_timeout).await {
        Some(object) => match field_text(&object.fields, "license_number") {
            Some(license) => ResolvedName::Resolved(format!("Dr. {license}")),
            None => ResolvedName::Fallback(format!("Dr. {}", address_fragment(address))),
        },
        None => ResolvedName::Fallback(format!("Dr. {}", address_fragment(address))),
    }
}

/// First object owned by `address` whose type tag contains `kind`. One
/// network read per call, no caching; errors and timeouts are absorbed here.
async fn find_owned<R: LedgerReader>(
    reader: &R,
    address: &str,
    kind: &str,
    lookup_timeout: Duration,
) -> Option<OwnedObject> {
    match timeout(lookup_timeout, reader.owned_objects(address)).await {
        Ok(Ok(objects)) => objects.into_iter().find(|obj| obj.type_tag.contains(kind)),
        Ok(Err(e)) => {
            warn!("Failed to look up {} object for {}: {}", kind, address, e);
            None
        }
        Err(_) => {
            warn!("Timed out looking up {} object for {}", kind, address);
            None
        }
    }
}

// License numbers are occasionally stored as bare numbers
fn field_text(fields: &Value, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn address_fragment(address: &str) -> &str {
    let start = address.len().saturating_sub(6);
    &address[start..]
}
