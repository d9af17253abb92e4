use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid Sui address format: {0}")]
    InvalidSuiAddress(String),
}

/// Sui addresses are 0x-prefixed hex of up to 32 bytes. Short forms such as
/// 0x6 are valid on chain and accepted here.
pub fn validate_sui_address(address: &str) -> Result<(), ValidationError> {
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    let Some(body) = address.strip_prefix("0x") else {
        return Err(ValidationError::InvalidSuiAddress(address.to_string()));
    };

    if body.is_empty() || body.len() > 64 {
        return Err(ValidationError::InvalidSuiAddress(address.to_string()));
    }

    // hex::decode wants an even digit count; pad short forms
    let padded = if body.len() % 2 == 1 {
        format!("0{body}")
    } else {
        body.to_string()
    };

    if hex::decode(&padded).is_err() {
        return Err(ValidationError::InvalidSuiAddress(address.to_string()));
    }

    Ok(())
}
