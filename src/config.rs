//! Explicit configuration for the envelope protocol.
//!
//! There is no process-wide crypto state. Every `EnvelopeManager` carries
//! its own `EnvelopeConfig`, which can be built in code or loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SharevaultError};

/// Smallest accepted RSA modulus, in bits.
pub const MIN_RSA_BITS: usize = 2048;

/// Largest accepted RSA modulus, in bits.
pub const MAX_RSA_BITS: usize = 4096;

/// Default RSA modulus, in bits.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Tunables for key generation.
///
/// The symmetric side is fixed (AES-256-CBC, PKCS#7) and is not
/// configurable; see `crypto` for its constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvelopeConfig {
    /// Modulus size for newly generated RSA key pairs.
    pub rsa_bits: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            rsa_bits: DEFAULT_RSA_BITS,
        }
    }
}

impl EnvelopeConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields fall back to their defaults; unknown fields are
    /// rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SharevaultError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rsa_bits < MIN_RSA_BITS || self.rsa_bits > MAX_RSA_BITS {
            return Err(SharevaultError::InvalidConfig(format!(
                "rsa_bits must be between {} and {}, got {}",
                MIN_RSA_BITS, MAX_RSA_BITS, self.rsa_bits
            )));
        }
        if self.rsa_bits % 8 != 0 {
            return Err(SharevaultError::InvalidConfig(format!(
                "rsa_bits must be a multiple of 8, got {}",
                self.rsa_bits
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EnvelopeConfig::from_json("{}").unwrap();
        assert_eq!(config, EnvelopeConfig::default());
        assert_eq!(config.rsa_bits, 2048);
    }

    #[test]
    fn accepts_larger_modulus() {
        let config = EnvelopeConfig::from_json(r#"{ "rsa_bits": 3072 }"#).unwrap();
        assert_eq!(config.rsa_bits, 3072);
    }

    #[test]
    fn rejects_weak_and_odd_sizes() {
        for json in [
            r#"{ "rsa_bits": 1024 }"#,
            r#"{ "rsa_bits": 8192 }"#,
            r#"{ "rsa_bits": 2049 }"#,
        ] {
            assert!(matches!(
                EnvelopeConfig::from_json(json),
                Err(SharevaultError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(EnvelopeConfig::from_json(r#"{ "cipher": "des" }"#).is_err());
    }
}
