//! Environment-driven configuration

use bigdecimal::BigDecimal;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::types::*;
use crate::verification::VerifierLimits;

pub const DEFAULT_PAYMENT_AMOUNT: &str = "500.00";
pub const DEFAULT_RECIPIENT_NAMES: &str = "ЦЕРКОВЬ СЛОВО ЖИЗНИ_SBP|МЕСТНАЯ РЕЛИГИОЗНАЯ ОРГАНИЗАЦИЯ ХРИСТИАН ВЕРЫ ЕВАНГЕЛЬСКОЙ (ПЯТИДЕСЯТНИКОВ) ЦЕРКОВЬ \"СЛОВО ЖИЗНИ\" САРАТОВ";
pub const DEFAULT_RECIPIENT_TAX_ID: &str = "6453041398";
pub const DEFAULT_RECIPIENT_BANKS: &str = "ПАО СБЕРБАНК|СБЕРБАНК";

/// Separator for multi-valued settings
const LIST_SEPARATOR: char = '|';

/// Limits on how receipt verification is scheduled by the registration desk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskLimits {
    /// Verifications allowed to run at once
    pub max_concurrent_verifications: usize,
    /// Host-level timeout around a single verification
    pub verification_timeout: Duration,
}

impl Default for DeskLimits {
    fn default() -> Self {
        Self {
            max_concurrent_verifications: 4,
            verification_timeout: Duration::from_secs(30),
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub expected_facts: ExpectedPaymentFacts,
    pub verifier_limits: VerifierLimits,
    pub desk_limits: DeskLimits,
}

impl AppConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> RegistrationResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> RegistrationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let amount: BigDecimal = try_load(&lookup, "PAYMENT_AMOUNT", DEFAULT_PAYMENT_AMOUNT)?;
        let names = load_list(&lookup, "PAYMENT_RECIPIENT_NAMES", DEFAULT_RECIPIENT_NAMES);
        let tax_id: String = try_load(&lookup, "PAYMENT_RECIPIENT_TAX_ID", DEFAULT_RECIPIENT_TAX_ID)?;
        let banks = load_list(&lookup, "PAYMENT_RECIPIENT_BANKS", DEFAULT_RECIPIENT_BANKS);
        let expected_facts = ExpectedPaymentFacts::new(amount, names, tax_id, banks)?;

        let defaults = VerifierLimits::default();
        let verifier_limits = VerifierLimits {
            max_document_bytes: try_load(
                &lookup,
                "RECEIPT_MAX_BYTES",
                &defaults.max_document_bytes.to_string(),
            )?,
            max_pages: try_load(&lookup, "RECEIPT_MAX_PAGES", &defaults.max_pages.to_string())?,
            parse_budget: Duration::from_millis(try_load(
                &lookup,
                "RECEIPT_PARSE_BUDGET_MS",
                &defaults.parse_budget.as_millis().to_string(),
            )?),
            max_text_chars: try_load(
                &lookup,
                "RECEIPT_MAX_TEXT_CHARS",
                &defaults.max_text_chars.to_string(),
            )?,
            max_decompressed_bytes: try_load(
                &lookup,
                "RECEIPT_MAX_DECOMPRESSED_BYTES",
                &defaults.max_decompressed_bytes.to_string(),
            )?,
        };

        let defaults = DeskLimits::default();
        let desk_limits = DeskLimits {
            max_concurrent_verifications: try_load(
                &lookup,
                "VERIFICATION_CONCURRENCY",
                &defaults.max_concurrent_verifications.to_string(),
            )?,
            verification_timeout: Duration::from_millis(try_load(
                &lookup,
                "VERIFICATION_TIMEOUT_MS",
                &defaults.verification_timeout.as_millis().to_string(),
            )?),
        };

        if desk_limits.max_concurrent_verifications == 0 {
            return Err(RegistrationError::Config(
                "VERIFICATION_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            expected_facts,
            verifier_limits,
            desk_limits,
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> RegistrationResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            RegistrationError::Config(format!("Invalid {key} value: {e}"))
        })
}

fn load_list<F>(lookup: &F, key: &str, default: &str) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default");
        default.to_string()
    });

    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
