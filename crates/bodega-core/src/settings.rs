//! Business settings consumed by the ledger rules.
//!
//! Loaded from the environment by `bodega_db::config::AppConfig`; the
//! defaults below are what a fresh install uses.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::TaxRate;

/// Default days between a credit sale and its due date.
pub const DEFAULT_CREDIT_TERM_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerSettings {
    /// Tax rate applied to new purchases when none is given.
    pub purchase_tax_rate: TaxRate,
    /// Days until a credit sale's receivable is due.
    pub credit_term_days: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            purchase_tax_rate: TaxRate::STANDARD,
            credit_term_days: DEFAULT_CREDIT_TERM_DAYS,
        }
    }
}
