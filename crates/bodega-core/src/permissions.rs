//! # Module Access
//!
//! Maps granted permission strings to the back-office modules a user may
//! open. Computed fresh on every request from whatever the auth layer
//! hands over; nothing is cached.
//!
//! Permission strings follow the `app.action_model` convention:
//!
//! ```text
//! inventory.view_stockmovement   ─┐
//! inventory.view_stockbalance    ─┼─► inventory
//! catalog.view_product           ─┘   (also grants catalog)
//! catalog.view_supplier          ───► catalog
//! catalog.view_category          ───► catalog
//! purchases.view_purchase        ───► purchases
//! sales.view_sale                ───► sales
//! invoices.view_invoice          ───► invoices
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

/// Which modules the navigation should show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ModuleAccess {
    pub inventory: bool,
    pub purchases: bool,
    pub catalog: bool,
    pub sales: bool,
    pub invoices: bool,
}

impl ModuleAccess {
    /// No access at all (anonymous user).
    pub const fn none() -> Self {
        ModuleAccess {
            inventory: false,
            purchases: false,
            catalog: false,
            sales: false,
            invoices: false,
        }
    }

    /// Computes access from granted permission strings.
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::permissions::ModuleAccess;
    ///
    /// let access = ModuleAccess::from_permissions(["sales.view_sale", "catalog.view_product"]);
    /// assert!(access.sales);
    /// assert!(access.catalog);
    /// assert!(access.inventory);
    /// assert!(!access.purchases);
    /// ```
    pub fn from_permissions<I, S>(granted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let granted: HashSet<String> = granted
            .into_iter()
            .map(|p| p.as_ref().trim().to_ascii_lowercase())
            .collect();
        let has = |perm: &str| granted.contains(perm);

        ModuleAccess {
            inventory: has("inventory.view_stockmovement")
                || has("inventory.view_stockbalance")
                || has("catalog.view_product"),
            purchases: has("purchases.view_purchase"),
            catalog: has("catalog.view_product")
                || has("catalog.view_supplier")
                || has("catalog.view_category"),
            sales: has("sales.view_sale"),
            invoices: has("invoices.view_invoice"),
        }
    }

    /// True if at least one module is visible.
    pub fn any(&self) -> bool {
        self.inventory || self.purchases || self.catalog || self.sales || self.invoices
    }
}
