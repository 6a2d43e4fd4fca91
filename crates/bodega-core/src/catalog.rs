//! # Catalog Inputs
//!
//! Create/update payloads for reference data. Each one validates itself
//! before bodega-db touches the database.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::validation::{
    validate_barcode, validate_customer_phone, validate_email, validate_min_stock, validate_name,
    validate_non_negative_cents, validate_phone, validate_product_tax_bps, validate_rtn,
    ValidationResult,
};
use crate::MAX_PRODUCT_TAX_BPS;

/// Trims an optional text field; blank becomes `None`.
pub fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    pub rtn: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
}

impl NewSupplier {
    pub fn named(name: impl Into<String>) -> Self {
        NewSupplier {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name, 150)?;
        if let Some(rtn) = clean_optional(self.rtn.as_deref()) {
            validate_rtn(&rtn)?;
        }
        if let Some(phone) = clean_optional(self.phone.as_deref()) {
            validate_phone(&phone)?;
        }
        if let Some(email) = clean_optional(self.email.as_deref()) {
            validate_email(&email)?;
        }
        if let Some(contact) = clean_optional(self.contact.as_deref()) {
            validate_name("contact", &contact, 100)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name, 100)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_guest: bool,
}

impl NewCustomer {
    pub fn named(name: impl Into<String>) -> Self {
        NewCustomer {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name, 150)?;
        if let Some(email) = clean_optional(self.email.as_deref()) {
            validate_email(&email)?;
        }
        if let Some(phone) = clean_optional(self.phone.as_deref()) {
            validate_customer_phone(&phone)?;
        }
        Ok(())
    }
}

/// New catalog product. Amounts in cents, tax in basis points.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub barcode: Option<String>,
    pub supplier_id: Option<String>,
    pub category_id: Option<String>,
    pub sale_price_cents: i64,
    #[serde(default)]
    pub average_cost_cents: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default = "default_tax_bps")]
    pub tax_rate_bps: u32,
}

fn default_tax_bps() -> u32 {
    MAX_PRODUCT_TAX_BPS
}

impl NewProduct {
    /// Product with the standard 15% rate and no stock threshold.
    pub fn new(name: impl Into<String>, sale_price_cents: i64) -> Self {
        NewProduct {
            name: name.into(),
            barcode: None,
            supplier_id: None,
            category_id: None,
            sale_price_cents,
            average_cost_cents: 0,
            min_stock: 0,
            tax_rate_bps: default_tax_bps(),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name, 150)?;
        if let Some(barcode) = clean_optional(self.barcode.as_deref()) {
            validate_barcode(&barcode)?;
        }
        validate_non_negative_cents("sale_price", self.sale_price_cents)?;
        validate_non_negative_cents("average_cost", self.average_cost_cents)?;
        validate_min_stock(self.min_stock)?;
        validate_product_tax_bps(self.tax_rate_bps)
    }
}

/// Partial product update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub sale_price_cents: Option<i64>,
    pub average_cost_cents: Option<i64>,
    pub min_stock: Option<i64>,
    pub tax_rate_bps: Option<u32>,
}

impl ProductUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name, 150)?;
        }
        if let Some(barcode) = clean_optional(self.barcode.as_deref()) {
            validate_barcode(&barcode)?;
        }
        if let Some(cents) = self.sale_price_cents {
            validate_non_negative_cents("sale_price", cents)?;
        }
        if let Some(cents) = self.average_cost_cents {
            validate_non_negative_cents("average_cost", cents)?;
        }
        if let Some(units) = self.min_stock {
            validate_min_stock(units)?;
        }
        if let Some(bps) = self.tax_rate_bps {
            validate_product_tax_bps(bps)?;
        }
        Ok(())
    }
}
