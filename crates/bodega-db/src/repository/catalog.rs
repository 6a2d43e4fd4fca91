//! # Catalog Repository
//!
//! Reference data the ledger works against: suppliers, categories,
//! customers and products.
//!
//! ## Product Rows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_product(input)                                                  │
//! │       │                                                                 │
//! │       ├── input.validate()            barcode digits, tax 0-15%, ...   │
//! │       │                                                                 │
//! │       ▼  one transaction                                                │
//! │  INSERT products ──► INSERT stock_balances (quantity 0)                │
//! │                                                                         │
//! │  Products are never hard-deleted once referenced: document lines and   │
//! │  movements hold them with ON DELETE RESTRICT. `deactivate_product`     │
//! │  hides them from the POS instead.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bodega_core::catalog::{clean_optional, NewCategory, NewCustomer, NewProduct, NewSupplier, ProductUpdate};
use bodega_core::validation::validate_search_query;
use bodega_core::{new_id, Category, Customer, Product, Supplier};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const PRODUCT_SELECT: &str = r#"
    SELECT id, name, barcode, supplier_id, category_id,
           sale_price_cents, average_cost_cents, min_stock, tax_rate_bps,
           is_active, created_at, updated_at
    FROM products
"#;

// =============================================================================
// Connection Helpers
// =============================================================================

/// Loads a product inside an open transaction.
pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    let sql = format!("{} WHERE id = ?", PRODUCT_SELECT);
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
}

pub(crate) async fn customer_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Turns a UNIQUE failure on `field` into a readable duplicate error.
fn duplicate_of(err: DbError, field: &str, value: Option<&str>) -> DbError {
    match err {
        DbError::UniqueViolation { .. } => DbError::duplicate(field, value.unwrap_or_default()),
        other => other,
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reference data.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Suppliers
    // -------------------------------------------------------------------------

    pub async fn create_supplier(&self, input: &NewSupplier) -> DbResult<Supplier> {
        input.validate()?;

        let supplier = Supplier {
            id: new_id(),
            name: input.name.trim().to_string(),
            rtn: clean_optional(input.rtn.as_deref()),
            phone: clean_optional(input.phone.as_deref()),
            email: clean_optional(input.email.as_deref()),
            contact: clean_optional(input.contact.as_deref()),
            address: clean_optional(input.address.as_deref()),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %supplier.id, name = %supplier.name, "Creating supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, rtn, phone, email, contact, address, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.rtn)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.contact)
        .bind(&supplier.address)
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, rtn, phone, email, contact, address, is_active, created_at
            FROM suppliers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn list_suppliers(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, rtn, phone, email, contact, address, is_active, created_at
            FROM suppliers
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    pub async fn create_category(&self, input: &NewCategory) -> DbResult<Category> {
        input.validate()?;

        let category = Category {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: clean_optional(input.description.as_deref()),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, is_active, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_of(e.into(), "category name", Some(&category.name)))?;

        Ok(category)
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, is_active, created_at
            FROM categories
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    pub async fn create_customer(&self, input: &NewCustomer) -> DbResult<Customer> {
        input.validate()?;

        let customer = Customer {
            id: new_id(),
            name: input.name.trim().to_string(),
            email: clean_optional(input.email.as_deref()).map(|e| e.to_lowercase()),
            phone: clean_optional(input.phone.as_deref()),
            is_guest: input.is_guest,
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, is_guest, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.is_guest)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_of(e.into(), "email", customer.email.as_deref()))?;

        Ok(customer)
    }

    pub async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, phone, is_guest, created_at FROM customers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Creates a product together with its zero balance row.
    pub async fn create_product(&self, input: &NewProduct) -> DbResult<Product> {
        input.validate()?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            name: input.name.trim().to_string(),
            barcode: clean_optional(input.barcode.as_deref()),
            supplier_id: clean_optional(input.supplier_id.as_deref()),
            category_id: clean_optional(input.category_id.as_deref()),
            sale_price_cents: input.sale_price_cents,
            average_cost_cents: input.average_cost_cents,
            min_stock: input.min_stock,
            tax_rate_bps: input.tax_rate_bps,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Creating product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, barcode, supplier_id, category_id,
                sale_price_cents, average_cost_cents, min_stock, tax_rate_bps,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.supplier_id)
        .bind(&product.category_id)
        .bind(product.sale_price_cents)
        .bind(product.average_cost_cents)
        .bind(product.min_stock)
        .bind(product.tax_rate_bps)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_of(e.into(), "barcode", product.barcode.as_deref()))?;

        sqlx::query("INSERT INTO stock_balances (product_id, quantity, updated_at) VALUES (?, 0, ?)")
            .bind(&product.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("{} WHERE id = ?", PRODUCT_SELECT);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by barcode (scanner input).
    pub async fn get_product_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("{} WHERE barcode = ?", PRODUCT_SELECT);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Applies a partial update. A blank barcode clears it.
    pub async fn update_product(&self, id: &str, changes: &ProductUpdate) -> DbResult<Product> {
        changes.validate()?;

        let mut conn = self.pool.acquire().await?;
        let mut product = fetch_product(&mut *conn, id).await?;

        if let Some(name) = &changes.name {
            product.name = name.trim().to_string();
        }
        if let Some(barcode) = &changes.barcode {
            product.barcode = clean_optional(Some(barcode));
        }
        if let Some(cents) = changes.sale_price_cents {
            product.sale_price_cents = cents;
        }
        if let Some(cents) = changes.average_cost_cents {
            product.average_cost_cents = cents;
        }
        if let Some(units) = changes.min_stock {
            product.min_stock = units;
        }
        if let Some(bps) = changes.tax_rate_bps {
            product.tax_rate_bps = bps;
        }
        product.updated_at = Utc::now();

        debug!(id = %id, "Updating product");

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?, barcode = ?, sale_price_cents = ?, average_cost_cents = ?,
                min_stock = ?, tax_rate_bps = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.sale_price_cents)
        .bind(product.average_cost_cents)
        .bind(product.min_stock)
        .bind(product.tax_rate_bps)
        .bind(product.updated_at)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| duplicate_of(e.into(), "barcode", product.barcode.as_deref()))?;

        Ok(product)
    }

    /// Soft-deletes a product by setting is_active = false.
    pub async fn deactivate_product(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Active products whose name contains `query` or whose barcode starts
    /// with it. An empty query lists active products.
    pub async fn search_products(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active_products(limit).await;
        }

        let sql = format!(
            "{} WHERE is_active = 1 AND (name LIKE ? OR barcode LIKE ?) ORDER BY name LIMIT ?",
            PRODUCT_SELECT
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(format!("%{}%", query))
            .bind(format!("{}%", query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    pub async fn list_active_products(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!("{} WHERE is_active = 1 ORDER BY name LIMIT ?", PRODUCT_SELECT);
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts active products (for diagnostics).
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_create_product_starts_with_zero_balance() {
        let db = test_db().await;
        let mut input = NewProduct::new("Arroz Progreso 1lb", 2500);
        input.barcode = Some("7401234567890".to_string());

        let product = db.catalog().create_product(&input).await.unwrap();
        assert_eq!(db.stock().balance(&product.id).await.unwrap(), 0);

        let by_barcode = db
            .catalog()
            .get_product_by_barcode("7401234567890")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_barcode.id, product.id);
        assert_eq!(by_barcode.tax_rate_bps, 1500);
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = test_db().await;
        let mut input = NewProduct::new("Frijol", 3000);
        input.barcode = Some("74000001".to_string());
        db.catalog().create_product(&input).await.unwrap();

        input.name = "Frijol rojo".to_string();
        let err = db.catalog().create_product(&input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "barcode"));
        assert_eq!(db.catalog().count_products().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_product_never_reaches_database() {
        let db = test_db().await;
        let mut input = NewProduct::new("Aceite", 9000);
        input.tax_rate_bps = 1800;

        let err = db.catalog().create_product(&input).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
        assert_eq!(db.catalog().count_products().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_and_deactivate() {
        let db = test_db().await;
        let coffee = db
            .catalog()
            .create_product(&NewProduct::new("Café Molido", 8000))
            .await
            .unwrap();
        db.catalog()
            .create_product(&NewProduct::new("Azúcar", 2000))
            .await
            .unwrap();

        let found = db.catalog().search_products("caf", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, coffee.id);

        assert_eq!(db.catalog().search_products("", 10).await.unwrap().len(), 2);

        db.catalog().deactivate_product(&coffee.id).await.unwrap();
        assert!(db.catalog().search_products("caf", 10).await.unwrap().is_empty());
        assert_eq!(db.catalog().count_products().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_product() {
        let db = test_db().await;
        let product = db
            .catalog()
            .create_product(&NewProduct::new("Leche", 3200))
            .await
            .unwrap();

        let changes = ProductUpdate {
            sale_price_cents: Some(3500),
            tax_rate_bps: Some(0),
            min_stock: Some(6),
            ..Default::default()
        };
        let updated = db.catalog().update_product(&product.id, &changes).await.unwrap();
        assert_eq!(updated.sale_price_cents, 3500);
        assert_eq!(updated.tax_rate_bps, 0);

        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.min_stock, 6);
        assert_eq!(stored.name, "Leche");

        let err = db.catalog().update_product("missing", &changes).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_customers_and_suppliers() {
        let db = test_db().await;
        let mut input = NewCustomer::named("María Pérez");
        input.email = Some("Maria@Example.com".to_string());
        let customer = db.catalog().create_customer(&input).await.unwrap();
        assert_eq!(customer.email.as_deref(), Some("maria@example.com"));
        assert!(db.catalog().get_customer(&customer.id).await.unwrap().is_some());

        let err = db.catalog().create_customer(&input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let supplier = db
            .catalog()
            .create_supplier(&NewSupplier::named("Distribuidora Central"))
            .await
            .unwrap();
        assert_eq!(db.catalog().list_suppliers().await.unwrap()[0].id, supplier.id);
    }
}
