//! Furnistore - Self-hosted Furniture Store Billing & Catalog Service

use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use chrono::{DateTime, Utc};
use furnistore::{Bill, BillCharges, BillItem, BillEvent, ChargeSpec, DomainEvent, TaxMode};
use furnistore::format::{amount_in_words, format_inr};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid, pub sku: String, pub name: String, pub description: Option<String>,
    pub price: Decimal, pub currency: String, pub category_id: Option<Uuid>,
    pub inventory_quantity: i32, pub status: String, pub images: Vec<String>, pub tags: Vec<String>,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category { pub id: Uuid, pub name: String, pub slug: String, pub description: Option<String>, pub parent_id: Option<Uuid>, pub created_at: DateTime<Utc> }

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid, pub name: String, pub address: Option<String>, pub phone: Option<String>,
    pub default_tax_percentage: Option<Decimal>, pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BillRow {
    pub id: Uuid, pub bill_number: String, pub org_id: Uuid,
    pub customer_name: String, pub customer_phone: Option<String>,
    pub tax_mode: String,
    pub discount_amount: Option<Decimal>, pub discount_percentage: Option<Decimal>,
    pub tax_amount: Option<Decimal>, pub tax_percentage: Option<Decimal>,
    pub shipment: Decimal, pub installation: Decimal,
    pub subtotal: Decimal, pub discount: Decimal, pub tax: Decimal, pub total: Decimal,
    pub paid_amount: Decimal, pub due_amount: Decimal, pub payment_status: String,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BillItemRow { pub id: Uuid, pub bill_id: Uuid, pub product_id: Uuid, pub name: String, pub quantity: i32, pub unit_price: Decimal, pub line_total: Decimal }

#[derive(Clone)] pub struct AppState { pub db: sqlx::PgPool, pub nats: Option<async_nats::Client> }

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let db = PgPoolOptions::new().max_connections(10).connect(&std::env::var("DATABASE_URL")?).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let nats = std::env::var("NATS_URL").ok().and_then(|url| futures::executor::block_on(async_nats::connect(&url)).ok());
    let state = AppState { db, nats };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "furnistore"})) }))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/api/v1/categories", get(list_categories).post(create_category))
        .route("/api/v1/categories/:id", get(get_category))
        .route("/api/v1/organizations", post(create_organization))
        .route("/api/v1/organizations/:id", get(get_organization))
        .route("/api/v1/bills", get(list_bills).post(create_bill))
        .route("/api/v1/bills/verify/:id", get(verify_bill))
        .route("/api/v1/bills/:id", get(get_bill))
        .route("/api/v1/bills/:id/payment", put(record_payment))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    tracing::info!("🚀 Furnistore listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

async fn publish_events(state: &AppState, events: Vec<DomainEvent>) {
    let Some(nats) = &state.nats else { return };
    for event in events {
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
                    tracing::warn!("failed to publish {}: {}", event.subject(), e);
                }
            }
            Err(e) => tracing::warn!("failed to serialize event: {}", e),
        }
    }
}

fn bill_charges(row: &BillRow, default_tax_percentage: Option<Decimal>) -> BillCharges {
    BillCharges {
        tax_mode: TaxMode::parse(&row.tax_mode).unwrap_or_default(),
        discount: ChargeSpec { amount: row.discount_amount, percentage: row.discount_percentage },
        tax: ChargeSpec { amount: row.tax_amount, percentage: row.tax_percentage },
        shipment: row.shipment,
        installation: row.installation,
        default_tax_percentage,
    }
}

fn engine_items(rows: &[BillItemRow]) -> Vec<BillItem> {
    rows.iter().map(|r| BillItem { product_id: r.product_id.to_string(), name: r.name.clone(), unit_price: r.unit_price, quantity: r.quantity.max(0) as u32 }).collect()
}

async fn org_default_tax(db: &sqlx::PgPool, org_id: Uuid) -> Result<Option<Decimal>, sqlx::Error> {
    let row: Option<(Option<Decimal>,)> = sqlx::query_as("SELECT default_tax_percentage FROM organizations WHERE id = $1").bind(org_id).fetch_optional(db).await?;
    Ok(row.and_then(|r| r.0))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32>, pub category: Option<Uuid>, pub search: Option<String> }
#[derive(Debug, Serialize)] pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: i64, pub page: u32 }

async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Product>>, (StatusCode, String)> {
    let page = p.page.unwrap_or(1).max(1); let per_page = p.per_page.unwrap_or(20).min(100);
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE status = 'active' AND ($1::text IS NULL OR name ILIKE '%' || $1 || '%') AND ($2::uuid IS NULL OR category_id = $2) ORDER BY created_at DESC LIMIT $3 OFFSET $4")
        .bind(&p.search).bind(p.category).bind(per_page as i64).bind(((page-1)*per_page) as i64).fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE status = 'active' AND ($1::text IS NULL OR name ILIKE '%' || $1 || '%') AND ($2::uuid IS NULL OR category_id = $2)")
        .bind(&p.search).bind(p.category).fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(PaginatedResponse { data: products, total: total.0, page }))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>, (StatusCode, String)> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.map(Json).ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))
}

#[derive(Debug, Deserialize)] pub struct CreateProductRequest { pub name: String, pub description: Option<String>, pub price: Decimal, pub category_id: Option<Uuid>, pub inventory_quantity: Option<i32> }

async fn create_product(State(s): State<AppState>, Json(r): Json<CreateProductRequest>) -> Result<(StatusCode, Json<Product>), (StatusCode, String)> {
    let sku = format!("SKU-{:08}", rand::random::<u32>());
    let p = sqlx::query_as::<_, Product>("INSERT INTO products (id, sku, name, description, price, currency, category_id, inventory_quantity, status, images, tags, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, 'INR', $6, $7, 'active', '{}', '{}', NOW(), NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(&sku).bind(&r.name).bind(&r.description).bind(r.price).bind(r.category_id).bind(r.inventory_quantity.unwrap_or(0))
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(p)))
}

async fn update_product(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<CreateProductRequest>) -> Result<Json<Product>, (StatusCode, String)> {
    let p = sqlx::query_as::<_, Product>("UPDATE products SET name = $2, description = $3, price = $4, category_id = $5, inventory_quantity = $6, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(&r.name).bind(&r.description).bind(r.price).bind(r.category_id).bind(r.inventory_quantity.unwrap_or(0))
        .fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    Ok(Json(p))
}

async fn delete_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, (StatusCode, String)> {
    sqlx::query("UPDATE products SET status = 'deleted' WHERE id = $1").bind(id).execute(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>, (StatusCode, String)> {
    let cats = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name").fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(cats))
}

async fn get_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Category>, (StatusCode, String)> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.map(Json).ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))
}

#[derive(Debug, Deserialize)] pub struct CreateCategoryRequest { pub name: String, pub description: Option<String>, pub parent_id: Option<Uuid> }

async fn create_category(State(s): State<AppState>, Json(r): Json<CreateCategoryRequest>) -> Result<(StatusCode, Json<Category>), (StatusCode, String)> {
    let slug = r.name.to_lowercase().replace(' ', "-");
    let c = sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, slug, description, parent_id, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(&r.name).bind(&slug).bind(&r.description).bind(r.parent_id)
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(c)))
}

// ---------------------------------------------------------------------------
// Organizations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)] pub struct CreateOrganizationRequest { pub name: String, pub address: Option<String>, pub phone: Option<String>, pub default_tax_percentage: Option<Decimal> }

async fn create_organization(State(s): State<AppState>, Json(r): Json<CreateOrganizationRequest>) -> Result<(StatusCode, Json<Organization>), (StatusCode, String)> {
    let o = sqlx::query_as::<_, Organization>("INSERT INTO organizations (id, name, address, phone, default_tax_percentage, created_at) VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(&r.name).bind(&r.address).bind(&r.phone).bind(r.default_tax_percentage)
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(o)))
}

async fn get_organization(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Organization>, (StatusCode, String)> {
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.map(Json).ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))
}

// ---------------------------------------------------------------------------
// Bills
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)] pub struct BillResponse { pub bill: BillRow, pub items: Vec<BillItemRow> }
#[derive(Debug, Serialize)] pub struct VerifyBillResponse { pub bill: BillRow, pub items: Vec<BillItemRow>, pub total_in_words: String, pub display_total: String }

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBillRequest {
    pub org_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub customer_name: String,
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub tax_mode: TaxMode,
    #[validate(length(min = 1))]
    pub items: Vec<BillItemRequest>,
    pub discount_amount: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub tax_percentage: Option<Decimal>,
    pub shipment: Option<Decimal>,
    pub installation: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)] pub struct BillItemRequest { pub product_id: Uuid, pub quantity: u32 }

async fn list_bills(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<BillRow>>, (StatusCode, String)> {
    let page = p.page.unwrap_or(1).max(1); let per_page = p.per_page.unwrap_or(20).min(100);
    let bills = sqlx::query_as::<_, BillRow>("SELECT * FROM bills ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(per_page as i64).bind(((page-1)*per_page) as i64).fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bills").fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(PaginatedResponse { data: bills, total: total.0, page }))
}

/// Authoritative bill creation: prices come from the catalog, duplicate
/// products merge into one line, and the persisted totals are the output of
/// the same engine the storefront preview runs.
async fn create_bill(State(s): State<AppState>, Json(r): Json<CreateBillRequest>) -> Result<(StatusCode, Json<BillResponse>), (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if r.items.iter().any(|i| i.quantity == 0) {
        return Err((StatusCode::BAD_REQUEST, "item quantity must be at least 1".to_string()));
    }
    let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1").bind(r.org_id)
        .fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Organization not found".to_string()))?;

    let bill_number = format!("BILL-{:08}", rand::random::<u32>());
    let mut bill = Bill::create(bill_number, r.org_id.to_string(), r.customer_name.as_str(), r.tax_mode);
    if let Some(phone) = &r.customer_phone { bill.set_customer_phone(phone.as_str()); }
    bill.set_default_tax_percentage(org.default_tax_percentage);

    for item in &r.items {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND status = 'active'").bind(item.product_id)
            .fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
            .ok_or((StatusCode::BAD_REQUEST, format!("Product {} not found", item.product_id)))?;
        bill.add_item(BillItem { product_id: product.id.to_string(), name: product.name.clone(), unit_price: product.price, quantity: item.quantity });
    }

    bill.set_discount(ChargeSpec { amount: r.discount_amount, percentage: r.discount_percentage });
    bill.set_tax(ChargeSpec { amount: r.tax_amount, percentage: r.tax_percentage });
    bill.set_shipment(r.shipment.unwrap_or(Decimal::ZERO));
    bill.set_installation(r.installation.unwrap_or(Decimal::ZERO));
    bill.finalize();
    if let Some(paid) = r.paid_amount { if paid > Decimal::ZERO { bill.record_payment(paid); } }

    let bill_id = Uuid::parse_str(bill.id()).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let totals = bill.totals().clone();
    let charges = bill.charges().clone();

    let mut tx = s.db.begin().await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let row = sqlx::query_as::<_, BillRow>("INSERT INTO bills (id, bill_number, org_id, customer_name, customer_phone, tax_mode, discount_amount, discount_percentage, tax_amount, tax_percentage, shipment, installation, subtotal, discount, tax, total, paid_amount, due_amount, payment_status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, NOW(), NOW()) RETURNING *")
        .bind(bill_id).bind(bill.bill_number()).bind(r.org_id).bind(bill.customer_name()).bind(bill.customer_phone())
        .bind(charges.tax_mode.as_str()).bind(charges.discount.amount).bind(charges.discount.percentage)
        .bind(charges.tax.amount).bind(charges.tax.percentage).bind(charges.shipment).bind(charges.installation)
        .bind(totals.subtotal).bind(totals.discount).bind(totals.tax).bind(totals.total)
        .bind(bill.paid_amount()).bind(totals.due_amount).bind(totals.payment_status.as_str())
        .fetch_one(&mut *tx).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut item_rows = Vec::with_capacity(bill.items().len());
    for item in bill.items() {
        let product_id = Uuid::parse_str(&item.product_id).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        let row = sqlx::query_as::<_, BillItemRow>("INSERT INTO bill_items (id, bill_id, product_id, name, quantity, unit_price, line_total) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *")
            .bind(Uuid::now_v7()).bind(bill_id).bind(product_id).bind(&item.name).bind(item.quantity as i32).bind(item.unit_price).bind(item.line_total())
            .fetch_one(&mut *tx).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        item_rows.push(row);
    }
    tx.commit().await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    publish_events(&s, bill.take_events()).await;
    Ok((StatusCode::CREATED, Json(BillResponse { bill: row, items: item_rows })))
}

async fn fetch_bill(db: &sqlx::PgPool, id: Uuid) -> Result<(BillRow, Vec<BillItemRow>), (StatusCode, String)> {
    let bill = sqlx::query_as::<_, BillRow>("SELECT * FROM bills WHERE id = $1").bind(id)
        .fetch_optional(db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    let items = sqlx::query_as::<_, BillItemRow>("SELECT * FROM bill_items WHERE bill_id = $1 ORDER BY name").bind(id)
        .fetch_all(db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((bill, items))
}

async fn get_bill(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BillResponse>, (StatusCode, String)> {
    let (bill, items) = fetch_bill(&s.db, id).await?;
    Ok(Json(BillResponse { bill, items }))
}

/// Public verification view for a printed invoice: the stored bill plus the
/// word and grouped renderings of its total.
async fn verify_bill(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<VerifyBillResponse>, (StatusCode, String)> {
    let (bill, items) = fetch_bill(&s.db, id).await?;
    let total_in_words = amount_in_words(bill.total);
    let display_total = format_inr(bill.total);
    Ok(Json(VerifyBillResponse { bill, items, total_in_words, display_total }))
}

#[derive(Debug, Deserialize)] pub struct RecordPaymentRequest { pub amount: Decimal }

/// Record a payment and re-derive due amount and status through the engine,
/// never by adjusting stored columns directly.
async fn record_payment(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<RecordPaymentRequest>) -> Result<Json<BillResponse>, (StatusCode, String)> {
    if r.amount <= Decimal::ZERO {
        return Err((StatusCode::BAD_REQUEST, "payment amount must be positive".to_string()));
    }
    let (bill, item_rows) = fetch_bill(&s.db, id).await?;
    let default_tax = org_default_tax(&s.db, bill.org_id).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let charges = bill_charges(&bill, default_tax);
    let items = engine_items(&item_rows);
    let paid_amount = bill.paid_amount + r.amount;
    let totals = furnistore::compute(&items, &charges, paid_amount);

    let updated = sqlx::query_as::<_, BillRow>("UPDATE bills SET subtotal = $2, discount = $3, tax = $4, total = $5, paid_amount = $6, due_amount = $7, payment_status = $8, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(totals.subtotal).bind(totals.discount).bind(totals.tax).bind(totals.total)
        .bind(paid_amount).bind(totals.due_amount).bind(totals.payment_status.as_str())
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    publish_events(&s, vec![DomainEvent::Bill(BillEvent::PaymentRecorded {
        bill_id: id.to_string(),
        amount: r.amount,
        due_amount: totals.due_amount,
        status: totals.payment_status,
    })]).await;

    Ok(Json(BillResponse { bill: updated, items: item_rows }))
}
