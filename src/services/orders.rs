use crate::{
    config::OrderDefaults,
    db::{self, DbPool},
    entities::{
        order::{self, Entity as OrderEntity},
        product::{self, Entity as ProductEntity},
        sale::{self, Entity as SaleEntity},
        times::{self, Entity as TimesEntity},
    },
    errors::ServiceError,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, Order as SeaOrder, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Row cap of the recent sales feed
pub const RECENT_SALES_LIMIT: u64 = 50;

/// Input of the order placement sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceOrderRequest {
    pub product_id: i32,
    pub quantity: i32,
}

/// Time dimension key chosen for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKey {
    /// A row exists for the processing date
    Today(NaiveDate),
    /// No same-day row; the latest known key was substituted
    Fallback(NaiveDate),
}

impl TimeKey {
    pub fn date(&self) -> NaiveDate {
        match self {
            TimeKey::Today(d) | TimeKey::Fallback(d) => *d,
        }
    }
}

/// Outcome of a committed order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: i64,
    pub time_key: TimeKey,
    pub unit_price: Decimal,
    pub order_total: Decimal,
}

/// Catalog, sales feed and order placement over the shared pool.
///
/// Every call borrows one pooled connection for its duration; nothing is
/// cached between calls.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    defaults: OrderDefaults,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, defaults: OrderDefaults) -> Self {
        Self { db_pool, defaults }
    }

    /// All products, sorted by name
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        ProductEntity::find()
            .order_by_asc(product::Column::ProdName)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list products");
                ServiceError::StoreFailure(e)
            })
    }

    /// Newest sales first, capped at [`RECENT_SALES_LIMIT`] rows.
    ///
    /// Ties on the time key are broken by physical row position, newest first,
    /// where the backend exposes one.
    #[instrument(skip(self))]
    pub async fn recent_sales(&self) -> Result<Vec<sale::Model>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = SaleEntity::find().order_by_desc(sale::Column::TimeId);
        if let Some(row_column) = db::physical_row_column(db.get_database_backend()) {
            query = query.order_by(Expr::cust(row_column), SeaOrder::Desc);
        }

        query.limit(RECENT_SALES_LIMIT).all(db).await.map_err(|e| {
            error!(error = %e, "Failed to list recent sales");
            ServiceError::StoreFailure(e)
        })
    }

    /// Places an order dated now
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder, ServiceError> {
        self.place_order_at(request, Utc::now()).await
    }

    /// Places an order as if processed at `now`.
    ///
    /// Writes one order row and one sale row in a single transaction; on any
    /// error the transaction is rolled back and nothing is persisted.
    #[instrument(skip(self, request), fields(product_id = request.product_id, quantity = request.quantity))]
    pub async fn place_order_at(
        &self,
        request: PlaceOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order placement");
            ServiceError::StoreFailure(e)
        })?;

        let placed = match self.write_order(&txn, request, now).await {
            Ok(placed) => placed,
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "Failed to roll back order transaction");
                }
                return Err(err);
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = placed.order_id, "Failed to commit order transaction");
            ServiceError::StoreFailure(e)
        })?;

        info!(
            order_id = placed.order_id,
            product_id = request.product_id,
            quantity = request.quantity,
            order_total = %placed.order_total,
            time_id = %placed.time_key.date(),
            "Order placed"
        );

        Ok(placed)
    }

    async fn write_order(
        &self,
        txn: &DatabaseTransaction,
        request: PlaceOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, ServiceError> {
        // Race-prone under concurrent placement; uniqueness is left to the store.
        let order_id = next_order_id(txn).await?;
        let time_key = resolve_time_key(txn, now.date_naive()).await?;
        let unit_price = product_price(txn, request.product_id).await?;
        let order_total = unit_price
            .checked_mul(Decimal::from(request.quantity))
            .ok_or_else(|| {
                warn!(
                    product_id = request.product_id,
                    quantity = request.quantity,
                    "Order total overflows"
                );
                ServiceError::Internal(format!(
                    "order total overflows for product {}",
                    request.product_id
                ))
            })?;

        let order_row = order::ActiveModel {
            order_id: Set(order_id),
            order_date: Set(now),
            order_mode: Set(self.defaults.order_mode.clone()),
            customer_id: Set(self.defaults.customer_id),
            order_status: Set(self.defaults.order_status),
            order_total: Set(order_total),
            sales_rep_id: Set(None),
            promotion_id: Set(None),
        };
        OrderEntity::insert(order_row)
            .exec_without_returning(txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id, "Failed to insert order");
                ServiceError::StoreFailure(e)
            })?;

        let sale_row = sale::ActiveModel {
            prod_id: Set(request.product_id),
            cust_id: Set(self.defaults.customer_id),
            time_id: Set(time_key.date()),
            channel_id: Set(self.defaults.channel_id),
            promo_id: Set(self.defaults.promo_id),
            quantity_sold: Set(request.quantity),
            amount_sold: Set(order_total),
        };
        SaleEntity::insert(sale_row)
            .exec_without_returning(txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id, "Failed to insert sale");
                ServiceError::StoreFailure(e)
            })?;

        Ok(PlacedOrder {
            order_id,
            time_key,
            unit_price,
            order_total,
        })
    }
}

/// One more than the highest order id, or 1 for an empty table
pub async fn next_order_id<C: ConnectionTrait>(conn: &C) -> Result<i64, ServiceError> {
    let current = OrderEntity::find()
        .select_only()
        .column_as(
            Expr::col((OrderEntity, order::Column::OrderId)).max(),
            "max_order_id",
        )
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await
        .map_err(ServiceError::StoreFailure)?
        .flatten();

    Ok(current.unwrap_or(0) + 1)
}

/// Time key for `today`, falling back to the latest known key.
///
/// No dimension row is ever created. An empty dimension is an error.
pub async fn resolve_time_key<C: ConnectionTrait>(
    conn: &C,
    today: NaiveDate,
) -> Result<TimeKey, ServiceError> {
    let same_day = TimesEntity::find()
        .filter(times::Column::TimeId.eq(today))
        .one(conn)
        .await
        .map_err(ServiceError::StoreFailure)?;

    if let Some(row) = same_day {
        return Ok(TimeKey::Today(row.time_id));
    }

    let latest = TimesEntity::find()
        .select_only()
        .column_as(
            Expr::col((TimesEntity, times::Column::TimeId)).max(),
            "max_time_id",
        )
        .into_tuple::<Option<NaiveDate>>()
        .one(conn)
        .await
        .map_err(ServiceError::StoreFailure)?
        .flatten();

    match latest {
        Some(time_id) => {
            debug!(%today, %time_id, "No time key for today; using latest");
            Ok(TimeKey::Fallback(time_id))
        }
        None => {
            error!(%today, "Time dimension is empty");
            Err(ServiceError::Internal(
                "no time dimension rows available".to_string(),
            ))
        }
    }
}

/// List price of a product
pub async fn product_price<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
) -> Result<Decimal, ServiceError> {
    let product = ProductEntity::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(ServiceError::StoreFailure)?
        .ok_or_else(|| {
            warn!(product_id, "Product not found for order");
            ServiceError::product_not_found()
        })?;

    product.prod_list_price.ok_or_else(|| {
        warn!(product_id, "Product has no list price");
        ServiceError::Internal(format!("product {} has no list price", product_id))
    })
}
