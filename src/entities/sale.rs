use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only sales fact row.
///
/// The table has no unique key of its own; the declared key is the
/// dimension grain and is not enforced by the store.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub prod_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cust_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub time_id: NaiveDate,
    #[sea_orm(primary_key, auto_increment = false)]
    pub channel_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub promo_id: i32,
    pub quantity_sold: i32,
    pub amount_sold: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
