//! SeaORM mappings of the sales-history tables.

pub mod order;
pub mod product;
pub mod sale;
pub mod times;
