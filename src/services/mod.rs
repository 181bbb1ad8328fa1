//! Business operations behind the HTTP handlers.

pub mod orders;

pub use orders::{OrderService, PlaceOrderRequest, PlacedOrder, TimeKey};
