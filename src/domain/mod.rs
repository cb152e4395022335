//! Domain layer: catalog, carts, orders, customers and landing pages.
pub mod aggregates;
pub mod events;
pub mod value_objects;
