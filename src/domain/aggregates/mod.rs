//! Aggregates module
pub mod cart;
pub mod customer;
pub mod favorites;
pub mod landing;
pub mod order;
pub mod product;

pub use cart::{Cart, CartAction, CartError, CartLine, CartSnapshot};
pub use customer::{Account, CustomerStats, NewAccount, TelegramUser};
pub use favorites::Favorites;
pub use landing::{Background, BlockKind, LandingBlock, LandingPage, NewLandingPage, TickerItem, TickerLink};
pub use order::{Customer, Delivery, NewOrder, NewOrderItem, Order, OrderError, OrderItem, OrderSource, OrderStatus, PaymentMethod};
pub use product::{Category, NewCategory, NewProduct, NewReview, Product, ProductImage, Review};
