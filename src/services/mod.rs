pub mod analytics;
pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod orders;

pub use analytics::AnalyticsService;
pub use carts::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use orders::OrderService;
