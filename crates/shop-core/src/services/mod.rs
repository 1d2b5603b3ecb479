//! # Services
//!
//! Workflows the HTTP layer calls. Each service owns a handle to the shared
//! store and performs validation, authorization and logging around it.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod otp;
pub mod payments;
pub mod users;
pub mod wishlist;

pub use auth::{AuthService, AuthSettings, SessionTokens, SignupRequest};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use orders::OrderService;
pub use otp::OtpService;
pub use payments::{CreatedIntent, PaymentService};
pub use users::{AdminUserUpdate, ProfileUpdate, UserService};
pub use wishlist::WishlistService;
