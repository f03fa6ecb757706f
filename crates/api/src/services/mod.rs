//! Application services used by the route handlers.

pub mod admin_bootstrap;
pub mod cookies;
pub mod exports;
pub mod pages;

pub use cookies::CookieHelper;
