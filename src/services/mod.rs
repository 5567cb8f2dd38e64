pub mod api;
pub mod driver;
