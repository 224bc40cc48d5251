pub mod item;
pub mod job;
pub mod storefront;
