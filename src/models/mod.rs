pub mod product;
pub mod product_type;
pub mod sale;
pub mod user;
