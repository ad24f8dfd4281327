pub mod mapper;
pub mod store;
