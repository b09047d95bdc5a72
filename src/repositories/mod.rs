pub mod catalog_repository;
pub mod delivery_repository;
pub mod order_repository;
