pub mod drink_repo;
pub mod error;
pub mod memory_drink_repo;
