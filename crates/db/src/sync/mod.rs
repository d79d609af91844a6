pub mod file_repository;
pub mod memory_repository;
pub mod models;
pub mod pg_repository;
pub mod repositories;
