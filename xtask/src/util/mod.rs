pub mod repo;
pub mod report;
