pub mod auth;
pub mod config;
pub mod course;
pub mod database_validator;
pub mod learning_path;
pub mod learning_path_detail;
pub mod membership;
pub mod pagination;
pub mod reorder;
