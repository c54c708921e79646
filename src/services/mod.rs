pub mod auth_service;
pub mod check_in_service;
pub mod export_service;
pub mod history_service;
pub mod stats_service;
