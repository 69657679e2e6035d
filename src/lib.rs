pub mod auth;
pub mod dashboard;
pub mod error;
pub mod providers;
pub mod report;
pub mod settings;
