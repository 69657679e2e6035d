pub mod classify;
pub mod client;
mod provider;
pub mod url_utils;

pub use provider::{day_bounds, day_bounds_in, AzureDevOpsProvider, Strategy};
