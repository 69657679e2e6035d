mod core;
mod pipelines;
mod test_plans;

pub use self::core::{day_bounds, day_bounds_in, AzureDevOpsProvider, Strategy};
