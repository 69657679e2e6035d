mod builds;
mod core;
mod projects;
mod test_runs;
mod work_items;

pub use self::builds::{BuildRecord, DefinitionRef, DEFAULT_BUILD_LIMIT};
pub use self::core::{AzureDevOpsClient, API_VERSION};
pub use self::projects::ProjectRef;
pub use self::test_runs::{
    Outcome, TestCaseRef, TestResultRecord, TestRunRecord, RESULTS_PAGE_SIZE,
};
pub use self::work_items::{AssignedTo, WorkItemFields, WorkItemRecord, WORK_ITEM_BATCH_LIMIT};
