pub mod activity;
pub mod screenshots;
pub mod todos;

pub use activity::{ActivityStore, LogOutcome};
pub use screenshots::ScreenshotStore;
pub use todos::TodoStore;
