pub mod activity;
pub mod screenshot;
pub mod todo;

pub use activity::{ActivityEntry, ActivityKind};
pub use screenshot::ScreenshotEntry;
pub use todo::TodoItem;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
