pub mod classifier;
pub mod presentation;
pub mod version_control;

pub use classifier::IntentClassifier;
pub use presentation::{FolderPicker, IntentPresenter, StatusAction, StatusSink};
pub use version_control::VersionControlService;
