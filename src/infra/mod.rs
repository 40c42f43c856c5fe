pub mod classifier;
pub mod clipboard;
pub mod git;
pub mod terminal;
