pub mod analysis;
pub mod debounce;
