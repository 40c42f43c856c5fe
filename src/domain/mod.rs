pub mod change;
pub mod filter;
pub mod intent;
