// Common module
pub mod origin;
pub mod utils;
