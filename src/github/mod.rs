pub mod filters;
pub mod loader;
