pub mod buffer;
pub mod palette;
pub mod store;
