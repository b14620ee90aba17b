pub mod bitmap;
pub mod compositor;
pub mod surface;
