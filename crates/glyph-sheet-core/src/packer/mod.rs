pub mod shelf;

pub use shelf::{ShelfPacker, atlas_width};
