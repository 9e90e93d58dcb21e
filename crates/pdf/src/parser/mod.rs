pub mod backend;
pub mod cmap;
pub mod glyphs;
