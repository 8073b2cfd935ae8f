pub mod coords;
pub mod fonts;
pub mod interaction;
pub mod preview;
pub mod raster;
pub mod shapes;
pub mod text;
