pub mod clicks;
pub mod error;
pub mod gallery;
pub mod handlers;
pub mod logic;
pub mod palette;
pub mod raster;
pub mod registry;
pub mod state;
pub mod storage;
pub mod stroke_log;
