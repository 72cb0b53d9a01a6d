pub mod detection;
pub mod geo;
pub mod item;
pub mod matcher;
pub mod vector;
