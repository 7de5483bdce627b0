pub mod elements;
pub mod error;
pub mod predict;
