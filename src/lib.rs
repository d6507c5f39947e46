pub mod algorithms;
pub mod basis;
pub mod config;
pub mod errors;
pub mod grids;
pub mod storage;
