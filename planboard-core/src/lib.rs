pub mod board;
pub mod config;
pub mod mutation;
pub mod reorder;
pub mod storage;
pub mod types;
pub mod validate;
pub mod wire;
