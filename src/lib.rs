// src/lib.rs

//! Chat archiver library: incremental channel capture, dated archive
//! layout and static navigation pages.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
