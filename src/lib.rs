// src/lib.rs

//! Exchange notice and market warning ingestion library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod sources;
pub mod storage;
pub mod utils;
