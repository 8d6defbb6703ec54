// src/lib.rs

//! bgg-harvest: crawls board game ratings and recommends games from them.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
