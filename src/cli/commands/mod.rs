pub mod cache;
pub mod config;
pub mod models;
pub mod refresh;
pub mod run;
pub mod serve;
