// captionmaption - photo analysis and creative caption generation over OpenAI vision
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod caption;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod openai;
pub mod server;
pub mod utils;
pub mod vision;
