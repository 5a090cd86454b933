pub mod args;
pub mod audio;
pub mod episode;
pub mod error;
pub mod podcast;
pub mod rss;
pub mod server;
pub mod tts;
pub mod utils;
