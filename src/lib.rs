//! Resolve Instagram post URLs to direct media links, or download the
//! media, by delegating extraction to yt-dlp.

pub mod config;
pub mod downloader;
pub mod server;
