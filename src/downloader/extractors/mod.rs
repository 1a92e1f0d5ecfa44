// Extraction adapter
//
// `MediaExtractor` is the seam: handlers and the selector only ever see
// `ExtractionResult`, so tests swap in a stub and production plugs in
// yt-dlp.

mod traits;
mod ytdlp;

pub use traits::{
    ExtractionResult, ExtractorConfig, ExtractorMode, MediaExtractor, RenditionCandidate,
};
pub use ytdlp::YtDlpExtractor;
