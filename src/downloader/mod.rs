// Downloader module - validate, build options, extract, select

pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod options;
pub mod utils;
pub mod validator;

pub use errors::DownloadError;
pub use extractors::{ExtractionResult, MediaExtractor, RenditionCandidate, YtDlpExtractor};
pub use format_selector::{FormatSelector, Selection, SelectionTier};
pub use models::{CookieSource, DownloadTarget, DownloadedFile, NetworkIdentity, OptionsBundle};
pub use options::{CredentialSettings, CredentialSource, ExtractorDefaults, OptionsBuilder};
pub use validator::is_acceptable;
