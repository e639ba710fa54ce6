#![warn(missing_docs)]
//! ProPhoto - turn a casual portrait into a professional headshot.
//!
//! The crate sends one photo, together with a fixed instruction, to the
//! Gemini image model and hands back the generated image. A [`Session`]
//! tracks the attempt through `Idle`, `Reading`, `Generating`, `Success` and
//! `Error`, and saves the result on request.
//!
//! # Quick Start
//!
//! ```no_run
//! use prophoto::{Config, FileSelection, GeminiTransformer, Session};
//!
//! #[tokio::main]
//! async fn main() -> prophoto::Result<()> {
//!     let config = Config::from_env()?;
//!     let session = Session::new(GeminiTransformer::builder(config).build()?);
//!
//!     session.select_file(FileSelection::path("me.jpg")).await?;
//!     session.download_result(".").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Every failure carries a tagged [`ProPhotoError`]. Front ends should show
//! [`ProPhotoError::user_message`] (or the session's stored error text) and
//! keep the detailed variant for logs.

mod config;
mod error;
pub mod image;
mod session;
pub mod transform;

pub use config::{Config, GeminiModel, API_KEY_ENV_VARS, DEFAULT_BASE_URL};
pub use error::{
    ProPhotoError, Result, BUSY_MESSAGE, INVALID_FILE_MESSAGE, READ_FAILED_MESSAGE,
    TRANSFORM_FAILED_MESSAGE,
};
pub use image::{EncodedImage, ImageFormat, TransformationResult, UploadedImage};
pub use session::{FileSelection, Session, SessionSnapshot, SessionStatus, DOWNLOAD_FILE_NAME};
pub use transform::{GeminiTransformer, GeminiTransformerBuilder, Transformer};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{ProPhotoError, Result};
    pub use crate::image::{EncodedImage, TransformationResult};
    pub use crate::session::{FileSelection, Session, SessionStatus};
    pub use crate::transform::{GeminiTransformer, Transformer};
}
