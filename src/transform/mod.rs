//! The transformation client: one request to the image model per photo.

mod gemini;
mod prompt;
mod provider;

pub use gemini::{GeminiTransformer, GeminiTransformerBuilder};
pub use prompt::PROFESSIONAL_HEADSHOT_PROMPT;
pub use provider::Transformer;
