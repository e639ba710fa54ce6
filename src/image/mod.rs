//! Image types shared by the client and the session controller.

mod types;

pub use types::{
    is_image_media_type, media_type_for_path, EncodedImage, ImageFormat, TransformationResult,
    UploadedImage,
};
