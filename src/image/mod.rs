//! Image resolution, format sniffing and sizing.
//!
//! An [`ImageRef`] from the parser becomes a [`ResolvedImage`] here:
//! bytes are loaded (data URI, remote URL or the host's loader), the format
//! is sniffed from magic bytes, and the render size is computed from the
//! explicit and intrinsic dimensions.

mod probe;
mod resolve;
mod size;

pub use probe::{ImageFormat, MAX_PLAUSIBLE_DIMENSION, detect_format, intrinsic_size, plausible};
pub use resolve::{
    FsLoader, ImageSource, MAX_REMOTE_BYTES, REMOTE_TIMEOUT, ResourceLoader, decode_data_uri,
    load_bytes,
};
pub use size::{
    EMU_PER_PIXEL, FALLBACK_SIZE, MAX_HEIGHT, MAX_WIDTH, MIN_WIDTH, px_to_emu, render_size,
};

use crate::model::ImageRef;

/// An image ready to embed.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    /// Render width in pixels.
    pub width: u32,
    /// Render height in pixels.
    pub height: u32,
}

impl ResolvedImage {
    /// Build from raw bytes and the explicit size requested in the source.
    pub fn from_bytes(data: Vec<u8>, width: Option<u32>, height: Option<u32>) -> Self {
        let format = detect_format(&data);
        let intrinsic = intrinsic_size(&data, format);
        let (width, height) = render_size(width, height, intrinsic);
        Self {
            data,
            format,
            width,
            height,
        }
    }

    pub fn width_emu(&self) -> u64 {
        px_to_emu(self.width)
    }

    pub fn height_emu(&self) -> u64 {
        px_to_emu(self.height)
    }
}

/// Resolve an image reference, or `None` when its bytes are unavailable.
pub async fn resolve_image(
    image: &ImageRef,
    loader: Option<&dyn ResourceLoader>,
) -> Option<ResolvedImage> {
    let data = load_bytes(&image.source, loader).await?;
    Some(ResolvedImage::from_bytes(data, image.width, image.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe::tests::png_header;

    struct MapLoader(Vec<(&'static str, Vec<u8>)>);

    #[async_trait::async_trait]
    impl ResourceLoader for MapLoader {
        async fn load(&self, path: &str) -> Option<Vec<u8>> {
            self.0
                .iter()
                .find(|(p, _)| *p == path)
                .map(|(_, bytes)| bytes.clone())
        }
    }

    fn image_ref(source: &str, width: Option<u32>) -> ImageRef {
        ImageRef {
            alt: "alt".into(),
            source: source.into(),
            width,
            height: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_with_explicit_width() {
        let loader = MapLoader(vec![("pic.png", png_header(600, 400))]);
        let image = resolve_image(&image_ref("pic.png", Some(300)), Some(&loader))
            .await
            .unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!((image.width, image.height), (300, 200));
        assert_eq!(image.width_emu(), 300 * EMU_PER_PIXEL);
    }

    #[tokio::test]
    async fn test_resolve_downscales_wide_image() {
        let loader = MapLoader(vec![("wide.png", png_header(1200, 800))]);
        let image = resolve_image(&image_ref("wide.png", None), Some(&loader))
            .await
            .unwrap();
        assert_eq!((image.width, image.height), (600, 400));
    }

    #[tokio::test]
    async fn test_unresolvable_is_none() {
        let loader = MapLoader(Vec::new());
        assert!(resolve_image(&image_ref("nope.png", None), Some(&loader)).await.is_none());
        assert!(resolve_image(&image_ref("nope.png", None), None).await.is_none());
    }
}
