use std::io::Cursor;

use attache_transfer::SourceFile;
use bytes::Bytes;
use image::ImageReader;
use tracing::debug;

use crate::filter::{FileFilter, FilterOutcome};

/// Pixel bounds for image uploads. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageBounds {
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl ImageBounds {
    pub fn is_unbounded(&self) -> bool {
        self.min_width.is_none()
            && self.min_height.is_none()
            && self.max_width.is_none()
            && self.max_height.is_none()
    }

    /// Checks decoded dimensions of the image called `name`.
    ///
    /// Lower bounds are checked first. When both dimensions break the same
    /// side, a single combined message is produced.
    pub fn check(&self, name: &str, width: u32, height: u32) -> Result<(), String> {
        let narrow = self.min_width.filter(|min| width < *min);
        let short = self.min_height.filter(|min| height < *min);
        match (narrow, short) {
            (Some(min_w), Some(min_h)) => {
                return Err(format!(
                    "Image `{name}` is too small. Image should be at least {min_w}x{min_h} pixels."
                ));
            }
            (Some(min_w), None) => {
                return Err(format!(
                    "Image `{name}` is not wide enough. The minimum width is {min_w} pixels."
                ));
            }
            (None, Some(min_h)) => {
                return Err(format!(
                    "Image `{name}` is not tall enough. The minimum height is {min_h} pixels."
                ));
            }
            (None, None) => {}
        }

        let wide = self.max_width.filter(|max| width > *max);
        let tall = self.max_height.filter(|max| height > *max);
        match (wide, tall) {
            (Some(max_w), Some(max_h)) => Err(format!(
                "Image `{name}` is too big. Image should be at most {max_w}x{max_h} pixels."
            )),
            (Some(max_w), None) => Err(format!(
                "Image `{name}` is too wide. The maximum width is {max_w} pixels."
            )),
            (None, Some(max_h)) => Err(format!(
                "Image `{name}` is too tall. The maximum height is {max_h} pixels."
            )),
            (None, None) => Ok(()),
        }
    }
}

/// Reads image dimensions from the header, without decoding pixel data.
pub fn read_dimensions(data: &[u8]) -> Result<(u32, u32), image::ImageError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    reader.into_dimensions()
}

/// Checks image dimensions on a blocking thread.
///
/// Files that cannot be read as images are refused only in strict mode;
/// otherwise the check is skipped and left to the server.
pub struct DimensionFilter {
    bounds: ImageBounds,
    strict: bool,
}

impl DimensionFilter {
    pub fn new(bounds: ImageBounds, strict: bool) -> Self {
        Self { bounds, strict }
    }
}

impl FileFilter for DimensionFilter {
    fn check(&self, file: &SourceFile) -> FilterOutcome {
        let bounds = self.bounds;
        let strict = self.strict;
        let name = file.name.clone();
        let data: Bytes = file.data.clone();

        FilterOutcome::Deferred(Box::pin(async move {
            let decoded = tokio::task::spawn_blocking(move || read_dimensions(&data)).await;
            let (width, height) = match decoded {
                Ok(Ok(dims)) => dims,
                Ok(Err(e)) => {
                    debug!(file = %name, error = %e, "image header unreadable");
                    return not_an_image(&name, strict);
                }
                Err(e) => {
                    debug!(file = %name, error = %e, "dimension check task failed");
                    return not_an_image(&name, strict);
                }
            };
            bounds.check(&name, width, height)
        }))
    }
}

fn not_an_image(name: &str, strict: bool) -> Result<(), String> {
    if strict {
        Err(format!("File `{name}` is not an image"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn bounds(min: Option<(u32, u32)>, max: Option<(u32, u32)>) -> ImageBounds {
        ImageBounds {
            min_width: min.map(|m| m.0),
            min_height: min.map(|m| m.1),
            max_width: max.map(|m| m.0),
            max_height: max.map(|m| m.1),
        }
    }

    async fn run(filter: &DimensionFilter, file: &SourceFile) -> Result<(), String> {
        match filter.check(file) {
            FilterOutcome::Deferred(fut) => fut.await,
            other => panic!("expected deferred check, got {other:?}"),
        }
    }

    #[test]
    fn reads_png_header() {
        assert_eq!(read_dimensions(&png(12, 7)).unwrap(), (12, 7));
        assert!(read_dimensions(b"plain text").is_err());
    }

    #[test]
    fn within_bounds() {
        let b = bounds(Some((10, 10)), Some((100, 100)));
        assert!(b.check("a.png", 10, 100).is_ok());
    }

    #[test]
    fn single_side_messages() {
        let b = bounds(Some((10, 10)), Some((100, 100)));
        assert_eq!(
            b.check("a.png", 5, 50).unwrap_err(),
            "Image `a.png` is not wide enough. The minimum width is 10 pixels."
        );
        assert_eq!(
            b.check("a.png", 50, 5).unwrap_err(),
            "Image `a.png` is not tall enough. The minimum height is 10 pixels."
        );
        assert_eq!(
            b.check("a.png", 101, 50).unwrap_err(),
            "Image `a.png` is too wide. The maximum width is 100 pixels."
        );
        assert_eq!(
            b.check("a.png", 50, 101).unwrap_err(),
            "Image `a.png` is too tall. The maximum height is 100 pixels."
        );
    }

    #[test]
    fn combined_messages() {
        let b = bounds(Some((10, 20)), Some((100, 200)));
        assert_eq!(
            b.check("a.png", 1, 1).unwrap_err(),
            "Image `a.png` is too small. Image should be at least 10x20 pixels."
        );
        assert_eq!(
            b.check("a.png", 500, 500).unwrap_err(),
            "Image `a.png` is too big. Image should be at most 100x200 pixels."
        );
    }

    #[test]
    fn only_upper_bound_set() {
        let b = ImageBounds {
            max_width: Some(50),
            ..Default::default()
        };
        assert!(b.check("a.png", 50, 10_000).is_ok());
        assert!(b.check("a.png", 51, 1).is_err());
    }

    #[tokio::test]
    async fn filter_rejects_oversized_image() {
        let filter = DimensionFilter::new(bounds(None, Some((8, 8))), false);
        let file = SourceFile::new("big.png", "image/png", png(16, 4));
        assert_eq!(
            run(&filter, &file).await.unwrap_err(),
            "Image `big.png` is too wide. The maximum width is 8 pixels."
        );
    }

    #[tokio::test]
    async fn filter_lenient_skips_non_images() {
        let filter = DimensionFilter::new(bounds(None, Some((8, 8))), false);
        let file = SourceFile::new("logo.svg", "image/svg+xml", "<svg/>");
        assert!(run(&filter, &file).await.is_ok());
    }

    #[tokio::test]
    async fn filter_strict_rejects_non_images() {
        let filter = DimensionFilter::new(bounds(None, Some((8, 8))), true);
        let file = SourceFile::new("logo.svg", "image/svg+xml", "<svg/>");
        assert_eq!(
            run(&filter, &file).await.unwrap_err(),
            "File `logo.svg` is not an image"
        );
    }
}
