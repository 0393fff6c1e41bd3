//! Image format detection and intrinsic size probing.

use quick_xml::Reader;
use quick_xml::events::Event;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Exclusive upper bound for a believable pixel dimension.
pub const MAX_PLAUSIBLE_DIMENSION: f64 = 10_000.0;

/// Image container formats the package can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Svg,
}

impl ImageFormat {
    /// File extension used for the media part.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Svg => "svg",
        }
    }

    /// MIME type declared in the content-type manifest.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

/// Detect the format from leading bytes.
///
/// Unrecognised binary data is treated as PNG.
pub fn detect_format(data: &[u8]) -> ImageFormat {
    if data.starts_with(&PNG_MAGIC) {
        ImageFormat::Png
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageFormat::Jpeg
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        ImageFormat::Gif
    } else if looks_like_svg(data) {
        ImageFormat::Svg
    } else {
        ImageFormat::Png
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    (text.starts_with('<') && text.contains("<svg")) || text.starts_with("<svg")
}

/// Intrinsic pixel size, or `None` when unknown or implausible.
pub fn intrinsic_size(data: &[u8], format: ImageFormat) -> Option<(u32, u32)> {
    let (width, height) = match format {
        ImageFormat::Png => png_size(data)?,
        ImageFormat::Jpeg => jpeg_size(data)?,
        ImageFormat::Gif => gif_size(data)?,
        ImageFormat::Svg => svg_size(data)?,
    };
    let (width, height) = (width.round(), height.round());
    if plausible(width) && plausible(height) {
        Some((width as u32, height as u32))
    } else {
        None
    }
}

/// A dimension is usable when it lies in `(0, 10000)`.
pub fn plausible(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value < MAX_PLAUSIBLE_DIMENSION
}

fn png_size(data: &[u8]) -> Option<(f64, f64)> {
    if data.len() < 24 || !data.starts_with(&PNG_MAGIC) {
        return None;
    }
    // IHDR is the first chunk: width at 16, height at 20, big-endian.
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width as f64, height as f64))
}

fn jpeg_size(data: &[u8]) -> Option<(f64, f64)> {
    let mut pos = 2;
    while pos + 4 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        match marker {
            0xD9 | 0xDA => break,
            // Fill bytes and standalone markers carry no length.
            0xFF => {
                pos += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // SOF0..SOF15 except DHT, JPG and DAC.
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                if pos + 8 >= data.len() {
                    return None;
                }
                let height = u16::from_be_bytes([data[pos + 5], data[pos + 6]]);
                let width = u16::from_be_bytes([data[pos + 7], data[pos + 8]]);
                return Some((width as f64, height as f64));
            }
            _ => {}
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 2 + len;
    }
    None
}

fn gif_size(data: &[u8]) -> Option<(f64, f64)> {
    if data.len() < 10 {
        return None;
    }
    // Logical screen descriptor, little-endian.
    let width = u16::from_le_bytes([data[6], data[7]]);
    let height = u16::from_le_bytes([data[8], data[9]]);
    Some((width as f64, height as f64))
}

/// Size from the root element's `width`/`height`, else its `viewBox`.
fn svg_size(data: &[u8]) -> Option<(f64, f64)> {
    let text = String::from_utf8_lossy(data);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"svg" => {
                let mut width = None;
                let mut height = None;
                let mut view_box = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.local_name().as_ref() {
                        b"width" => width = parse_length(&value),
                        b"height" => height = parse_length(&value),
                        b"viewBox" => view_box = parse_view_box(&value),
                        _ => {}
                    }
                }
                return match (width, height, view_box) {
                    (Some(w), Some(h), _) => Some((w, h)),
                    (_, _, Some(vb)) => Some(vb),
                    _ => None,
                };
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Parse an SVG length in user units or pixels; percentages are unknown.
fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f64>().ok()
}

fn parse_view_box(value: &str) -> Option<(f64, f64)> {
    let parts: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [_, _, w, h] => Some((*w, *h)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal PNG header with the given size.
    pub(crate) fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut data = PNG_MAGIC.to_vec();
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    pub(crate) fn jpeg_header(width: u16, height: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        // APP0 segment
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
        // SOF0
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    pub(crate) fn gif_header(width: u16, height: u16) -> Vec<u8> {
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&[0, 0, 0]);
        data
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(&png_header(1, 1)), ImageFormat::Png);
        assert_eq!(detect_format(&jpeg_header(1, 1)), ImageFormat::Jpeg);
        assert_eq!(detect_format(&gif_header(1, 1)), ImageFormat::Gif);
        assert_eq!(detect_format(b"<svg xmlns='x'/>"), ImageFormat::Svg);
        assert_eq!(
            detect_format(b"<?xml version=\"1.0\"?>\n<svg></svg>"),
            ImageFormat::Svg
        );
        assert_eq!(detect_format(b"\x00\x01garbage"), ImageFormat::Png);
    }

    #[test]
    fn test_raster_sizes() {
        assert_eq!(intrinsic_size(&png_header(600, 400), ImageFormat::Png), Some((600, 400)));
        assert_eq!(intrinsic_size(&jpeg_header(640, 480), ImageFormat::Jpeg), Some((640, 480)));
        assert_eq!(intrinsic_size(&gif_header(32, 16), ImageFormat::Gif), Some((32, 16)));
    }

    #[test]
    fn test_truncated_headers() {
        assert_eq!(intrinsic_size(&png_header(10, 10)[..20], ImageFormat::Png), None);
        assert_eq!(intrinsic_size(&[0xFF, 0xD8, 0xFF], ImageFormat::Jpeg), None);
        assert_eq!(intrinsic_size(b"GIF89a", ImageFormat::Gif), None);
    }

    #[test]
    fn test_implausible_sizes_rejected() {
        assert_eq!(intrinsic_size(&png_header(0, 100), ImageFormat::Png), None);
        assert_eq!(intrinsic_size(&png_header(10_000, 100), ImageFormat::Png), None);
        assert_eq!(intrinsic_size(&png_header(9_999, 100), ImageFormat::Png), Some((9_999, 100)));
    }

    #[test]
    fn test_svg_sizes() {
        let explicit = br#"<svg xmlns="http://www.w3.org/2000/svg" width="120px" height="80"></svg>"#;
        assert_eq!(intrinsic_size(explicit, ImageFormat::Svg), Some((120, 80)));

        let view_box = br#"<?xml version="1.0"?><svg viewBox="0 0 300 150"/>"#;
        assert_eq!(intrinsic_size(view_box, ImageFormat::Svg), Some((300, 150)));

        let percent = br#"<svg width="100%" height="100%" viewBox="0,0,40,20"></svg>"#;
        assert_eq!(intrinsic_size(percent, ImageFormat::Svg), Some((40, 20)));

        assert_eq!(intrinsic_size(b"<svg></svg>", ImageFormat::Svg), None);
    }

    #[test]
    fn test_sub_pixel_svg_is_unknown() {
        let tiny = br#"<svg width="0.4" height="0.3"></svg>"#;
        assert_eq!(intrinsic_size(tiny, ImageFormat::Svg), None);
        let rounded = br#"<svg width="10.6" height="4.4"></svg>"#;
        assert_eq!(intrinsic_size(rounded, ImageFormat::Svg), Some((11, 4)));
    }
}
