//! Render size computation.

use super::probe::plausible;

/// English Metric Units per pixel at 96 dpi.
pub const EMU_PER_PIXEL: u64 = 9525;

/// Largest rendered width in pixels when no size is given.
pub const MAX_WIDTH: f64 = 600.0;

/// Largest rendered height in pixels when no size is given.
pub const MAX_HEIGHT: f64 = 800.0;

/// Smallest rendered width in pixels when no size is given.
pub const MIN_WIDTH: f64 = 50.0;

/// Size used when neither the source nor the image says anything.
pub const FALLBACK_SIZE: (u32, u32) = (400, 300);

/// Convert pixels to EMU.
pub fn px_to_emu(px: u32) -> u64 {
    u64::from(px) * EMU_PER_PIXEL
}

/// Final pixel size for an image.
///
/// - Both explicit dimensions are used verbatim.
/// - One explicit dimension scales the other by the intrinsic aspect ratio
///   (or the fallback ratio when the intrinsic size is unknown).
/// - Without explicit dimensions the intrinsic size is fitted inside the
///   `MAX_WIDTH` x `MAX_HEIGHT` envelope and raised to `MIN_WIDTH`.
///
/// Zero or implausibly large explicit values are ignored.
pub fn render_size(
    width: Option<u32>,
    height: Option<u32>,
    intrinsic: Option<(u32, u32)>,
) -> (u32, u32) {
    let width = width.filter(|w| plausible(f64::from(*w)));
    let height = height.filter(|h| plausible(f64::from(*h)));
    let (iw, ih) = intrinsic.unwrap_or(FALLBACK_SIZE);
    let (iw, ih) = (f64::from(iw), f64::from(ih));

    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, to_px(f64::from(w) * ih / iw)),
        (None, Some(h)) => (to_px(f64::from(h) * iw / ih), h),
        (None, None) => {
            if intrinsic.is_none() {
                return FALLBACK_SIZE;
            }
            let mut scale = (MAX_WIDTH / iw).min(MAX_HEIGHT / ih).min(1.0);
            if iw * scale < MIN_WIDTH {
                scale = MIN_WIDTH / iw;
            }
            (to_px(iw * scale), to_px(ih * scale))
        }
    }
}

fn to_px(value: f64) -> u32 {
    value.round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_width_scales_height() {
        assert_eq!(render_size(Some(300), None, Some((600, 400))), (300, 200));
    }

    #[test]
    fn test_explicit_height_scales_width() {
        assert_eq!(render_size(None, Some(100), Some((600, 400))), (150, 100));
    }

    #[test]
    fn test_both_explicit_verbatim() {
        assert_eq!(render_size(Some(10), Some(999), Some((600, 400))), (10, 999));
    }

    #[test]
    fn test_wide_image_downscaled() {
        assert_eq!(render_size(None, None, Some((1200, 900))), (600, 450));
    }

    #[test]
    fn test_tall_image_fits_height() {
        assert_eq!(render_size(None, None, Some((1200, 1800))), (533, 800));
    }

    #[test]
    fn test_small_image_raised_to_floor() {
        assert_eq!(render_size(None, None, Some((20, 10))), (50, 25));
        assert_eq!(render_size(None, None, Some((200, 100))), (200, 100));
    }

    #[test]
    fn test_unknown_intrinsic() {
        assert_eq!(render_size(None, None, None), FALLBACK_SIZE);
        assert_eq!(render_size(Some(200), None, None), (200, 150));
    }

    #[test]
    fn test_zero_explicit_ignored() {
        assert_eq!(render_size(Some(0), None, Some((300, 100))), (300, 100));
    }

    #[test]
    fn test_emu() {
        assert_eq!(px_to_emu(96), 914_400);
    }
}
