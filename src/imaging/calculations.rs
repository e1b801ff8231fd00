//! Pure functions for the shrink search.
//!
//! All functions here are pure and testable without any I/O or images.

/// Accepted deviation from the target size, as a fraction of the target.
pub const SIZE_TOLERANCE: f64 = 0.10;

/// Factor applied when a result is still too large.
const SHRINK_STEP: f64 = 0.9;

/// Factor applied when a result undershot the target.
const GROW_STEP: f64 = 1.05;

/// First scale guess: encoded size is roughly proportional to pixel count,
/// so scale each edge by the square root of the size ratio.
///
/// ```
/// # use frflashy::imaging::initial_scale;
/// assert_eq!(initial_scale(400_000, 100_000), 0.5);
/// ```
pub fn initial_scale(original_bytes: u64, target_bytes: u64) -> f64 {
    if original_bytes == 0 {
        return 1.0;
    }
    (target_bytes as f64 / original_bytes as f64).sqrt()
}

/// True when `size` is within the tolerance band around `target`.
pub fn within_target(size_bytes: u64, target_bytes: u64) -> bool {
    let size = size_bytes as f64;
    let target = target_bytes as f64;
    size >= target * (1.0 - SIZE_TOLERANCE) && size <= target * (1.0 + SIZE_TOLERANCE)
}

/// Next scale after a miss: shrink when too large, grow when too small.
pub fn adjust_scale(scale: f64, size_bytes: u64, target_bytes: u64) -> f64 {
    if size_bytes > target_bytes {
        scale * SHRINK_STEP
    } else {
        scale * GROW_STEP
    }
}

/// Dimensions at `scale`, truncated, never below 1x1.
pub fn scaled_dimensions(source: (u32, u32), scale: f64) -> (u32, u32) {
    let (w, h) = source;
    let w = ((w as f64 * scale) as u32).max(1);
    let h = ((h as f64 * scale) as u32).max(1);
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_scale_is_square_root_of_ratio() {
        assert_eq!(initial_scale(400, 100), 0.5);
        assert!((initial_scale(900, 100) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn initial_scale_of_empty_file_is_identity() {
        assert_eq!(initial_scale(0, 100), 1.0);
    }

    #[test]
    fn tolerance_band_is_inclusive() {
        assert!(within_target(90, 100));
        assert!(within_target(110, 100));
        assert!(within_target(100, 100));
        assert!(!within_target(89, 100));
        assert!(!within_target(111, 100));
    }

    #[test]
    fn adjust_shrinks_when_too_large() {
        assert!((adjust_scale(0.5, 200, 100) - 0.45).abs() < 1e-12);
    }

    #[test]
    fn adjust_grows_when_too_small() {
        assert!((adjust_scale(0.5, 50, 100) - 0.525).abs() < 1e-12);
    }

    #[test]
    fn scaled_dimensions_truncate() {
        assert_eq!(scaled_dimensions((1024, 768), 0.5), (512, 384));
        assert_eq!(scaled_dimensions((1000, 999), 0.3333), (333, 332));
    }

    #[test]
    fn scaled_dimensions_never_zero() {
        assert_eq!(scaled_dimensions((10, 2), 0.01), (1, 1));
    }
}
