// SPDX-License-Identifier: CEPL-1.0
//! Window collaborator: the app reaches winit through this crate only.

pub use winit;

use winit::dpi::PhysicalSize;

/// Window size with both sides forced to at least one pixel.
pub fn nonzero_size(size: PhysicalSize<u32>) -> (u32, u32) {
    (size.width.max(1), size.height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimized_window_reports_one_pixel() {
        assert_eq!(nonzero_size(PhysicalSize::new(0, 0)), (1, 1));
        assert_eq!(nonzero_size(PhysicalSize::new(800, 600)), (800, 600));
    }
}
