/// Output image size in physical pixels.
///
/// This is the value compared every frame against the live Buffer Set; any
/// difference triggers a full recreation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area output (minimised window, surface mid-resize).
    ///
    /// Devices reject zero-sized images, so such frames are skipped instead of
    /// recreating resources.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height. Returns `1.0` for an empty resolution.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }

    #[inline]
    pub const fn to_array(self) -> [u32; 2] {
        [self.width, self.height]
    }

    /// Total pixel count, widened so 16k x 16k does not overflow.
    #[inline]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
