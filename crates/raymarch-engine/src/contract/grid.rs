use crate::coords::Resolution;

/// Local workgroup extents declared by the kernel (`@workgroup_size`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupSize {
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Workgroup extents of the reference ray-march kernel.
    pub const RAYMARCH: Self = Self::new(32, 16, 1);
}

impl From<[u32; 3]> for WorkgroupSize {
    fn from([x, y, z]: [u32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Number of workgroups dispatched along each axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WorkgroupGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupGrid {
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Smallest 2D grid whose invocations cover every pixel of `resolution`.
    ///
    /// When the resolution is not a multiple of the workgroup extents the last
    /// row/column of groups overhangs the image; the kernel must discard
    /// invocations outside `params.resolution`.
    pub fn covering(resolution: Resolution, size: WorkgroupSize) -> Self {
        Self {
            x: resolution.width.div_ceil(size.x.max(1)),
            y: resolution.height.div_ceil(size.y.max(1)),
            z: 1,
        }
    }

    #[inline]
    pub const fn to_array(self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}
