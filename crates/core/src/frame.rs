//! Planar `Y'CbCr` 4:2:0 frame storage

/// One 8-bit image plane, row-major with stride equal to width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plane {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Plane {
    /// Plane filled with `value`.
    #[must_use]
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[must_use]
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    #[must_use]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }
}

/// Luma at full resolution plus two chroma planes at half resolution in
/// both axes (floor). A trailing odd luma column/row shares the last
/// chroma sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanarFrame {
    pub luma: Plane,
    pub cb: Plane,
    pub cr: Plane,
}

impl PlanarFrame {
    /// Frame of the given luma size with mid-gray content.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let (cw, ch) = chroma_dimensions(width, height);
        Self {
            luma: Plane::filled(width, height, 128),
            cb: Plane::filled(cw, ch, 128),
            cr: Plane::filled(cw, ch, 128),
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.luma.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.luma.height
    }

    /// Chroma plane size `(width, height)`.
    #[must_use]
    pub fn chroma_size(&self) -> (usize, usize) {
        (self.cb.width, self.cb.height)
    }
}

/// Chroma plane dimensions for a luma size.
#[must_use]
pub fn chroma_dimensions(width: usize, height: usize) -> (usize, usize) {
    (width / 2, height / 2)
}

/// Luma downscaled 2:1 in both axes by summing each 2×2 block.
///
/// Entry `(cx, cy)` holds the sum of luma rows `2cy..2cy+2` and columns
/// `2cx..2cx+2`, so it lines up with chroma sample `(cx, cy)`. The engine
/// compares neighbouring entries to find edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap {
    width: usize,
    height: usize,
    sums: Vec<u16>,
}

impl EdgeMap {
    /// Zeroed map sized for a luma plane of `width × height`.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let (w, h) = chroma_dimensions(width, height);
        Self {
            width: w,
            height: h,
            sums: vec![0; w * h],
        }
    }

    /// Map computed from `luma`.
    #[must_use]
    pub fn from_luma(luma: &Plane) -> Self {
        let mut map = Self::new(luma.width, luma.height);
        map.rebuild(luma);
        map
    }

    /// Recompute the block sums in place.
    pub fn rebuild(&mut self, luma: &Plane) {
        debug_assert_eq!((self.width, self.height), chroma_dimensions(luma.width, luma.height));
        for cy in 0..self.height {
            let top = luma.row(2 * cy);
            let bottom = luma.row(2 * cy + 1);
            let out = &mut self.sums[cy * self.width..(cy + 1) * self.width];
            for (cx, sum) in out.iter_mut().enumerate() {
                let x = 2 * cx;
                *sum = u16::from(top[x])
                    + u16::from(top[x + 1])
                    + u16::from(bottom[x])
                    + u16::from(bottom[x + 1]);
            }
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    #[inline]
    pub fn get(&self, cx: usize, cy: usize) -> u16 {
        self.sums[cy * self.width + cx]
    }

    /// Row of block sums for chroma row `cy`.
    #[must_use]
    pub fn row(&self, cy: usize) -> &[u16] {
        &self.sums[cy * self.width..(cy + 1) * self.width]
    }
}
