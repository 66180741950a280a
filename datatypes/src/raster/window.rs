use serde::{Deserialize, Serialize};

/// A rectangular region of a grid in pixel space.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// The window that spans a whole grid of `width` x `height` pixels.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// The offset as expected by GDAL's `RasterIO`, i.e. (column, row).
    pub fn offset(&self) -> (isize, isize) {
        (self.col_off as isize, self.row_off as isize)
    }

    /// The size as expected by GDAL's `RasterIO`, i.e. (width, height).
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Partitions a grid into blocks of at most `block_width` x `block_height` pixels in row
/// major order. Blocks at the right and bottom edges are cropped to the grid.
#[derive(Debug, Clone)]
pub struct BlockWindows {
    grid_width: usize,
    grid_height: usize,
    block_width: usize,
    block_height: usize,
    next_col: usize,
    next_row: usize,
}

impl BlockWindows {
    /// A zero block size is treated as a single block spanning the grid.
    pub fn new(
        grid_width: usize,
        grid_height: usize,
        block_width: usize,
        block_height: usize,
    ) -> Self {
        let block_width = if block_width == 0 {
            grid_width
        } else {
            block_width
        };
        let block_height = if block_height == 0 {
            grid_height
        } else {
            block_height
        };

        Self {
            grid_width,
            grid_height,
            block_width,
            block_height,
            next_col: 0,
            next_row: 0,
        }
    }

    pub fn number_of_blocks(&self) -> usize {
        if self.grid_width == 0 || self.grid_height == 0 {
            return 0;
        }

        self.grid_width.div_ceil(self.block_width) * self.grid_height.div_ceil(self.block_height)
    }
}

impl Iterator for BlockWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        if self.grid_width == 0 || self.next_row >= self.grid_height {
            return None;
        }

        let window = Window::new(
            self.next_col,
            self.next_row,
            self.block_width.min(self.grid_width - self.next_col),
            self.block_height.min(self.grid_height - self.next_row),
        );

        self.next_col += self.block_width;
        if self.next_col >= self.grid_width {
            self.next_col = 0;
            self.next_row += self.block_height;
        }

        Some(window)
    }
}
