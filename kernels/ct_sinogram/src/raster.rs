// Raster boundary: decoded images in, 8-bit sinogram out

use image::{DynamicImage, GrayImage, Luma};

use crate::grid::SampleGrid;

impl SampleGrid {
    // Build an attenuation grid from a decoded raster. Color inputs go
    // through the image crate's standard luma conversion; intensities are
    // scaled to [0, 1] and tracked in v_max like any other write.
    pub fn from_luma(src: &DynamicImage) -> SampleGrid {
        let gray = src.to_luma8();
        let mut grid = SampleGrid::new(gray.width() as usize, gray.height() as usize);
        for (x, y, &Luma([v])) in gray.enumerate_pixels() {
            grid.set(x as i32, y as i32, v as f32 / 255.0);
        }
        grid
    }

    // Rescale the grid to a displayable 8-bit grayscale raster:
    // round(normalized * 255) per cell. An all-zero grid stays all zero.
    pub fn to_gray_image(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width() as u32, self.height() as u32);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let v = self.normalized_get(x as i32, y as i32);
            *pixel = Luma([(v * 255.0).round() as u8]);
        }
        img
    }
}
