//! Conversion of source images into network input tensors.

use std::ops::RangeInclusive;

use image::{imageops, Rgb, RgbImage};
use palmbox_geom::{Affine2, Rect};

use crate::{
    nn::{InferenceEngine, InputLayout, InputTensor},
    InferenceError,
};

/// Describes how a source image was fitted into the square network input.
///
/// The image is scaled uniformly so that its longer side matches the input size and placed at the
/// top-left corner; the remainder is padded with black. Mapping a point from network input to
/// source coordinates is therefore a pure scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    scale: f32,
    width: u32,
    height: u32,
}

impl Letterbox {
    /// Computes the letterbox for a `width`x`height` image and a network input of `input_size`.
    pub fn for_image(width: u32, height: u32, input_size: u32) -> Result<Self, InferenceError> {
        if input_size == 0 {
            return Err(InferenceError::ZeroInputSize);
        }
        if width == 0 || height == 0 {
            return Err(InferenceError::EmptyImage { width, height });
        }

        Ok(Self {
            scale: width.max(height) as f32 / input_size as f32,
            width,
            height,
        })
    }

    /// Returns the factor that converts network input pixels to source pixels.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn source_width(&self) -> u32 {
        self.width
    }

    pub fn source_height(&self) -> u32 {
        self.height
    }

    /// Returns the transform from network input coordinates to source image coordinates.
    pub fn to_source(&self) -> Affine2 {
        Affine2::scale(self.scale)
    }

    /// Returns the rectangle covered by the source image, in source coordinates.
    pub fn source_bounds(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width as f32, self.height as f32)
    }

    /// Returns the size of the scaled image inside the network input.
    fn scaled_size(&self) -> (u32, u32) {
        let w = (self.width as f32 / self.scale).round() as u32;
        let h = (self.height as f32 / self.scale).round() as u32;
        (w.max(1), h.max(1))
    }
}

/// Linearly maps 8-bit color channels onto a target range.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    start: f32,
    factor: f32,
}

impl ColorMapper {
    /// Creates a color mapper that uniformly maps sRGB values to `target_range`.
    ///
    /// Note that this operates on *non-linear* sRGB colors, but maps them linearly to the target
    /// range.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        let start = *target_range.start();
        let end = *target_range.end();
        assert!(end > start);

        Self {
            start,
            factor: (end - start) / 255.0,
        }
    }

    pub fn map(&self, color: Rgb<u8>) -> [f32; 3] {
        color.0.map(|c| c as f32 * self.factor + self.start)
    }
}

/// Letterboxes `image` into the input tensor expected by `engine`.
pub fn preprocess(
    image: &RgbImage,
    engine: &dyn InferenceEngine,
) -> Result<(InputTensor, Letterbox), InferenceError> {
    let size = engine.input_size();
    let letterbox = Letterbox::for_image(image.width(), image.height(), size)?;
    let mapper = ColorMapper::linear(engine.color_range());
    let tensor = letterbox_image(image, &letterbox, size, engine.input_layout(), &mapper);
    Ok((tensor, letterbox))
}

fn letterbox_image(
    image: &RgbImage,
    letterbox: &Letterbox,
    size: u32,
    layout: InputLayout,
    mapper: &ColorMapper,
) -> InputTensor {
    let (w, h) = letterbox.scaled_size();
    let mut canvas = RgbImage::new(size, size);
    if (w, h) == image.dimensions() {
        imageops::replace(&mut canvas, image, 0, 0);
    } else {
        let scaled = imageops::resize(image, w, h, imageops::FilterType::Triangle);
        imageops::replace(&mut canvas, &scaled, 0, 0);
    }

    let n = size as usize;
    let mut data = vec![0.0; 3 * n * n];
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (c, value) in mapper.map(*pixel).into_iter().enumerate() {
            let index = match layout {
                InputLayout::Nhwc => (y * n + x) * 3 + c,
                InputLayout::Nchw => (c * n + y) * n + x,
            };
            data[index] = value;
        }
    }

    InputTensor::new(size, layout, data)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use palmbox_geom::Point2;

    use crate::nn::RawOutput;

    use super::*;

    struct Shape(u32, InputLayout);

    impl InferenceEngine for Shape {
        fn input_size(&self) -> u32 {
            self.0
        }

        fn input_layout(&self) -> InputLayout {
            self.1
        }

        fn infer(&self, _: &InputTensor) -> Result<RawOutput, InferenceError> {
            unreachable!()
        }
    }

    #[test]
    fn letterbox_scale() {
        let lb = Letterbox::for_image(4000, 2000, 192).unwrap();
        assert_abs_diff_eq!(lb.scale(), 4000.0 / 192.0);
        assert_eq!(lb.scaled_size(), (192, 96));
        let p = lb.to_source().apply(Point2::new(96.0, 48.0));
        assert_abs_diff_eq!(p.x, 2000.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 1000.0, epsilon = 1e-3);

        let lb = Letterbox::for_image(192, 192, 192).unwrap();
        assert_eq!(lb.scale(), 1.0);
        assert_eq!(
            lb.to_source().apply(Point2::new(21.0, 13.0)),
            Point2::new(21.0, 13.0)
        );
    }

    #[test]
    fn empty_image() {
        let err = preprocess(&RgbImage::new(0, 10), &Shape(192, InputLayout::Nhwc)).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::EmptyImage {
                width: 0,
                height: 10
            }
        ));
    }

    #[test]
    fn zero_input_size() {
        let err = preprocess(&RgbImage::new(640, 480), &Shape(0, InputLayout::Nchw)).unwrap_err();
        assert!(matches!(err, InferenceError::ZeroInputSize), "{err}");
    }

    #[test]
    fn color_mapping() {
        let mapper = ColorMapper::linear(-1.0..=1.0);
        let [r, g, b] = mapper.map(Rgb([0, 255, 127]));
        assert_eq!(r, -1.0);
        assert_abs_diff_eq!(g, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b, 127.0 / 127.5 - 1.0, epsilon = 1e-6);

        let mapper = ColorMapper::linear(0.0..=1.0);
        let [r, g, _] = mapper.map(Rgb([255, 0, 0]));
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-6);
        assert_eq!(g, 0.0);
    }

    #[test]
    fn pads_bottom_right() {
        // wide white image: the lower half of the input is padding
        let image = RgbImage::from_pixel(8, 4, Rgb([255, 255, 255]));

        let (tensor, _) = preprocess(&image, &Shape(4, InputLayout::Nhwc)).unwrap();
        assert_eq!(tensor.shape(), [1, 4, 4, 3]);
        let data = tensor.data();
        // pixel (x=3, y=1) is image, (x=0, y=3) is padding
        assert_abs_diff_eq!(data[(4 + 3) * 3], 1.0, epsilon = 0.01);
        assert_eq!(data[(3 * 4) * 3 + 2], -1.0);

        let (tensor, _) = preprocess(&image, &Shape(4, InputLayout::Nchw)).unwrap();
        assert_eq!(tensor.shape(), [1, 3, 4, 4]);
        let data = tensor.data();
        // green channel of (x=3, y=1), then blue channel of (x=0, y=3)
        assert_abs_diff_eq!(data[16 + 4 + 3], 1.0, epsilon = 0.01);
        assert_eq!(data[32 + 12], -1.0);
    }
}
