//! Leaf region extraction and model input preprocessing
//!
//! Segments vegetation by HSV color range, cleans the mask with a closing
//! then an opening, and crops to the bounding box of the largest connected
//! region. When no usable region exists the full image is kept.

use std::collections::VecDeque;

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use serde::Serialize;

use crate::external::classifier::ImageTensor;

/// Segmentation parameters. HSV bounds use the 8-bit OpenCV scale:
/// hue 0-180, saturation and value 0-255.
#[derive(Debug, Clone)]
pub struct RoiConfig {
    pub hsv_lower: [u8; 3],
    pub hsv_upper: [u8; 3],
    /// Side of the square structuring element
    pub kernel_size: u32,
    /// Minimum crop width and height
    pub min_region: u32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            hsv_lower: [25, 40, 40],
            hsv_upper: [95, 255, 255],
            kernel_size: 7,
            min_region: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Why the full image was used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum FallbackReason {
    NoVegetation,
    RegionTooSmall { width: u32, height: u32 },
}

/// Result of region extraction; both variants carry a usable image
#[derive(Debug, Clone)]
pub enum RegionOutcome {
    Cropped {
        image: DynamicImage,
        bounds: BoundingBox,
    },
    FullImage {
        image: DynamicImage,
        reason: FallbackReason,
    },
}

impl RegionOutcome {
    pub fn image(&self) -> &DynamicImage {
        match self {
            RegionOutcome::Cropped { image, .. } | RegionOutcome::FullImage { image, .. } => image,
        }
    }

    pub fn is_cropped(&self) -> bool {
        matches!(self, RegionOutcome::Cropped { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoiExtractor {
    config: RoiConfig,
}

impl RoiExtractor {
    pub fn new(config: RoiConfig) -> Self {
        Self { config }
    }

    /// Crop to the dominant leaf region. Never fails.
    pub fn extract(&self, image: &DynamicImage) -> RegionOutcome {
        let (width, height) = image.dimensions();
        let mask = Mask::from_image(image, &self.config);
        let radius = self.config.kernel_size / 2;
        let cleaned = mask
            .dilate(radius)
            .erode(radius)
            .erode(radius)
            .dilate(radius);

        let Some(bounds) = cleaned.largest_component() else {
            tracing::warn!("No vegetation region found in {}x{} image", width, height);
            return RegionOutcome::FullImage {
                image: image.clone(),
                reason: FallbackReason::NoVegetation,
            };
        };

        if bounds.width < self.config.min_region || bounds.height < self.config.min_region {
            tracing::warn!(
                "Leaf region {}x{} below minimum {}, using full image",
                bounds.width,
                bounds.height,
                self.config.min_region
            );
            return RegionOutcome::FullImage {
                image: image.clone(),
                reason: FallbackReason::RegionTooSmall {
                    width: bounds.width,
                    height: bounds.height,
                },
            };
        }

        tracing::debug!(?bounds, "Cropped leaf region");
        RegionOutcome::Cropped {
            image: image.crop_imm(bounds.x, bounds.y, bounds.width, bounds.height),
            bounds,
        }
    }
}

/// Resize to a square model input and flatten to HWC floats in 0-255
pub fn to_tensor(image: &DynamicImage, size: u32) -> ImageTensor {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, size, size, FilterType::Triangle);

    ImageTensor {
        width: size,
        height: size,
        data: resized.into_raw().into_iter().map(f32::from).collect(),
    }
}

/// RGB to HSV in the 8-bit OpenCV convention
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let saturation = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    [
        (hue / 2.0).round() as u8,
        saturation.round() as u8,
        max as u8,
    ]
}

#[derive(Debug, Clone, Copy)]
enum Morph {
    Dilate,
    Erode,
}

/// Binary mask, row-major
#[derive(Debug, Clone, PartialEq)]
struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    fn from_image(image: &DynamicImage, config: &RoiConfig) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let bits = rgb
            .pixels()
            .map(|p| {
                let hsv = rgb_to_hsv(p[0], p[1], p[2]);
                (0..3).all(|c| config.hsv_lower[c] <= hsv[c] && hsv[c] <= config.hsv_upper[c])
            })
            .collect();
        Self {
            width,
            height,
            bits,
        }
    }

    fn at(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    fn dilate(&self, radius: u32) -> Self {
        self.morph(radius, Morph::Dilate)
    }

    fn erode(&self, radius: u32) -> Self {
        self.morph(radius, Morph::Erode)
    }

    /// Square-kernel morphology as a horizontal then a vertical pass.
    /// Pixels outside the image do not take part.
    fn morph(&self, radius: u32, op: Morph) -> Self {
        let pass = |src: &Mask, horizontal: bool| -> Mask {
            let mut bits = Vec::with_capacity(src.bits.len());
            for y in 0..src.height {
                for x in 0..src.width {
                    let (pos, limit) = if horizontal {
                        (x, src.width)
                    } else {
                        (y, src.height)
                    };
                    let lo = pos.saturating_sub(radius);
                    let hi = (pos + radius).min(limit - 1);
                    let mut window = (lo..=hi).map(|i| {
                        if horizontal {
                            src.at(i, y)
                        } else {
                            src.at(x, i)
                        }
                    });
                    bits.push(match op {
                        Morph::Dilate => window.any(|b| b),
                        Morph::Erode => window.all(|b| b),
                    });
                }
            }
            Mask {
                width: src.width,
                height: src.height,
                bits,
            }
        };
        pass(&pass(self, true), false)
    }

    /// Bounding box of the largest 8-connected region; first found wins ties
    fn largest_component(&self) -> Option<BoundingBox> {
        let mut visited = vec![false; self.bits.len()];
        let mut best: Option<(usize, BoundingBox)> = None;
        let mut queue = VecDeque::new();

        for start in 0..self.bits.len() {
            if !self.bits[start] || visited[start] {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);

            let mut area = 0usize;
            let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
            let (mut max_x, mut max_y) = (0u32, 0u32);

            while let Some(idx) = queue.pop_front() {
                let x = idx as u32 % self.width;
                let y = idx as u32 / self.width;
                area += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                for ny in y.saturating_sub(1)..=(y + 1).min(self.height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(self.width - 1) {
                        let n = (ny * self.width + nx) as usize;
                        if self.bits[n] && !visited[n] {
                            visited[n] = true;
                            queue.push_back(n);
                        }
                    }
                }
            }

            if best.as_ref().map_or(true, |(a, _)| area > *a) {
                best = Some((
                    area,
                    BoundingBox {
                        x: min_x,
                        y: min_y,
                        width: max_x - min_x + 1,
                        height: max_y - min_y + 1,
                    },
                ));
            }
        }

        best.map(|(_, bounds)| bounds)
    }
}
