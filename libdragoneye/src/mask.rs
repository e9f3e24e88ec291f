use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

/// Intensity of foreground pixels
pub const FOREGROUND: u8 = 255;

/// Intensity of background pixels
pub const BACKGROUND: u8 = 0;

/// Axis-aligned pixel bounds of a region, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelBounds {
    fn point(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// An 8-connected foreground region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Label assigned in row-major scan order, starting at 1
    pub label: u32,
    /// Number of pixels
    pub area: u64,
    pub bounds: PixelBounds,
}

/// A two-level mask with the same dimensions as its source image
///
/// Every pixel is either [`BACKGROUND`] or [`FOREGROUND`]. An all-background
/// mask is a valid state meaning "no specimen found".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    image: GrayImage,
}

impl BinaryMask {
    /// An empty mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Binarize a grayscale image: any non-zero pixel becomes foreground
    pub fn from_gray(image: &GrayImage) -> Self {
        let image = imageproc::map::map_colors(image, |p| {
            Luma([if p[0] > 0 { FOREGROUND } else { BACKGROUND }])
        });
        Self { image }
    }

    /// Build a mask from a predicate over pixel coordinates
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let image = ImageBuffer::from_fn(width, height, |x, y| {
            Luma([if f(x, y) { FOREGROUND } else { BACKGROUND }])
        });
        Self { image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True if `(x, y)` is foreground
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] > 0
    }

    /// Number of foreground pixels
    pub fn foreground_count(&self) -> u64 {
        self.image.pixels().filter(|p| p[0] > 0).count() as u64
    }

    /// True if the mask has no foreground pixels
    pub fn is_empty(&self) -> bool {
        self.image.pixels().all(|p| p[0] == 0)
    }

    /// Borrow the underlying grayscale buffer
    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    /// Pixels in `self` that are not in `other`
    pub fn subtract(&self, other: &Self) -> Self {
        let (width, height) = self.dimensions();
        Self::from_fn(width, height, |x, y| self.get(x, y) && !other.get(x, y))
    }

    /// Pixels in either mask
    pub fn union(&self, other: &Self) -> Self {
        let (width, height) = self.dimensions();
        Self::from_fn(width, height, |x, y| self.get(x, y) || other.get(x, y))
    }

    /// Label the foreground into 8-connected components
    pub fn components(&self) -> Vec<Component> {
        self.label().1
    }

    fn label(&self) -> (ImageBuffer<Luma<u32>, Vec<u32>>, Vec<Component>) {
        let labels = connected_components(&self.image, Connectivity::Eight, Luma([BACKGROUND]));
        let mut components: Vec<Component> = Vec::new();

        for (x, y, pixel) in labels.enumerate_pixels() {
            let label = pixel[0];
            if label == 0 {
                continue;
            }
            let index = (label - 1) as usize;
            if index >= components.len() {
                components.resize(
                    index + 1,
                    Component {
                        label: 0,
                        area: 0,
                        bounds: PixelBounds::point(x, y),
                    },
                );
            }
            let component = &mut components[index];
            if component.area == 0 {
                component.label = label;
                component.bounds = PixelBounds::point(x, y);
            } else {
                component.bounds.include(x, y);
            }
            component.area += 1;
        }

        components.retain(|c| c.area > 0);
        (labels, components)
    }

    /// The component with the largest area; ties go to the first in scan order
    pub fn largest_component(&self) -> Option<Component> {
        largest(&self.components())
    }

    /// Keep only the largest component, with its enclosed holes filled
    pub fn largest_filled(&self) -> Self {
        let (width, height) = self.dimensions();
        let (labels, components) = self.label();
        let Some(biggest) = largest(&components) else {
            return Self::new(width, height);
        };

        let kept = Self::from_fn(width, height, |x, y| {
            labels.get_pixel(x, y)[0] == biggest.label
        });
        kept.fill_holes()
    }

    /// Fill background regions that do not touch the image border
    pub fn fill_holes(&self) -> Self {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return self.clone();
        }

        let inverted = imageproc::map::map_colors(&self.image, |p| {
            Luma([if p[0] > 0 { BACKGROUND } else { FOREGROUND }])
        });
        let holes = connected_components(&inverted, Connectivity::Four, Luma([BACKGROUND]));

        let mut touches_border = vec![false; 1];
        for (x, y, pixel) in holes.enumerate_pixels() {
            let label = pixel[0] as usize;
            if label >= touches_border.len() {
                touches_border.resize(label + 1, false);
            }
            if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                touches_border[label] = true;
            }
        }

        Self::from_fn(width, height, |x, y| {
            let label = holes.get_pixel(x, y)[0] as usize;
            (label != 0 && !touches_border[label]) || self.get(x, y)
        })
    }
}

fn largest(components: &[Component]) -> Option<Component> {
    components.iter().copied().fold(None, |best, c| match best {
        Some(b) if b.area >= c.area => Some(b),
        _ => Some(c),
    })
}

impl From<GrayImage> for BinaryMask {
    fn from(image: GrayImage) -> Self {
        Self::from_gray(&image)
    }
}
