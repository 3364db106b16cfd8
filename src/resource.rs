//! Buffers and render targets shared between the pipelines.

use std::{
    ops::{Index, IndexMut},
    path::Path,
    sync::{Arc, Mutex},
};

use thiserror::Error;

use crate::util::{Color, UnsignedColor, color_to_unsigned, unsigned_to_color};

/// Render target or buffer shared between a renderer and a pipeline.
pub type SharedResource<T> = Arc<Mutex<Resource<T>>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Index {index} out of bounds for resource with {len} elements")]
    OutOfBounds { index: usize, len: usize },

    #[error("Coordinates ({x}, {y}) out of bounds for {width}x{height} resource")]
    CoordinatesOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// Two dimensional grid of elements stored row by row.
/// One dimensional buffers (vertices, indices) are stored as a single row.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Clone + Default> Resource<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Resource {
            data: vec![T::default(); width * height],
            width,
            height,
        }
    }
}

impl<T> Resource<T> {
    /// One dimensional resource holding the given elements.
    pub fn from_vec(data: Vec<T>) -> Self {
        let width = data.len();
        Resource {
            data,
            width,
            height: 1,
        }
    }

    pub fn into_shared(self) -> SharedResource<T> {
        Arc::new(Mutex::new(self))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&T, ResourceError> {
        let len = self.len();
        self.data
            .get(index)
            .ok_or(ResourceError::OutOfBounds { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, ResourceError> {
        let len = self.len();
        self.data
            .get_mut(index)
            .ok_or(ResourceError::OutOfBounds { index, len })
    }

    /// Element at the given coordinates.
    /// Coordinates are checked separately, x beyond the row width never wraps to the next row.
    pub fn get_xy(&self, x: usize, y: usize) -> Result<&T, ResourceError> {
        let index = self.linear_index(x, y)?;
        Ok(&self.data[index])
    }

    pub fn get_xy_mut(&mut self, x: usize, y: usize) -> Result<&mut T, ResourceError> {
        let index = self.linear_index(x, y)?;
        Ok(&mut self.data[index])
    }

    fn linear_index(&self, x: usize, y: usize) -> Result<usize, ResourceError> {
        if x < self.width && y < self.height {
            Ok(y * self.width + x)
        } else {
            Err(ResourceError::CoordinatesOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable rows of the grid, top to bottom.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [T]> {
        self.data.chunks_mut(self.width.max(1))
    }
}

impl<T: Clone> Resource<T> {
    pub fn fill(&mut self, value: &T) {
        self.data.fill(value.clone());
    }
}

impl<T> Index<usize> for Resource<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        self.get(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T> IndexMut<usize> for Resource<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.get_mut(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T> Index<(usize, usize)> for Resource<T> {
    type Output = T;

    fn index(&self, (x, y): (usize, usize)) -> &T {
        self.get_xy(x, y).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T> IndexMut<(usize, usize)> for Resource<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        self.get_xy_mut(x, y).unwrap_or_else(|e| panic!("{e}"))
    }
}

/// Element type of a render target.
pub trait PixelFormat: Copy + Default + Send + Sync + 'static {
    fn from_color(color: Color) -> Self;
    fn to_color(&self) -> Color;
}

impl PixelFormat for UnsignedColor {
    fn from_color(color: Color) -> Self {
        color_to_unsigned(color)
    }

    fn to_color(&self) -> Color {
        unsigned_to_color(*self)
    }
}

impl PixelFormat for Color {
    fn from_color(color: Color) -> Self {
        color
    }

    fn to_color(&self) -> Color {
        *self
    }
}

impl<P: PixelFormat> Resource<P> {
    pub fn to_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let c = color_to_unsigned(self[(x as usize, y as usize)].to_color());
            image::Rgb([c.r, c.g, c.b])
        })
    }

    /// Writes the resource to an image file, format is decided by the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        self.to_image().save(path)
    }
}
