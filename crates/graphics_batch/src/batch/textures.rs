//! Texture layer allocation
//!
//! Each batch keeps its textures in layered arrays, one layer per distinct
//! texture. Layers are handed out densely and never reclaimed. When an array
//! is full its capacity grows geometrically (×1.5 by default): textures arrive
//! one at a time as assets stream in, so exact-size growth would copy the
//! whole array on every new texture.
//!
//! Layer size is fixed by the first uploaded image. Growth copies the live
//! layers into the new arena before dropping the old one.

use std::collections::HashMap;

use crate::error::{BatchError, BatchResult};

/// Externally issued texture identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Dimensions and pixel size shared by every layer of one array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureFormat {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Faces per layer (1 for 2D textures, 6 for cube maps)
    pub faces: u32,
    /// Bytes per pixel (3 for RGB8, 4 for RGBA8)
    pub bytes_per_pixel: u32,
}

impl TextureFormat {
    /// Single-face RGBA8 texture
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self { width, height, faces: 1, bytes_per_pixel: 4 }
    }

    /// Bytes occupied by one layer
    pub fn layer_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.faces as usize * self.bytes_per_pixel as usize
    }
}

/// Decoded texture handed over by the asset source
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    /// Identity of the texture
    pub id: TextureId,
    /// Layout of `pixels`
    pub format: TextureFormat,
    /// Tightly packed pixel data, all faces back to back
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Image filled with one repeated pixel value
    pub fn solid(id: TextureId, format: TextureFormat, pixel: &[u8]) -> Self {
        let pixels = pixel
            .iter()
            .copied()
            .cycle()
            .take(format.layer_bytes())
            .collect();
        Self { id, format, pixels }
    }
}

/// Read-only access to decoded textures owned elsewhere
pub trait TextureSource {
    /// Look up the decoded image for `id`
    fn texture(&self, id: TextureId) -> Option<&TextureImage>;
}

impl TextureSource for HashMap<TextureId, TextureImage> {
    fn texture(&self, id: TextureId) -> Option<&TextureImage> {
        self.get(&id)
    }
}

/// Capacity after one geometric growth step
///
/// Always grows by at least one layer, so a zero capacity or a factor that
/// rounds back to the same value still makes progress.
pub fn next_texture_capacity(capacity: u32, growth_factor: f32) -> u32 {
    let grown = (f64::from(capacity) * f64::from(growth_factor)).ceil();
    let grown = if grown >= f64::from(u32::MAX) { u32::MAX } else { grown as u32 };
    grown.max(capacity.saturating_add(1))
}

/// Maps texture ids to layers of one capacity-bounded texture array
#[derive(Debug)]
pub struct TextureLayerAllocator {
    layers: HashMap<TextureId, u32>,
    textures: Vec<TextureId>,
    capacity: u32,
    growth_factor: f32,
    format: Option<TextureFormat>,
    pixels: Vec<u8>,
    growths: u32,
}

impl TextureLayerAllocator {
    /// Create an allocator with room for `initial_capacity` layers
    pub fn new(initial_capacity: u32, growth_factor: f32) -> Self {
        Self {
            layers: HashMap::new(),
            textures: Vec::new(),
            capacity: initial_capacity,
            growth_factor,
            format: None,
            pixels: Vec::new(),
            growths: 0,
        }
    }

    /// Layer of `texture`, assigning the next free layer if it is new
    pub fn resolve_or_create(&mut self, texture: TextureId) -> BatchResult<u32> {
        if let Some(&layer) = self.layers.get(&texture) {
            return Ok(layer);
        }

        if self.count() == self.capacity {
            self.grow()?;
        }

        let layer = self.count();
        self.textures.push(texture);
        self.layers.insert(texture, layer);
        log::debug!("Texture {:?} assigned layer {}", texture, layer);
        Ok(layer)
    }

    /// Layer of `texture` without assigning one
    pub fn layer_of(&self, texture: TextureId) -> Option<u32> {
        self.layers.get(&texture).copied()
    }

    /// Texture stored in `layer`
    pub fn texture_at(&self, layer: u32) -> Option<TextureId> {
        self.textures.get(layer as usize).copied()
    }

    /// Copy an image into its layer, assigning the layer first if needed
    ///
    /// The first upload fixes the array format; later images must match it.
    pub fn upload(&mut self, image: &TextureImage) -> BatchResult<u32> {
        let expected = image.format.layer_bytes();
        if image.pixels.len() != expected {
            return Err(BatchError::TexturePayloadSize { expected, actual: image.pixels.len() });
        }

        match self.format {
            Some(format) if format != image.format => {
                return Err(BatchError::TextureFormatMismatch { expected: format, actual: image.format });
            }
            Some(_) => {}
            None => {
                self.pixels = allocate_arena(&[], self.capacity, expected)?;
                self.format = Some(image.format);
            }
        }

        let layer = self.resolve_or_create(image.id)?;
        let start = layer as usize * expected;
        self.pixels[start..start + expected].copy_from_slice(&image.pixels);
        Ok(layer)
    }

    /// Pixels of one layer, once a format has been established
    pub fn layer_pixels(&self, layer: u32) -> Option<&[u8]> {
        if layer >= self.count() {
            return None;
        }
        let layer_bytes = self.format?.layer_bytes();
        let start = layer as usize * layer_bytes;
        self.pixels.get(start..start + layer_bytes)
    }

    /// Pixels of every live layer, back to back
    pub fn live_pixels(&self) -> &[u8] {
        let live = self.format.map_or(0, |f| f.layer_bytes() * self.count() as usize);
        &self.pixels[..live.min(self.pixels.len())]
    }

    /// Textures in layer order
    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    /// Number of assigned layers
    pub fn count(&self) -> u32 {
        self.textures.len() as u32
    }

    /// Number of layers the array can hold before growing
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Layer format, fixed by the first upload
    pub fn format(&self) -> Option<TextureFormat> {
        self.format
    }

    /// Number of growth steps taken so far
    pub fn growths(&self) -> u32 {
        self.growths
    }

    /// Bytes held by the pixel arena
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    fn grow(&mut self) -> BatchResult<()> {
        let old_capacity = self.capacity;
        let new_capacity = next_texture_capacity(old_capacity, self.growth_factor);

        let pixels = match self.format {
            Some(format) => {
                let live = &self.pixels[..format.layer_bytes() * self.count() as usize];
                Some(allocate_arena(live, new_capacity, format.layer_bytes())?)
            }
            None => None,
        };
        let additional = new_capacity as usize - self.textures.len();
        self.textures
            .try_reserve_exact(additional)
            .map_err(|source| BatchError::AllocationFailure {
                what: "texture layer table",
                requested: new_capacity as usize,
                source,
            })?;

        log::info!("Growing texture array: {} -> {}", old_capacity, new_capacity);

        if let Some(pixels) = pixels {
            self.pixels = pixels;
        }
        self.capacity = new_capacity;
        self.growths += 1;
        Ok(())
    }
}

/// Allocate `layers` zeroed layers and copy `live` to the front
fn allocate_arena(live: &[u8], layers: u32, layer_bytes: usize) -> BatchResult<Vec<u8>> {
    let requested = layers as usize * layer_bytes;
    let mut arena = Vec::new();
    arena
        .try_reserve_exact(requested)
        .map_err(|source| BatchError::AllocationFailure { what: "texture array", requested, source })?;
    arena.extend_from_slice(live);
    arena.resize(requested, 0);
    Ok(arena)
}
