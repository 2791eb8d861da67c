//! Error types for batch storage

use std::collections::TryReserveError;

use crate::batch::slot_table::EntityId;
use crate::batch::textures::TextureFormat;
use crate::geometry::MeshId;

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur while mutating batches
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Entity is already resident in the batch
    #[error("Entity {0:?} is already present in the batch")]
    DuplicateEntity(EntityId),

    /// Entity is not resident in the batch
    #[error("Entity {0:?} is not present in the batch")]
    UnknownEntity(EntityId),

    /// Slot index past the end of the attribute arrays (internal consistency bug)
    #[error("Slot {slot} out of range for capacity {capacity}")]
    SlotOutOfRange {
        /// Requested slot
        slot: u32,
        /// Current capacity of the attribute arrays
        capacity: u32,
    },

    /// Growing a store could not obtain memory
    #[error("Failed to grow {what} to {requested} elements: {source}")]
    AllocationFailure {
        /// Which storage was being grown
        what: &'static str,
        /// Element count that was requested
        requested: usize,
        /// Allocator error
        #[source]
        source: TryReserveError,
    },

    /// Mesh handle does not resolve in the mesh source
    #[error("Mesh {0:?} is not available")]
    UnknownMesh(MeshId),

    /// Texture format does not match the format of the layer array
    #[error("Texture format mismatch: array holds {expected:?}, got {actual:?}")]
    TextureFormatMismatch {
        /// Format fixed by the first upload
        expected: TextureFormat,
        /// Format of the rejected texture
        actual: TextureFormat,
    },

    /// Pixel payload does not match the size implied by its format
    #[error("Texture payload is {actual} bytes, expected {expected}")]
    TexturePayloadSize {
        /// Byte length implied by the format
        expected: usize,
        /// Byte length supplied
        actual: usize,
    },
}

impl BatchError {
    /// Whether a caller can reasonably log and carry on
    ///
    /// Entity-id and texture input errors leave the batch untouched. Slot and
    /// allocation errors mean the batch can no longer be trusted.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::SlotOutOfRange { .. } | Self::AllocationFailure { .. }
        )
    }
}
