//! Read-only index snapshots handed to the search layer by storage.

pub mod snapshot;

pub use self::snapshot::{
    IndexMetadata, IndexSnapshot, IndexSnapshotBuilder, ModalitySlice, SliceRecord, SnapshotRecord,
};
