pub mod transform;
pub mod codec;
pub mod container;
pub mod digest;
pub mod engine;
pub mod bench;

pub use transform::{TransformError, TransformId};
pub use codec::{CodecError, CodecId};
pub use container::{ContainerError, ContainerMetadata};
pub use engine::{pack, pack_with, unpack, inspect, EngineError, PackOptions, PackedArtifact};
