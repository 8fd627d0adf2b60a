pub mod chroma;
pub mod memory;
pub mod r#trait;

pub use chroma::ChromaStore;
pub use memory::MemoryStore;
pub use r#trait::VectorStore;
