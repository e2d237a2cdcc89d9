//! Content metadata infrastructure

mod in_memory;

pub use in_memory::InMemoryContentMetadataRepository;
