pub mod db;
pub mod llm;
pub mod memory;

pub use db::DbAdapter;
pub use llm::OpenAiChunkSource;
pub use memory::InMemoryDb;
