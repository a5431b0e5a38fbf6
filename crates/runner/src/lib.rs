pub mod harness;
pub mod memory;
pub mod mongo;
pub mod store;

pub use harness::{run, Harness, Measurement};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{DocumentStore, ResultSet, StoreError, Submission};
