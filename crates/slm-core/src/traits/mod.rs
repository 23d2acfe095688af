//! Collaborator traits defined in `slm-core` and implemented by other crates.

pub mod cache;
pub mod deferred;
pub mod event_sink;
pub mod object_store;
pub mod option_store;

pub use cache::CacheProvider;
pub use deferred::DeferredExecutor;
pub use event_sink::EventSink;
pub use object_store::{ObjectHandle, ObjectStore};
pub use option_store::{OptionStore, VersionedValue};
