pub mod error;
pub mod manager;
pub mod page_guard;
pub mod replacer;

pub use error::BufferPoolError;
pub use manager::BufferPoolManager;
pub use page_guard::{PageGuard, ReadPageGuard, WritePageGuard};
pub use replacer::{LruKReplacer, ReplacerError};
