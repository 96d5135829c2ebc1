// Response cache module.
// TTL-bounded caching of API responses over an in-memory or on-disk store.

pub mod clock;
pub mod file;
pub mod key;
pub mod paths;
pub mod response;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileStore;
pub use key::CacheKey;
pub use response::{Origin, ResponseCache};
pub use store::{CacheEntry, CacheStore, DEFAULT_TTL, MemoryStore};
