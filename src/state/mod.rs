// View state helpers.
// Tracks how an API-backed view is doing while requests retry, fail or get superseded.

pub mod loading;

pub use loading::LoadState;
