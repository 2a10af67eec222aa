//! Per-image session state: annotation list, recovery cache and navigation.

mod cache;
mod navigation;
mod store;

pub use cache::{CacheError, SessionCache, SessionSnapshot, entry_name};
pub use navigation::{NavState, Navigator, is_image_filename};
pub use store::{AnnotationStore, StoreError};
