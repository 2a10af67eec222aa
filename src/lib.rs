//! Scene Annotator - bounding box annotation sessions
//!
//! Draw, label and describe boxes on one image at a time, keep unsaved work
//! in a per-image recovery cache, and export COCO-like JSON documents plus a
//! shared label to category id map. Object detection is delegated to an
//! external HTTP service.

pub mod config;
pub mod constants;
pub mod detect;
pub mod format;
pub mod model;
pub mod session;
pub mod state;
pub mod storage;

pub use config::AppConfig;
pub use session::{Session, SessionError};
