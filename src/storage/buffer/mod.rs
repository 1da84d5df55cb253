mod error;
mod frame;
mod manager;

pub use error::BufferError;
pub use frame::{Frame, FrameHandle};
pub use manager::BufferManager;
