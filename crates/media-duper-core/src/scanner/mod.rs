pub mod walk;

pub use walk::{find_media_files, MediaFile};
