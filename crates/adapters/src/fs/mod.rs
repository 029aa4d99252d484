mod picker;
mod storage;

pub use picker::PresetDestinationPicker;
pub use storage::FsStorageFile;
