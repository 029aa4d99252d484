use std::cell::Cell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use tokio::task::yield_now;
use tracing::{info, warn};

use crate::{
    decode_source, ApplicationError, DestinationPicker, ImageDecoder, ImageEncoder, ImageItem,
    OfflineCompositor, PickOutcome, RenderConfig, SaveRequest, StorageFile,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportState {
    #[default]
    Idle,
    Rendering,
    Encoding,
    Writing,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported {
        destination: PathBuf,
        /// The destination was the item's own file.
        overwrote_source: bool,
        /// The caller's item now refers to the destination file.
        replaced_item: bool,
    },
    Cancelled,
}

/// Shared view of the coordinator's state, readable while an export is
/// suspended at one of its await points.
#[derive(Debug, Clone, Default)]
pub struct ExportProgress(Rc<Cell<ExportState>>);

impl ExportProgress {
    pub fn get(&self) -> ExportState {
        self.0.get()
    }

    fn set(&self, state: ExportState) {
        self.0.set(state);
    }
}

/// Renders the current adjustments at full resolution and saves the result
/// where the user picks.
pub struct ExportCoordinator {
    compositor: OfflineCompositor,
    decoder: Box<dyn ImageDecoder>,
    encoder: Box<dyn ImageEncoder>,
    picker: Box<dyn DestinationPicker>,
    config: RenderConfig,
    progress: ExportProgress,
}

impl ExportCoordinator {
    pub fn new(
        compositor: OfflineCompositor,
        decoder: Box<dyn ImageDecoder>,
        encoder: Box<dyn ImageEncoder>,
        picker: Box<dyn DestinationPicker>,
        config: RenderConfig,
    ) -> Self {
        Self {
            compositor,
            decoder,
            encoder,
            picker,
            config,
            progress: ExportProgress::default(),
        }
    }

    pub fn state(&self) -> ExportState {
        self.progress.get()
    }

    pub fn progress(&self) -> ExportProgress {
        self.progress.clone()
    }

    #[tracing::instrument(skip_all, fields(source = %item.path().display()))]
    pub async fn export(
        &mut self,
        item: &mut ImageItem,
    ) -> Result<ExportOutcome, ApplicationError> {
        self.progress.set(ExportState::Idle);
        let result = self.run(item).await;
        match &result {
            Ok(ExportOutcome::Cancelled) => self.progress.set(ExportState::Idle),
            Ok(ExportOutcome::Exported { .. }) => self.progress.set(ExportState::Done),
            Err(error) => {
                warn!(%error, "export failed");
                self.progress.set(ExportState::Failed);
            }
        }
        result
    }

    async fn run(&mut self, item: &mut ImageItem) -> Result<ExportOutcome, ApplicationError> {
        let request = SaveRequest::for_source(item.path());
        let destination = match self.picker.pick_save_file(&request)? {
            PickOutcome::Picked(file) => file,
            PickOutcome::Cancelled => {
                info!("export cancelled by user");
                return Ok(ExportOutcome::Cancelled);
            }
        };

        self.progress.set(ExportState::Rendering);
        yield_now().await;
        let source = decode_source(item.file(), self.decoder.as_ref())?;
        yield_now().await;
        // Read the values as they are now, not when the picker opened.
        let snapshot = item.adjustments().snapshot();
        let rendered = self.compositor.render(&snapshot, source)?;

        self.progress.set(ExportState::Encoding);
        yield_now().await;
        let format = self.config.format_for(destination.path());
        let bytes = self.encoder.encode(&rendered, format)?;

        self.progress.set(ExportState::Writing);
        yield_now().await;
        write_all(destination.as_ref(), &bytes)?;
        yield_now().await;

        let destination_path = destination.path().to_path_buf();
        let overwrote_source = destination.canonical_path() == item.file().canonical_path();
        let written = ImageItem::load(destination, self.decoder.as_ref())?;

        if overwrote_source {
            item.replace_image(written.image().clone());
            item.adjustments_mut().reset();
        } else {
            item.adjustments_mut().reset();
            *item = written;
        }

        info!(
            destination = %destination_path.display(),
            bytes = bytes.len(),
            overwrote_source,
            "exported image"
        );
        Ok(ExportOutcome::Exported {
            destination: destination_path,
            overwrote_source,
            replaced_item: !overwrote_source,
        })
    }
}

fn write_all(file: &dyn StorageFile, bytes: &[u8]) -> Result<(), ApplicationError> {
    let mut writer = file.open_writable()?;
    writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .map_err(|error| ApplicationError::Write(format!("{}: {error}", file.path().display())))
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::io::{self, Cursor, Read, Write};
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use photo_lab_domain::{Bitmap, PixelSize};

    use crate::{ApplicationError, ImageDecoder, ImageEncoder, OutputFormat, StorageFile};

    pub type Disk = Rc<RefCell<HashMap<PathBuf, Vec<u8>>>>;

    /// A file in an in-memory disk. Writes land when the writer is flushed.
    pub struct MemoryFile {
        pub path: PathBuf,
        pub disk: Disk,
        pub fail_writes: bool,
    }

    impl MemoryFile {
        pub fn new(disk: &Disk, path: &str) -> Self {
            Self {
                path: PathBuf::from(path),
                disk: Rc::clone(disk),
                fail_writes: false,
            }
        }
    }

    impl StorageFile for MemoryFile {
        fn path(&self) -> &Path {
            &self.path
        }

        fn open_readable(&self) -> Result<Box<dyn Read>, ApplicationError> {
            let bytes = self
                .disk
                .borrow()
                .get(&self.path)
                .cloned()
                .ok_or_else(|| {
                    let missing = format!("{} not found", self.path.display());
                    ApplicationError::SourceUnavailable(missing)
                })?;
            Ok(Box::new(Cursor::new(bytes)))
        }

        fn open_writable(&self) -> Result<Box<dyn Write>, ApplicationError> {
            Ok(Box::new(MemoryWriter {
                path: self.path.clone(),
                disk: Rc::clone(&self.disk),
                buffer: Vec::new(),
                fail: self.fail_writes,
            }))
        }
    }

    struct MemoryWriter {
        path: PathBuf,
        disk: Disk,
        buffer: Vec<u8>,
        fail: bool,
    }

    impl Write for MemoryWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if !self.fail {
                self.disk
                    .borrow_mut()
                    .insert(self.path.clone(), self.buffer.clone());
            }
            Ok(())
        }
    }

    /// Raw format: width and height as little-endian u32, then RGBA8 bytes.
    pub fn raw_bytes(bitmap: &Bitmap) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&bitmap.width().to_le_bytes());
        bytes.extend_from_slice(&bitmap.height().to_le_bytes());
        bytes.extend_from_slice(&bitmap.to_rgba8());
        bytes
    }

    pub struct RawDecoder;

    impl ImageDecoder for RawDecoder {
        fn decode(&self, stream: &mut dyn Read) -> Result<Bitmap, ApplicationError> {
            let mut bytes = Vec::new();
            stream
                .read_to_end(&mut bytes)
                .map_err(|error| ApplicationError::SourceUnavailable(error.to_string()))?;
            if bytes.len() < 8 {
                return Err(ApplicationError::SourceUnavailable("truncated header".to_string()));
            }
            let width = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
            Bitmap::from_rgba8(width, height, &bytes[8..])
                .map_err(|error| ApplicationError::SourceUnavailable(error.to_string()))
        }
    }

    /// Records the requested formats; fails every call when `fail` is set.
    #[derive(Default)]
    pub struct RawEncoder {
        pub formats: Rc<RefCell<VecDeque<OutputFormat>>>,
        pub fail: bool,
    }

    impl ImageEncoder for RawEncoder {
        fn encode(
            &self,
            bitmap: &Bitmap,
            format: OutputFormat,
        ) -> Result<Vec<u8>, ApplicationError> {
            self.formats.borrow_mut().push_back(format);
            if self.fail {
                return Err(ApplicationError::Encode("encoder rejected bitmap".to_string()));
            }
            Ok(raw_bytes(bitmap))
        }
    }

    pub fn gray(width: u32, height: u32, level: f32) -> Bitmap {
        Bitmap::filled(PixelSize::new(width, height), [level, level, level, 1.0])
            .expect("test bitmap")
    }
}
