use std::fmt::{Debug, Formatter};
use std::path::Path;

use photo_lab_domain::{Bitmap, PixelSize};

use crate::{decode_source, AdjustmentModel, ApplicationError, ImageDecoder, StorageFile};

/// An opened photo: its file, decoded pixels and adjustment model.
pub struct ImageItem {
    file: Box<dyn StorageFile>,
    image: Bitmap,
    adjustments: AdjustmentModel,
}

impl ImageItem {
    pub fn new(file: Box<dyn StorageFile>, image: Bitmap) -> Self {
        Self {
            file,
            image,
            adjustments: AdjustmentModel::new(),
        }
    }

    pub fn load(
        file: Box<dyn StorageFile>,
        decoder: &dyn ImageDecoder,
    ) -> Result<Self, ApplicationError> {
        let image = decode_source(file.as_ref(), decoder)?;
        Ok(Self::new(file, image))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn file(&self) -> &dyn StorageFile {
        self.file.as_ref()
    }

    pub fn image(&self) -> &Bitmap {
        &self.image
    }

    pub fn pixel_size(&self) -> PixelSize {
        self.image.size()
    }

    pub fn adjustments(&self) -> &AdjustmentModel {
        &self.adjustments
    }

    pub fn adjustments_mut(&mut self) -> &mut AdjustmentModel {
        &mut self.adjustments
    }

    pub(crate) fn replace_image(&mut self, image: Bitmap) {
        self.image = image;
    }
}

impl Debug for ImageItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageItem")
            .field("path", &self.path())
            .field("size", &self.pixel_size())
            .field("adjustments", &self.adjustments)
            .finish()
    }
}
