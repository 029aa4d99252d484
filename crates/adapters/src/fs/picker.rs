use std::collections::VecDeque;
use std::path::PathBuf;

use photo_lab_application::{ApplicationError, DestinationPicker, PickOutcome, SaveRequest};
use tracing::debug;

use super::FsStorageFile;

/// Answers save dialogs from a queue of prepared choices, for shells
/// without an interactive dialog. `None` entries and an empty queue cancel.
///
/// A chosen path without an extension gets the first extension the
/// request offers.
#[derive(Debug, Default)]
pub struct PresetDestinationPicker {
    choices: VecDeque<Option<PathBuf>>,
}

impl PresetDestinationPicker {
    pub fn new(choices: impl IntoIterator<Item = Option<PathBuf>>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
        }
    }

    pub fn push(&mut self, choice: Option<PathBuf>) {
        self.choices.push_back(choice);
    }
}

impl DestinationPicker for PresetDestinationPicker {
    fn pick_save_file(&mut self, request: &SaveRequest) -> Result<PickOutcome, ApplicationError> {
        let Some(mut path) = self.choices.pop_front().flatten() else {
            debug!(suggested = %request.suggested_file.display(), "save dialog cancelled");
            return Ok(PickOutcome::Cancelled);
        };

        if path.extension().is_none() {
            let default_extension = request
                .file_types
                .iter()
                .flat_map(|choice| choice.extensions.iter())
                .next();
            if let Some(extension) = default_extension {
                path.set_extension(extension.trim_start_matches('.'));
            }
        }
        Ok(PickOutcome::Picked(Box::new(FsStorageFile::new(path))))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn picked_path(outcome: PickOutcome) -> PathBuf {
        match outcome {
            PickOutcome::Picked(file) => file.path().to_path_buf(),
            PickOutcome::Cancelled => panic!("expected a picked file"),
        }
    }

    #[test]
    fn bare_names_get_the_first_offered_extension() {
        let mut picker = PresetDestinationPicker::new([Some(PathBuf::from("/out/edited"))]);
        let request = SaveRequest::for_source(Path::new("/photos/a.png"));

        let outcome = picker.pick_save_file(&request).expect("pick");

        assert_eq!(picked_path(outcome), PathBuf::from("/out/edited.jpg"));
    }

    #[test]
    fn explicit_extensions_are_kept() {
        let mut picker = PresetDestinationPicker::new([Some(PathBuf::from("/out/edited.png"))]);
        let request = SaveRequest::for_source(Path::new("/photos/a.jpg"));

        let outcome = picker.pick_save_file(&request).expect("pick");

        assert_eq!(picked_path(outcome), PathBuf::from("/out/edited.png"));
    }

    #[test]
    fn none_and_exhausted_queues_cancel() {
        let mut picker = PresetDestinationPicker::new([None]);
        let request = SaveRequest::for_source(Path::new("/photos/a.jpg"));

        assert!(matches!(
            picker.pick_save_file(&request).expect("first"),
            PickOutcome::Cancelled
        ));
        assert!(matches!(
            picker.pick_save_file(&request).expect("second"),
            PickOutcome::Cancelled
        ));
    }
}
