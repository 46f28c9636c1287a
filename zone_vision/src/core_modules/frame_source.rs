// THEORY:
// A `FrameSource` is the pull-based contract the capture side offers the
// worker. The worker asks for the next frame and receives either a frame or an
// explicit "no frame" (`Ok(None)`), never a callback. Acquiring the underlying
// resource is a separate `open` step so that a missing device is reported to
// the caller of `start()` before the worker ever reaches Running.
//
// Two sources ship with the crate: an `ImageSequenceSource` that replays a
// directory of still images (the stand-in for a camera during development),
// and a `StaticFrameSource` fed from memory.

use crate::core_modules::frame::Frame;
use crate::error::{Result, VisionError};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions `ImageSequenceSource` picks up.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "ppm"];

/// Supplies frames on demand.
pub trait FrameSource: Send {
    /// Acquires the capture resource. Called once per `start()`.
    fn open(&mut self) -> Result<()>;

    /// Returns the next frame, or `Ok(None)` when none is available right now.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Releases the capture resource. Must be safe to call when not open.
    fn close(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Replays the image files of one directory in name order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    looping: bool,
    files: Vec<PathBuf>,
    cursor: usize,
    sequence: u64,
    open: bool,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            dir: dir.into(),
            looping,
            files: Vec::new(),
            cursor: 0,
            sequence: 0,
            open: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of images found by the last `open`.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            VisionError::FrameSourceUnavailable(format!("{}: {e}", self.dir.display()))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(VisionError::FrameSourceUnavailable(format!(
                "{}: no image files",
                self.dir.display()
            )));
        }

        info!(
            dir = %self.dir.display(),
            frames = files.len(),
            looping = self.looping,
            "image sequence opened"
        );
        self.files = files;
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.open {
            return Err(VisionError::FrameSourceUnavailable(
                "image sequence is not open".into(),
            ));
        }
        if self.cursor >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.cursor = 0;
        }

        let path = &self.files[self.cursor];
        self.cursor += 1;
        let image = image::open(path)?.to_rgb8();
        debug!(path = %path.display(), "frame decoded");

        let frame = Frame::new(image).with_sequence(self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if self.open {
            info!(dir = %self.dir.display(), "image sequence closed");
        }
        self.open = false;
    }
}

/// Serves frames from memory.
///
/// With `repeat` set, the list is cycled forever; otherwise each frame is
/// returned once and the source then reports no frame.
#[derive(Debug, Clone, Default)]
pub struct StaticFrameSource {
    frames: VecDeque<Frame>,
    repeat: bool,
    sequence: u64,
    open: bool,
    opens: usize,
}

impl StaticFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>, repeat: bool) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            repeat,
            ..Self::default()
        }
    }

    /// A source that yields the same frame on every call.
    pub fn repeating(frame: Frame) -> Self {
        Self::new([frame], true)
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// How many times `open` has succeeded.
    pub fn open_count(&self) -> usize {
        self.opens
    }
}

impl FrameSource for StaticFrameSource {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        self.opens += 1;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.open {
            return Err(VisionError::FrameSourceUnavailable(
                "static source is not open".into(),
            ));
        }
        let Some(frame) = self.frames.pop_front() else {
            return Ok(None);
        };
        if self.repeat {
            self.frames.push_back(frame.clone());
        }
        let frame = frame.with_sequence(self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(rgb: [u8; 3]) -> Frame {
        Frame::new(RgbImage::from_pixel(8, 6, Rgb(rgb)))
    }

    #[test]
    fn static_source_drains_then_reports_no_frame() {
        let mut source = StaticFrameSource::new([solid([1, 2, 3]), solid([4, 5, 6])], false);
        assert!(source.next_frame().is_err());

        source.open().unwrap();
        assert_eq!(source.next_frame().unwrap().unwrap().sequence, 0);
        assert_eq!(source.next_frame().unwrap().unwrap().sequence, 1);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn repeating_source_never_runs_dry() {
        let mut source = StaticFrameSource::repeating(solid([9, 9, 9]));
        source.open().unwrap();
        for expected in 0..5 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.sequence, expected);
            assert_eq!(frame.image().get_pixel(0, 0).0, [9, 9, 9]);
        }
    }

    #[test]
    fn image_sequence_reads_sorted_files_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 200])).save(dir.path().join("b.png")).unwrap();
        RgbImage::from_pixel(4, 4, Rgb([200, 0, 0])).save(dir.path().join("a.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::new(dir.path(), false);
        source.open().unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.image().get_pixel(0, 0).0, [200, 0, 0]);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.image().get_pixel(0, 0).0, [0, 0, 200]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn looping_sequence_wraps() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])).save(dir.path().join("only.png")).unwrap();

        let mut source = ImageSequenceSource::new(dir.path(), true);
        source.open().unwrap();
        for expected in 0..3 {
            assert_eq!(source.next_frame().unwrap().unwrap().sequence, expected);
        }
    }

    #[test]
    fn missing_or_empty_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut empty = ImageSequenceSource::new(dir.path(), false);
        assert!(matches!(empty.open(), Err(VisionError::FrameSourceUnavailable(_))));

        let mut missing = ImageSequenceSource::new(dir.path().join("nope"), false);
        assert!(matches!(missing.open(), Err(VisionError::FrameSourceUnavailable(_))));
    }
}
