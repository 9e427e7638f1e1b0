use std::path::{Path, PathBuf};

use crate::{
    foundation::error::{TurntableError, TurntableResult},
    render::Frame,
};

/// Zero-padded index width that keeps `count` file names lexicographically ordered.
pub fn index_width(count: usize, min_width: usize) -> usize {
    let digits = count.saturating_sub(1).max(1).ilog10() as usize + 1;
    digits.max(min_width)
}

pub fn frame_file_name(prefix: &str, index: usize, width: usize) -> String {
    format!("{prefix}_{index:0width$}.png")
}

/// Writes numbered frames (and optionally depth maps) into one directory.
#[derive(Clone, Debug)]
pub struct PngSink {
    pub dir: PathBuf,
    pub index_width: usize,
    pub write_depth: bool,
}

impl PngSink {
    pub fn create(dir: impl Into<PathBuf>, index_width: usize, write_depth: bool) -> TurntableResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| TurntableError::encode(&dir, format!("create output dir: {e}")))?;
        Ok(Self {
            dir,
            index_width,
            write_depth,
        })
    }

    pub fn color_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(frame_file_name("frame", index, self.index_width))
    }

    pub fn depth_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(frame_file_name("depth", index, self.index_width))
    }

    /// Write `frame` under its own index; returns the color image path.
    pub fn write(&self, frame: &Frame) -> TurntableResult<PathBuf> {
        let color_path = self.color_path(frame.index);
        write_color_png(frame, &color_path)?;
        if self.write_depth {
            write_depth_png(frame, &self.depth_path(frame.index))?;
        }
        Ok(color_path)
    }
}

pub fn write_color_png(frame: &Frame, path: &Path) -> TurntableResult<()> {
    let img = image::RgbImage::from_raw(frame.width, frame.height, frame.color.clone())
        .ok_or_else(|| TurntableError::encode(path, "color buffer size does not match frame"))?;
    write_atomically(path, |tmp| img.save_with_format(tmp, image::ImageFormat::Png))
}

/// 16-bit grayscale depth, normalized over covered pixels; background stays 0.
pub fn write_depth_png(frame: &Frame, path: &Path) -> TurntableResult<()> {
    let (lo, hi) = frame.depth_range().unwrap_or((0.0, 1.0));
    let span = (hi - lo).max(f32::EPSILON);
    let pixels: Vec<u16> = frame
        .depth
        .iter()
        .map(|&d| {
            if d > 0.0 {
                // Near is bright.
                (1.0 + (hi - d) / span * (u16::MAX as f32 - 1.0)).round() as u16
            } else {
                0
            }
        })
        .collect();
    let img = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_raw(
        frame.width,
        frame.height,
        pixels,
    )
    .ok_or_else(|| TurntableError::encode(path, "depth buffer size does not match frame"))?;
    write_atomically(path, |tmp| img.save_with_format(tmp, image::ImageFormat::Png))
}

/// Encode to a hidden sibling and rename, so `path` is either complete or absent.
fn write_atomically(
    path: &Path,
    encode: impl FnOnce(&Path) -> image::ImageResult<()>,
) -> TurntableResult<()> {
    let name = path
        .file_name()
        .ok_or_else(|| TurntableError::encode(path, "output path has no file name"))?;
    let tmp = path.with_file_name(format!(".{}.partial", name.to_string_lossy()));
    if let Err(e) = encode(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(TurntableError::encode(path, e.to_string()));
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        TurntableError::encode(path, format!("rename into place: {e}"))
    })
}
