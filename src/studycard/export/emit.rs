use super::{FileEmitter, RasterImage, pdf};
use crate::error::{CardError, Result};
use crate::model::ExportFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const JPEG_QUALITY: u8 = 90;

/// Writes exported cards into a directory, creating it when missing.
#[derive(Debug, Clone)]
pub struct DiskEmitter {
    dir: PathBuf,
}

impl DiskEmitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileEmitter for DiskEmitter {
    fn emit(&self, image: &RasterImage, format: ExportFormat, file_name: &str) -> Result<PathBuf> {
        if self.dir.exists() && !self.dir.is_dir() {
            return Err(CardError::Emit(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        fs::create_dir_all(&self.dir)?;
        let path = unused_path(&self.dir, file_name);

        match format {
            ExportFormat::Png => image.pixels.save_with_format(&path, ImageFormat::Png)?,
            ExportFormat::Jpg => {
                let rgb = flatten_on_white(&image.pixels);
                let mut writer = BufWriter::new(File::create(&path)?);
                JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ColorType::Rgb8,
                )?;
                writer.flush()?;
            }
            ExportFormat::Pdf => {
                let bytes = pdf::single_page(&flatten_on_white(&image.pixels))?;
                fs::write(&path, bytes)?;
            }
        }

        log::info!("wrote {}", path.display());
        Ok(path)
    }
}

/// `dir/file_name`, or `dir/<stem> (n).<ext>` with the first free `n` so an
/// earlier export is never overwritten.
fn unused_path(dir: &Path, file_name: &str) -> PathBuf {
    let path = dir.join(file_name);
    if !path.exists() {
        return path;
    }
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = name.extension().map(|e| e.to_string_lossy().into_owned());
    let mut n = 1;
    loop {
        let candidate = match &ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        };
        if !candidate.exists() {
            log::info!("{} exists, writing {} instead", file_name, candidate.display());
            return candidate;
        }
        n += 1;
    }
}

/// Composites transparent pixels over white for formats without alpha.
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let a = p[3] as u16;
        let mix = |c: u8| ((c as u16 * a + 255 * (255 - a)) / 255) as u8;
        Rgb([mix(p[0]), mix(p[1]), mix(p[2])])
    })
}
