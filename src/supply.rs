//! Image supply: the collaborator that feeds the backlog.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use image::RgbaImage;
use rand::seq::{IndexedRandom, index};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::SupplyError;

/// A decoded image waiting to be displayed.
#[derive(Debug, Clone)]
pub struct Photo {
    pub image: RgbaImage,
    pub source: PathBuf,
    /// Day the picture was taken, if known.
    pub taken_on: Option<NaiveDate>,
}

pub trait ImageSupply: Send + Sync {
    fn random_image(&self) -> Result<Photo, SupplyError>;

    fn random_images(&self, count: usize) -> Result<Vec<Photo>, SupplyError> {
        (0..count).map(|_| self.random_image()).collect()
    }

    /// Free whatever the supply attached to a photo it handed out earlier.
    fn release(&self, photo: Photo);
}

/// Picks random images from a local directory tree that an external sync job
/// keeps in step with the shared album.
#[derive(Debug, Clone)]
pub struct LibrarySupply {
    root: PathBuf,
    delete_after_display: bool,
}

impl LibrarySupply {
    pub fn new(root: impl Into<PathBuf>, delete_after_display: bool) -> Self {
        Self {
            root: root.into(),
            delete_after_display,
        }
    }

    fn scan(&self) -> Result<Vec<PathBuf>, SupplyError> {
        if !self.root.is_dir() {
            return Err(SupplyError::Unavailable(format!(
                "photo library {} is not a directory",
                self.root.display()
            )));
        }
        let found: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_image(p))
            .collect();
        if found.is_empty() {
            return Err(SupplyError::EmptyLibrary(self.root.clone()));
        }
        debug!(root = %self.root.display(), count = found.len(), "scanned photo library");
        Ok(found)
    }
}

impl ImageSupply for LibrarySupply {
    fn random_image(&self) -> Result<Photo, SupplyError> {
        let paths = self.scan()?;
        let path = paths
            .choose(&mut rand::rng())
            .ok_or_else(|| SupplyError::EmptyLibrary(self.root.clone()))?;
        load_photo(path)
    }

    fn random_images(&self, count: usize) -> Result<Vec<Photo>, SupplyError> {
        let paths = self.scan()?;
        let mut rng = rand::rng();
        let chosen: Vec<&PathBuf> = if count <= paths.len() {
            index::sample(&mut rng, paths.len(), count)
                .into_iter()
                .map(|i| &paths[i])
                .collect()
        } else {
            // Small library: repeats are unavoidable.
            (0..count).filter_map(|_| paths.choose(&mut rng)).collect()
        };
        let photos = chosen
            .into_iter()
            .map(|p| load_photo(p))
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = photos.len(), "loaded images from library");
        Ok(photos)
    }

    fn release(&self, photo: Photo) {
        if !self.delete_after_display {
            return;
        }
        if let Err(err) = delete_if_exists(&photo.source) {
            warn!(path = %photo.source.display(), "failed to delete displayed photo: {err}");
        }
    }
}

#[inline]
fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if ["jpg", "jpeg", "png", "webp"].contains(&e.as_str())
    )
}

fn load_photo(path: &Path) -> Result<Photo, SupplyError> {
    let image = decode_rgba8_apply_exif(path)?;
    let taken_on = read_capture_date(path).or_else(|| modified_date(path));
    debug!(path = %path.display(), ?taken_on, "decoded photo");
    Ok(Photo {
        image,
        source: path.to_path_buf(),
        taken_on,
    })
}

// Decodes to RGBA8 and applies the EXIF orientation when present.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage, SupplyError> {
    let decode_err = |source| SupplyError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(decode_err)?;
    let mut img = img.to_rgba8();

    match read_orientation(path).unwrap_or(1) {
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }
    Ok(img)
}

fn read_exif(path: &Path) -> Option<exif::Exif> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    exif::Reader::new().read_from_container(&mut buf).ok()
}

fn read_orientation(path: &Path) -> Option<u32> {
    let exif = read_exif(path)?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0)
}

fn read_capture_date(path: &Path) -> Option<NaiveDate> {
    let exif = read_exif(path)?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(values) => {
            let raw = values.first()?;
            let stamp = exif::DateTime::from_ascii(raw).ok()?;
            NaiveDate::from_ymd_opt(
                i32::from(stamp.year),
                u32::from(stamp.month),
                u32::from(stamp.day),
            )
        }
        _ => None,
    }
}

fn modified_date(path: &Path) -> Option<NaiveDate> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Local>::from(modified).date_naive())
}

fn delete_if_exists(p: &Path) -> std::io::Result<()> {
    match fs::remove_file(p) {
        Ok(()) => {
            info!(path = %p.display(), "delete: removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %p.display(), "delete: source missing; skipping");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
