//! BrainSprite mosaics and placeholder images
//!
//! The BrainSprite viewer reads a whole anatomical volume from one square
//! sprite sheet: every sagittal slice PNG becomes one tile of the sheet.

use crate::discover::find_files;
use crate::error::{Error, Result};
use crate::series::{RECTANGLE_PLACEHOLDER, SQUARE_PLACEHOLDER};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ColorType, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const JPEG_QUALITY: u8 = 95;

/// Build a sprite sheet from the PNG slices in `png_dir` and write it to
/// `dst` as JPEG.
///
/// Slices are placed last-to-first (natural order reversed), mirrored
/// left-right and shrunk to fit `tile` x `tile`. The sheet has
/// `floor(sqrt(n))` tiles per side; slices that do not fit are dropped.
pub fn make_mosaic(png_dir: &Path, dst: &Path, tile: u32) -> Result<PathBuf> {
    let mut slices = find_files(png_dir, "*.png")?;
    slices.reverse();

    let per_side = (slices.len() as f64).sqrt() as u32;
    if per_side == 0 {
        return Err(Error::EmptyMosaic(png_dir.to_path_buf()));
    }
    let dropped = slices.len() as u32 - per_side * per_side;
    if dropped > 0 {
        debug!("{} slices do not fit a {}x{} mosaic", dropped, per_side, per_side);
    }

    let side = tile * per_side;
    let mut sheet = RgbImage::new(side, side);

    for (index, path) in slices.iter().take((per_side * per_side) as usize).enumerate() {
        let img = image::open(path).map_err(|source| Error::Image {
            path: path.clone(),
            source,
        })?;
        let mut img = img.fliph();
        if img.width() > tile || img.height() > tile {
            img = img.thumbnail(tile, tile);
        }

        let index = index as u32;
        let x = (index % per_side) * tile;
        let y = (index / per_side) * tile;
        imageops::replace(&mut sheet, &img.to_rgb8(), x as i64, y as i64);
    }

    let file = File::create(dst).map_err(|e| Error::io(dst, e))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
        .encode(sheet.as_raw(), side, side, ColorType::Rgb8)
        .map_err(|source| Error::Image {
            path: dst.to_path_buf(),
            source,
        })?;

    info!("wrote {}x{} mosaic {}", per_side, per_side, dst.display());
    Ok(dst.to_path_buf())
}

/// Make `<images>/<tx>_mosaic.jpg` from `<summary>/<tx>_pngs` if those
/// slices exist. Returns the mosaic path when one was written.
pub fn preprocess_tx(tx: &str, summary_path: &Path, images_path: &Path, tile: u32) -> Option<PathBuf> {
    let pngs = summary_path.join(format!("{tx}_pngs"));
    if !pngs.is_dir() {
        info!("no {} slices at {}", tx, pngs.display());
        return None;
    }

    let dst = images_path.join(format!("{tx}_mosaic.jpg"));
    match make_mosaic(&pngs, &dst, tile) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("could not build the {} mosaic: {}", tx, e);
            None
        }
    }
}

fn placeholder(width: u32, height: u32) -> RgbImage {
    let border = Rgb([96, 96, 96]);
    let fill = Rgb([200, 200, 200]);
    RgbImage::from_fn(width, height, |x, y| {
        let edge = x < 2 || y < 2 || x + 2 >= width || y + 2 >= height;
        // A diagonal cross marks the image as missing.
        let cross = (x * height / width).abs_diff(y) < 2
            || (x * height / width).abs_diff(height - 1 - y) < 2;
        if edge || cross {
            border
        } else {
            fill
        }
    })
}

/// Write the placeholder images into `images_path` unless they exist.
pub fn write_placeholders(images_path: &Path, tile: u32) -> Result<()> {
    let targets = [
        (SQUARE_PLACEHOLDER, tile, tile),
        (RECTANGLE_PLACEHOLDER, tile * 3, tile),
    ];
    for (name, width, height) in targets {
        let path = images_path.join(name);
        if path.exists() {
            continue;
        }
        placeholder(width, height)
            .save(&path)
            .map_err(|source| Error::Image {
                path: path.clone(),
                source,
            })?;
        debug!("wrote placeholder {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn solid(dir: &Path, name: &str, w: u32, h: u32, color: [u8; 3]) {
        RgbImage::from_pixel(w, h, Rgb(color))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_mosaic_dimensions() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        for i in 1..=5 {
            solid(src.path(), &format!("slice{i}.png"), 10, 20, [i as u8 * 40, 0, 0]);
        }
        let dst = out.path().join("T1_mosaic.jpg");
        make_mosaic(src.path(), &dst, 218).unwrap();

        let sheet = image::open(&dst).unwrap();
        assert_eq!((sheet.width(), sheet.height()), (2 * 218, 2 * 218));
    }

    #[test]
    fn test_mosaic_order_is_reversed() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        // slice10 sorts last naturally, so it lands in the first tile.
        solid(src.path(), "slice2.png", 8, 8, [0, 0, 0]);
        solid(src.path(), "slice1.png", 8, 8, [0, 0, 0]);
        solid(src.path(), "slice3.png", 8, 8, [0, 0, 0]);
        solid(src.path(), "slice10.png", 8, 8, [255, 255, 255]);

        let dst = out.path().join("m.jpg");
        make_mosaic(src.path(), &dst, 8).unwrap();
        let sheet = image::open(&dst).unwrap().to_rgb8();
        assert!(sheet.get_pixel(4, 4)[0] > 200, "first tile should be the last slice");
        assert!(sheet.get_pixel(12, 12)[0] < 50);
    }

    #[test]
    fn test_mosaic_flips_left_right() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let img = RgbImage::from_fn(16, 16, |x, _| if x < 8 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) });
        img.save(src.path().join("only.png")).unwrap();

        let dst = out.path().join("m.jpg");
        make_mosaic(src.path(), &dst, 16).unwrap();
        let sheet = image::open(&dst).unwrap().to_rgb8();
        assert!(sheet.get_pixel(2, 8)[0] < 50, "left side was the right side");
        assert!(sheet.get_pixel(13, 8)[0] > 200);
    }

    #[test]
    fn test_empty_dir_is_error() {
        let src = tempdir().unwrap();
        let err = make_mosaic(src.path(), &src.path().join("m.jpg"), 218).unwrap_err();
        assert!(matches!(err, Error::EmptyMosaic(_)));
    }

    #[test]
    fn test_preprocess_tx_without_pngs() {
        let dir = tempdir().unwrap();
        assert_eq!(preprocess_tx("T2", dir.path(), dir.path(), 218), None);
    }

    #[test]
    fn test_preprocess_tx_writes_mosaic() {
        let dir = tempdir().unwrap();
        let pngs = dir.path().join("T1_pngs");
        std::fs::create_dir(&pngs).unwrap();
        solid(&pngs, "a1.png", 4, 4, [10, 10, 10]);

        let mosaic = preprocess_tx("T1", dir.path(), dir.path(), 4).unwrap();
        assert_eq!(mosaic, dir.path().join("T1_mosaic.jpg"));
        assert!(mosaic.is_file());
    }

    #[test]
    fn test_write_placeholders() {
        let dir = tempdir().unwrap();
        write_placeholders(dir.path(), 20).unwrap();
        let square = image::open(dir.path().join(SQUARE_PLACEHOLDER)).unwrap();
        let rect = image::open(dir.path().join(RECTANGLE_PLACEHOLDER)).unwrap();
        assert_eq!((square.width(), square.height()), (20, 20));
        assert_eq!((rect.width(), rect.height()), (60, 20));
    }
}
