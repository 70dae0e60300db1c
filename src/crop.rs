use std::{fs, path::Path};

use image::DynamicImage;

use crate::{
    detection::DetectionSet,
    error::{Error, Result},
};

const CROP_PREFIX: &str = "object_";
const CROP_EXTENSION: &str = "png";

pub fn crop_file_name(id: usize) -> String {
    format!("{CROP_PREFIX}{id}.{CROP_EXTENSION}")
}

/// Saves one crop per detection into `dir` and records its file name on the
/// detection. Boxes are clipped to the image; a box with nothing left after
/// clipping gets no crop.
pub fn write_crops(image: &DynamicImage, detections: &mut DetectionSet, dir: &Path) -> Result<()> {
    remove_stale_crops(dir)?;

    let (width, height) = (image.width(), image.height());

    for detection in detections.iter_mut() {
        let clip = |value: f64, max: u32| value.clamp(0.0, max as f64) as u32;
        let x_1 = clip(detection.bbox.x_1, width);
        let y_1 = clip(detection.bbox.y_1, height);
        let x_2 = clip(detection.bbox.x_2, width);
        let y_2 = clip(detection.bbox.y_2, height);

        if x_2 <= x_1 || y_2 <= y_1 {
            log::warn!(
                "detection {} lies outside the {}x{} image, no crop written",
                detection.id,
                width,
                height
            );
            detection.image_path = None;
            continue;
        }

        let name = crop_file_name(detection.id);
        image
            .crop_imm(x_1, y_1, x_2 - x_1, y_2 - y_1)
            .save(dir.join(&name))?;
        detection.image_path = Some(name.into());
    }

    Ok(())
}

fn remove_stale_crops(dir: &Path) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let is_crop = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.starts_with(CROP_PREFIX) && name.ends_with(&format!(".{CROP_EXTENSION}"))
            });
        if is_crop {
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
        }
    }

    Ok(())
}
