use std::{
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    associate::Diff,
    detection::DetectionSet,
    error::{Error, Result},
};

pub const JSON_DIR: &str = "json";
pub const OLD_FILE: &str = "old.json";
pub const NEW_FILE: &str = "new.json";
pub const MATCH_FILE: &str = "match.json";
pub const ADD_FILE: &str = "add.json";
pub const DELETE_FILE: &str = "delete.json";
/// Crops of the previous generation, relative to the result root.
pub const OLD_CROP_DIR: &str = "old";
const LOCK_FILE: &str = ".lock";

/// The result directory shared with the inventory reconciliation service.
///
/// Current crops live at the root, previous ones under `old/`, the five json
/// files under `json/`. Only two generations of detections exist:
/// `old.json` and `new.json`.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
    json_dir: PathBuf,
}

impl ResultStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let json_dir = root.join(JSON_DIR);
        fs::create_dir_all(&json_dir).map_err(|e| Error::io(&json_dir, e))?;

        Ok(Self { root, json_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn json_path(&self, name: &str) -> PathBuf {
        self.json_dir.join(name)
    }

    /// Takes an exclusive advisory lock on `json/.lock`, held until the
    /// returned file is dropped. Serializes runs across processes sharing
    /// the result directory.
    pub fn lock(&self) -> Result<File> {
        let path = self.json_path(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;
        file.lock().map_err(|e| Error::io(&path, e))?;

        Ok(file)
    }

    /// Moves the current generation into the previous slot, crops included.
    ///
    /// Returns whether a previous generation exists afterwards.
    pub fn rotate(&self) -> Result<bool> {
        let new_path = self.json_path(NEW_FILE);
        let old_path = self.json_path(OLD_FILE);

        if new_path.exists() {
            let mut previous: DetectionSet = read_json(&new_path)?;
            self.rotate_crops(&mut previous)?;
            write_json(&old_path, &previous)?;
            fs::remove_file(&new_path).map_err(|e| Error::io(&new_path, e))?;
            log::info!("rotated {} to {}", new_path.display(), old_path.display());
            return Ok(true);
        }

        if old_path.exists() {
            log::warn!(
                "{} missing, reusing {} from an earlier run",
                new_path.display(),
                old_path.display()
            );
            return Ok(true);
        }

        Ok(false)
    }

    /// Moves each crop referenced by `previous` into `old/` and points the
    /// record at its new location.
    fn rotate_crops(&self, previous: &mut DetectionSet) -> Result<()> {
        let crop_dir = self.root.join(OLD_CROP_DIR);
        if crop_dir.exists() {
            fs::remove_dir_all(&crop_dir).map_err(|e| Error::io(&crop_dir, e))?;
        }
        fs::create_dir_all(&crop_dir).map_err(|e| Error::io(&crop_dir, e))?;

        for detection in previous.iter_mut() {
            let Some(image_path) = detection.image_path.take() else {
                continue;
            };
            let Some(file_name) = image_path.file_name() else {
                continue;
            };
            let source = self.root.join(&image_path);
            let rotated = Path::new(OLD_CROP_DIR).join(file_name);

            match fs::rename(&source, self.root.join(&rotated)) {
                Ok(()) => detection.image_path = Some(rotated),
                Err(err) => log::warn!(
                    "crop {} of object {} not rotated: {}",
                    source.display(),
                    detection.id,
                    err
                ),
            }
        }

        Ok(())
    }

    pub fn load_previous(&self) -> Result<Option<DetectionSet>> {
        let path = self.json_path(OLD_FILE);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn load_current(&self) -> Result<Option<DetectionSet>> {
        let path = self.json_path(NEW_FILE);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn write_current(&self, detections: &DetectionSet) -> Result<()> {
        write_json(&self.json_path(NEW_FILE), detections)
    }

    pub fn write_diff(&self, diff: &Diff) -> Result<()> {
        write_diff_to(&self.json_dir, diff)
    }
}

/// Writes `match.json`, `add.json` and `delete.json` into `dir`.
pub fn write_diff_to(dir: &Path, diff: &Diff) -> Result<()> {
    write_json(&dir.join(MATCH_FILE), &diff.matches)?;
    write_json(&dir.join(ADD_FILE), &diff.added)?;
    write_json(&dir.join(DELETE_FILE), &diff.deleted)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::json(path, e))
}

/// Writes pretty json (4 space indent) next to `path` and renames it into
/// place, so readers never see a half written file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let file = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| Error::json(&tmp_path, e))?;
    writer.flush().map_err(|e| Error::io(&tmp_path, e))?;
    drop(writer);

    fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))
}
