use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::{Error, Result};

pub const DEFAULT_ARCHIVE_NAME: &str = "data.zip";

/// Packs every file under `root` into a zip at `archive_path`, so crops and
/// json files travel as one unit. Hidden files and leftover `*.tmp` files
/// are skipped. The archive is built next to its target and renamed into
/// place.
///
/// Returns the number of files packed.
pub fn write_archive(root: &Path, archive_path: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.retain(|(path, _)| path != archive_path);

    let tmp_path = archive_path.with_extension("zip.tmp");
    let file = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, name) in &files {
        zip.start_file(name.as_str(), options)?;
        let mut source = File::open(path).map_err(|e| Error::io(path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| Error::io(path, e))?;
    }
    zip.finish()?;

    fs::rename(&tmp_path, archive_path).map_err(|e| Error::io(archive_path, e))?;
    log::info!(
        "packed {} files from {} into {}",
        files.len(),
        root.display(),
        archive_path.display()
    );

    Ok(files.len())
}

/// Collects `(path, archive name)` pairs below `dir`, sorted by name.
fn collect_files(root: &Path, dir: &Path, files: &mut Vec<(PathBuf, String)>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| Error::io(dir, e))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| Error::io(dir, e))?;
    entries.sort();

    for path in entries {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if file_name.starts_with('.') || file_name.ends_with(".tmp") {
            continue;
        }

        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let name = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((path, name));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_archive_contains_json_and_crops() {
        let work = tempfile::tempdir().unwrap();
        let root = work.path().join("result");
        fs::create_dir_all(root.join("json")).unwrap();
        fs::create_dir_all(root.join("old")).unwrap();
        fs::write(root.join("json").join("new.json"), b"[]").unwrap();
        fs::write(root.join("json").join("add.json.tmp"), b"partial").unwrap();
        fs::write(root.join("json").join(".lock"), b"").unwrap();
        fs::write(root.join("object_0.png"), b"butter").unwrap();
        fs::write(root.join("old").join("object_0.png"), b"yogurt").unwrap();
        let archive_path = work.path().join(DEFAULT_ARCHIVE_NAME);

        let packed = write_archive(&root, &archive_path).unwrap();

        assert_eq!(packed, 3);
        assert!(!archive_path.with_extension("zip.tmp").exists());
        let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["json/new.json", "object_0.png", "old/object_0.png"]);

        let mut contents = String::new();
        archive
            .by_name("old/object_0.png")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "yogurt");
    }

    #[test]
    fn test_archive_inside_root_is_not_packed_into_itself() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("object_0.png"), b"cheese").unwrap();
        let archive_path = root.path().join(DEFAULT_ARCHIVE_NAME);

        assert_eq!(write_archive(root.path(), &archive_path).unwrap(), 1);
        assert_eq!(write_archive(root.path(), &archive_path).unwrap(), 1);
    }
}
