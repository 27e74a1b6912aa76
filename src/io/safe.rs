use crate::types::{SarError, SarResult};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Calibration and noise annotation documents
pub const CALIBRATION_DIR: &str = "annotation/calibration";

/// Measurement rasters
pub const MEASUREMENT_DIR: &str = "measurement";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Unpacked `.SAFE` directory
    Directory,
    /// Zipped product, SAFE folder stored inside the archive
    Archive,
}

/// Read access to a Sentinel-1 SAFE product, unpacked or zipped.
///
/// Files are opened per call and closed before the call returns.
#[derive(Debug, Clone)]
pub struct SafeProduct {
    path: PathBuf,
    layout: Layout,
}

impl SafeProduct {
    /// Open a product directory or ZIP archive
    pub fn open<P: AsRef<Path>>(path: P) -> SarResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(SarError::NotFound(format!(
                "Product not found: {}",
                path.display()
            )));
        }

        let layout = if path.is_dir() {
            Layout::Directory
        } else {
            // Fail early on files that are not archives
            open_archive(&path)?;
            Layout::Archive
        };

        log::debug!("Opened {:?} product at {}", layout, path.display());
        Ok(Self { path, layout })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_archive(&self) -> bool {
        self.layout == Layout::Archive
    }

    /// File names directly inside `subdir`, sorted.
    ///
    /// Returns `None` when the subdirectory does not exist.
    pub fn list_dir(&self, subdir: &str) -> SarResult<Option<Vec<String>>> {
        let mut names = match self.layout {
            Layout::Directory => {
                let dir = self.path.join(subdir);
                if !dir.is_dir() {
                    return Ok(None);
                }
                let mut names = Vec::new();
                for entry in std::fs::read_dir(&dir)? {
                    let entry = entry?;
                    if !entry.file_type()?.is_file() {
                        continue;
                    }
                    match entry.file_name().into_string() {
                        Ok(name) => names.push(name),
                        Err(name) => log::warn!("Skipping non UTF-8 file name {:?}", name),
                    }
                }
                names
            }
            Layout::Archive => {
                let archive = open_archive(&self.path)?;
                let mut found_dir = false;
                let mut names = Vec::new();
                for entry in archive.file_names() {
                    if let Some(rest) = strip_subdir(entry, subdir) {
                        found_dir = true;
                        if !rest.is_empty() && !rest.contains('/') {
                            names.push(rest.to_string());
                        }
                    }
                }
                if !found_dir {
                    return Ok(None);
                }
                names
            }
        };

        names.sort();
        Ok(Some(names))
    }

    /// Path on disk of a file, when the product is unpacked
    pub fn local_path(&self, subdir: &str, name: &str) -> Option<PathBuf> {
        match self.layout {
            Layout::Directory => Some(self.path.join(subdir).join(name)),
            Layout::Archive => None,
        }
    }

    /// Stream a file's bytes into `writer`, returning the byte count
    pub fn copy_to<W: Write>(&self, subdir: &str, name: &str, writer: &mut W) -> SarResult<u64> {
        match self.layout {
            Layout::Directory => {
                let mut file = File::open(self.path.join(subdir).join(name))?;
                Ok(std::io::copy(&mut file, writer)?)
            }
            Layout::Archive => {
                let mut archive = open_archive(&self.path)?;
                let entry_name = archive
                    .file_names()
                    .find(|entry| strip_subdir(entry, subdir) == Some(name))
                    .map(str::to_string)
                    .ok_or_else(|| {
                        SarError::NotFound(format!(
                            "{}/{} not found in {}",
                            subdir,
                            name,
                            self.path.display()
                        ))
                    })?;

                let mut entry = archive.by_name(&entry_name).map_err(|e| {
                    SarError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("Failed to read {}: {}", entry_name, e),
                    ))
                })?;
                Ok(std::io::copy(&mut entry, writer)?)
            }
        }
    }

    /// Read a text file such as an annotation document
    pub fn read_to_string(&self, subdir: &str, name: &str) -> SarResult<String> {
        let mut bytes = Vec::new();
        self.copy_to(subdir, name, &mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|e| SarError::InvalidFormat(format!("{}/{} is not UTF-8: {}", subdir, name, e)))
    }
}

fn open_archive(path: &Path) -> SarResult<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| SarError::InvalidFormat(format!("Failed to open ZIP: {}", e)))
}

/// Part of an archive entry below `subdir`, when the entry lives under it.
///
/// `subdir` may sit below one or more leading folders (usually `<name>.SAFE/`).
fn strip_subdir<'a>(entry: &'a str, subdir: &str) -> Option<&'a str> {
    let marker = format!("{}/", subdir.trim_end_matches('/'));
    let pos = entry.rfind(&marker)?;
    if pos > 0 && !entry[..pos].ends_with('/') {
        return None;
    }
    Some(&entry[pos + marker.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_subdir() {
        let entry = "S1A_IW_GRDH.SAFE/annotation/calibration/noise-s1a-vv.xml";
        assert_eq!(strip_subdir(entry, CALIBRATION_DIR), Some("noise-s1a-vv.xml"));
        assert_eq!(
            strip_subdir(entry, "annotation"),
            Some("calibration/noise-s1a-vv.xml")
        );
        assert_eq!(strip_subdir("S1A.SAFE/annotation/calibration/", CALIBRATION_DIR), Some(""));
        assert_eq!(strip_subdir("annotation/calibration/a.xml", CALIBRATION_DIR), Some("a.xml"));
        assert_eq!(strip_subdir("S1A.SAFE/xannotation/calibration/a.xml", CALIBRATION_DIR), None);
        assert_eq!(strip_subdir("S1A.SAFE/measurement/a.tiff", CALIBRATION_DIR), None);
    }

    #[test]
    fn test_missing_product() {
        let result = SafeProduct::open("nonexistent.SAFE");
        assert!(matches!(result, Err(SarError::NotFound(_))));
    }

    #[test]
    fn test_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        let cal_dir = dir.path().join(CALIBRATION_DIR);
        std::fs::create_dir_all(&cal_dir).unwrap();
        std::fs::write(cal_dir.join("b.xml"), "<b/>").unwrap();
        std::fs::write(cal_dir.join("a.xml"), "<a/>").unwrap();
        std::fs::create_dir(cal_dir.join("nested")).unwrap();

        let product = SafeProduct::open(dir.path()).unwrap();
        assert!(!product.is_archive());
        assert_eq!(
            product.list_dir(CALIBRATION_DIR).unwrap(),
            Some(vec!["a.xml".to_string(), "b.xml".to_string()])
        );
        assert_eq!(product.list_dir(MEASUREMENT_DIR).unwrap(), None);
        assert_eq!(product.read_to_string(CALIBRATION_DIR, "b.xml").unwrap(), "<b/>");
    }
}
