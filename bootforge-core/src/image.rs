//! Installer image sources.
//!
//! An [`ImageHandle`] is the engine's only view of an image: a known size and
//! a sequential chunk reader. Sources that need preparation (`.xz` files,
//! directory trees) are staged into a temporary file first, because the
//! safety guard's capacity check needs the true size before any byte is
//! written.

use crate::errors::FlashError;
use log::info;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;
use xz2::read::XzDecoder;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What to flash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDescriptor {
    /// A raw image file; `.xz`-compressed files are decompressed on open.
    File(PathBuf),
    /// A directory tree, packed into a single staged archive on open.
    Tree(PathBuf),
}

impl ImageDescriptor {
    pub fn path(&self) -> &Path {
        match self {
            ImageDescriptor::File(path) | ImageDescriptor::Tree(path) => path,
        }
    }
}

impl fmt::Display for ImageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDescriptor::File(path) => write!(f, "file:{}", path.display()),
            ImageDescriptor::Tree(path) => write!(f, "tree:{}", path.display()),
        }
    }
}

/// An opened image: fixed size, sequential reader, read once end-to-end.
#[derive(Debug)]
pub struct ImageHandle {
    descriptor: ImageDescriptor,
    size_bytes: u64,
    reader: File,
    bytes_read: u64,
    // Keeps staged decompression/packing output alive for the session.
    _staging: Option<TempDir>,
}

impl ImageHandle {
    pub fn open(descriptor: &ImageDescriptor) -> Result<Self, FlashError> {
        match descriptor {
            ImageDescriptor::File(path) => open_file_image(descriptor, path),
            ImageDescriptor::Tree(path) => open_tree_image(descriptor, path),
        }
    }

    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Sequential read filling as much of `buf` as the image allows.
    /// Returns `Ok(0)` at end of image.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, FlashError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(unreadable(self.descriptor.path(), err)),
            }
        }
        self.bytes_read += filled as u64;
        Ok(filled)
    }
}

fn open_file_image(descriptor: &ImageDescriptor, path: &Path) -> Result<ImageHandle, FlashError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(FlashError::ImageNotFound(path.to_path_buf()))
        }
        Err(err) => return Err(unreadable(path, err)),
    };
    if meta.is_dir() {
        return Err(unreadable(
            path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "is a directory (flash it as a tree image)",
            ),
        ));
    }
    if !meta.is_file() {
        // FIFOs, sockets, character devices: no way to know the size up
        // front, and the capacity check depends on it.
        return Err(FlashError::SizeUnknown(path.to_path_buf()));
    }

    if path.extension().is_some_and(|ext| ext == "xz") {
        let (staging, staged) = decompress_xz_image(path)?;
        finish_open(descriptor, &staged, Some(staging))
    } else {
        finish_open(descriptor, path, None)
    }
}

fn open_tree_image(descriptor: &ImageDescriptor, path: &Path) -> Result<ImageHandle, FlashError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(FlashError::ImageNotFound(path.to_path_buf()))
        }
        Err(err) => return Err(unreadable(path, err)),
    };
    if !meta.is_dir() {
        return Err(unreadable(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "tree image is not a directory"),
        ));
    }
    let (staging, staged) = pack_tree(path)?;
    finish_open(descriptor, &staged, Some(staging))
}

fn finish_open(
    descriptor: &ImageDescriptor,
    backing: &Path,
    staging: Option<TempDir>,
) -> Result<ImageHandle, FlashError> {
    let meta = fs::metadata(backing).map_err(|err| unreadable(descriptor.path(), err))?;
    let reader = File::open(backing).map_err(|err| unreadable(descriptor.path(), err))?;
    Ok(ImageHandle {
        descriptor: descriptor.clone(),
        size_bytes: meta.len(),
        reader,
        bytes_read: 0,
        _staging: staging,
    })
}

/// Stage an `.xz` image as a raw file so its decompressed size is known
/// before the write begins.
fn decompress_xz_image(path: &Path) -> Result<(TempDir, PathBuf), FlashError> {
    info!("🗜️ Decompressing {} into staging...", path.display());
    let staging = TempDir::new().map_err(|err| unreadable(path, err))?;
    let staged = match path.file_stem() {
        Some(stem) => staging.path().join(stem),
        None => staging.path().join("image.img"),
    };

    let input = File::open(path).map_err(|err| unreadable(path, err))?;
    let mut decoder = XzDecoder::new(input);
    let mut out = File::create(&staged).map_err(|err| unreadable(path, err))?;
    io::copy(&mut decoder, &mut out).map_err(|err| unreadable(path, err))?;
    Ok((staging, staged))
}

/// Pack a directory tree into one staged archive file (stored, uncompressed
/// entries) so it can be flashed like any other raw image.
fn pack_tree(root: &Path) -> Result<(TempDir, PathBuf), FlashError> {
    info!("📦 Packing directory tree {} into staging...", root.display());
    let staging = TempDir::new().map_err(|err| unreadable(root, err))?;
    let staged = staging.path().join("payload.img");
    let out = File::create(&staged).map_err(|err| unreadable(root, err))?;

    let mut writer = ZipWriter::new(out);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry =
            entry.map_err(|err| unreadable(root, io::Error::new(io::ErrorKind::Other, err)))?;
        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let rel_name = rel.to_string_lossy().replace('\\', "/");
        let file_type = entry.file_type();
        if file_type.is_dir() {
            writer
                .add_directory(rel_name, options)
                .map_err(|err| unreadable(root, io::Error::new(io::ErrorKind::Other, err)))?;
        } else if file_type.is_file() {
            writer
                .start_file(rel_name, options)
                .map_err(|err| unreadable(root, io::Error::new(io::ErrorKind::Other, err)))?;
            let mut input = File::open(entry.path()).map_err(|err| unreadable(root, err))?;
            io::copy(&mut input, &mut writer).map_err(|err| unreadable(root, err))?;
        }
        // Symlinks and special files are skipped; installer payloads are
        // plain trees.
    }
    writer
        .finish()
        .map_err(|err| unreadable(root, io::Error::new(io::ErrorKind::Other, err)))?;
    Ok((staging, staged))
}

fn unreadable(path: &Path, source: io::Error) -> FlashError {
    FlashError::ImageUnreadable {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_image_not_found() {
        let descriptor = ImageDescriptor::File(PathBuf::from("/nonexistent/fedora.img"));
        let err = ImageHandle::open(&descriptor).unwrap_err();
        assert!(matches!(err, FlashError::ImageNotFound(_)));
    }

    #[test]
    fn directory_as_file_image_is_unreadable() {
        let dir = tempdir().unwrap();
        let descriptor = ImageDescriptor::File(dir.path().to_path_buf());
        let err = ImageHandle::open(&descriptor).unwrap_err();
        assert!(matches!(err, FlashError::ImageUnreadable { .. }));
    }

    #[test]
    fn non_regular_file_has_unknown_size() {
        // Character devices stream; their size cannot be known up front.
        let descriptor = ImageDescriptor::File(PathBuf::from("/dev/null"));
        let err = ImageHandle::open(&descriptor).unwrap_err();
        assert!(matches!(err, FlashError::SizeUnknown(_)));
    }

    #[test]
    fn raw_file_reports_size_and_reads_sequentially() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payload.img");
        fs::write(&path, b"0123456789").unwrap();

        let descriptor = ImageDescriptor::File(path);
        let mut handle = ImageHandle::open(&descriptor).unwrap();
        assert_eq!(handle.size_bytes(), 10);

        let mut buf = [0u8; 4];
        assert_eq!(handle.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(handle.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"4567");
        assert_eq!(handle.read_chunk(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(handle.read_chunk(&mut buf).unwrap(), 0);
        assert_eq!(handle.bytes_read(), 10);
    }

    #[test]
    fn xz_file_is_staged_with_decompressed_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payload.img.xz");
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(b"decompressed payload").unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let descriptor = ImageDescriptor::File(path);
        let mut handle = ImageHandle::open(&descriptor).unwrap();
        assert_eq!(handle.size_bytes(), 20);

        let mut buf = vec![0u8; 32];
        let n = handle.read_chunk(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"decompressed payload");
    }

    #[test]
    fn tree_is_packed_into_a_sized_payload() {
        let dir = tempdir().unwrap();
        let tree = dir.path().join("installer");
        fs::create_dir_all(tree.join("boot")).unwrap();
        fs::write(tree.join("boot/kernel"), vec![0xEEu8; 2048]).unwrap();
        fs::write(tree.join("readme.txt"), b"hi").unwrap();

        let descriptor = ImageDescriptor::Tree(tree);
        let mut handle = ImageHandle::open(&descriptor).unwrap();
        assert!(handle.size_bytes() > 2048);

        let mut total = 0usize;
        let mut buf = vec![0u8; 512];
        loop {
            let n = handle.read_chunk(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total as u64, handle.size_bytes());
    }

    #[test]
    fn missing_tree_is_image_not_found() {
        let descriptor = ImageDescriptor::Tree(PathBuf::from("/nonexistent/tree"));
        let err = ImageHandle::open(&descriptor).unwrap_err();
        assert!(matches!(err, FlashError::ImageNotFound(_)));
    }

    #[test]
    fn descriptor_display_names_the_kind() {
        let file = ImageDescriptor::File(PathBuf::from("/a/b.img"));
        let tree = ImageDescriptor::Tree(PathBuf::from("/a/tree"));
        assert_eq!(file.to_string(), "file:/a/b.img");
        assert_eq!(tree.to_string(), "tree:/a/tree");
    }
}
