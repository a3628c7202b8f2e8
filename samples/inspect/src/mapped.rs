use std::{fs::File, io, ops::Deref, path::Path};

use memmap2::Mmap;

/// A read-only file mapped into memory.
#[derive(Debug)]
pub struct MappedFile {
    _file: File,
    data: Option<Mmap>,
}

impl MappedFile {
    #[allow(unsafe_code)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let path = path.as_ref();
        tracing::trace!(path = path.as_os_str().to_str(), "memory-mapping buffer file");
        if path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("expected file, found directory: {path:?}"),
            ));
        }
        let file = File::options().read(true).write(false).open(path)?;
        Ok(Self {
            data: Some(unsafe { Mmap::map(&file)? }),
            _file: file,
        })
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        self.data.take(); // the mmap must be dropped before we close its associated file
    }
}

impl Deref for MappedFile {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        self.data.as_deref().unwrap_or_default()
    }
}
