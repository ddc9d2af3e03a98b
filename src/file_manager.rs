use crate::error::{MirrorError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

#[derive(Clone, Debug)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    pub fn create_unique(parent: &Path, base_name: &str) -> Result<Self> {
        fs::create_dir_all(parent).map_err(|e| MirrorError::file_system(parent, e))?;

        let mut suffix = 0usize;
        loop {
            let name = if suffix == 0 {
                base_name.to_string()
            } else {
                format!("{}-{}", base_name, suffix)
            };
            let candidate = parent.join(&name);

            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(Self { base_dir: candidate }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(MirrorError::file_system(candidate, e)),
            }
        }
    }

    pub fn create_for_target(target: &Path) -> Result<Self> {
        let base_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "site".to_string());
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::create_unique(&parent, &base_name)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve_relative(&self, relative: &str) -> Result<PathBuf> {
        let mut path = self.base_dir.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(segment) => path.push(segment),
                _ => {
                    return Err(MirrorError::file_system(
                        relative,
                        std::io::Error::new(ErrorKind::InvalidInput, "path escapes output directory"),
                    ))
                }
            }
        }
        Ok(path)
    }

    pub fn save_file(&self, relative: &str, content: &[u8]) -> Result<PathBuf> {
        let file_path = self.resolve_relative(relative)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| MirrorError::file_system(parent, e))?;
        }

        let mut file = fs::File::create(&file_path)
            .map_err(|e| MirrorError::file_system(&file_path, e))?;
        file.write_all(content)
            .map_err(|e| MirrorError::file_system(&file_path, e))?;

        Ok(file_path)
    }
}
