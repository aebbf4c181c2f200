//! Input boundary: locating and reading the two image files.
//!
//! Everything rejected here is reported as an [`InputError`] before any
//! classifier is called.

use crate::error::InputError;
use crate::models::{ImagePaths, Modality};
use crate::pipeline::ImagePair;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Check whether the file extension is in the allow-list (case-insensitive).
pub fn allowed_file(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Validate one image path without reading it.
fn check_path(
    modality: Modality,
    path: Option<&Path>,
    allowed: &[String],
) -> Result<PathBuf, InputError> {
    let path = match path {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Err(InputError::NotProvided { modality }),
    };

    if !allowed_file(path, allowed) {
        return Err(InputError::DisallowedExtension {
            modality,
            path: path.to_path_buf(),
            allowed: allowed.to_vec(),
        });
    }

    if !path.is_file() {
        return Err(InputError::NotFound {
            modality,
            path: path.to_path_buf(),
        });
    }

    Ok(path.to_path_buf())
}

fn read(modality: Modality, path: &Path) -> Result<Vec<u8>, InputError> {
    let bytes = std::fs::read(path).map_err(|source| InputError::Unreadable {
        modality,
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} image {} ({} bytes)", modality, path.display(), bytes.len());
    Ok(bytes)
}

/// Validate both paths, then read both files.
///
/// Both paths are validated before either file is read, so a missing Fundus
/// image is reported even when the OCT path is fine.
pub fn load_image_pair(
    oct: Option<&Path>,
    fundus: Option<&Path>,
    allowed: &[String],
) -> Result<(ImagePair, ImagePaths), InputError> {
    let oct_path = check_path(Modality::Oct, oct, allowed)?;
    let fundus_path = check_path(Modality::Fundus, fundus, allowed)?;

    let pair = ImagePair {
        oct: read(Modality::Oct, &oct_path)?,
        fundus: read(Modality::Fundus, &fundus_path)?,
    };

    let paths = ImagePaths {
        oct: oct_path.display().to_string(),
        fundus: fundus_path.display().to_string(),
    };

    Ok((pair, paths))
}
