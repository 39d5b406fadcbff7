use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::MODEL_BASE_URL_ENV;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("model {name} not found in {searched}; set SIGHTLINE_MODEL_BASE_URL to fetch it")]
    NotFound { name: String, searched: String },
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file by name.
///
/// Resolution order:
/// 1. Explicit models directory (from the command line)
/// 2. User cache directory (platform-specific)
/// 3. Download from `{base_url}/{name}` into the cache, when a base URL is set
pub fn resolve(
    name: &str,
    models_dir: Option<&Path>,
    base_url: Option<&str>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(dir) = models_dir {
        let explicit = dir.join(name);
        if explicit.exists() {
            log::debug!("Using model {}", explicit.display());
            return Ok(explicit);
        }
    }

    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    let Some(base_url) = base_url else {
        let mut searched: Vec<String> = models_dir
            .map(|d| d.display().to_string())
            .into_iter()
            .collect();
        searched.push(cache_dir.display().to_string());
        return Err(ModelResolveError::NotFound {
            name: name.to_string(),
            searched: searched.join(", "),
        });
    };

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    let url = model_url(base_url, name);
    log::info!("Downloading {name} from {url}");
    download(&url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Base URL configured through the environment, if any.
pub fn base_url_from_env() -> Option<String> {
    std::env::var(MODEL_BASE_URL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Sightline/models/`
/// - Linux: `$XDG_CACHE_HOME/Sightline/models/` or `~/.cache/Sightline/models/`
/// - Windows: `%LOCALAPPDATA%/Sightline/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Sightline").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Sightline").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn model_url(base_url: &str, name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), name)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let write_err = |source: std::io::Error| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(temp_path).map_err(write_err)?;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
