//! Asynchronous image loading.
//!
//! Each requested url is decoded on its own worker thread and reported back
//! over a channel the owner drains once per tick. Dropping the receiver
//! (on dispose) makes late workers fail their send and exit quietly.

use crossbeam_channel::{unbounded, Receiver, Sender};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported url {0:?} (only local paths and file:// urls)")]
    Unsupported(String),
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone)]
pub enum ResourceState {
    Pending,
    Ready(Arc<DynamicImage>),
    Failed(Arc<LoadError>),
}

type Message = (String, Result<DynamicImage, LoadError>);

pub struct Resources {
    base_dir: Option<PathBuf>,
    states: HashMap<String, ResourceState>,
    tx: Sender<Message>,
    rx: Option<Receiver<Message>>,
}

impl Resources {
    /// Relative paths resolve against `base_dir` when given.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            base_dir,
            states: HashMap::new(),
            tx,
            rx: Some(rx),
        }
    }

    /// Starts loading `url` unless it is already known.
    pub fn request(&mut self, url: &str) {
        if self.rx.is_none() || self.states.contains_key(url) {
            return;
        }

        let path = match resolve(url, self.base_dir.as_deref()) {
            Ok(path) => path,
            Err(err) => {
                log::warn!("{err}");
                self.states
                    .insert(url.to_string(), ResourceState::Failed(Arc::new(err)));
                return;
            }
        };

        self.states.insert(url.to_string(), ResourceState::Pending);
        let tx = self.tx.clone();
        let url = url.to_string();
        thread::spawn(move || {
            let result = load_image(&path);
            let _ = tx.send((url, result));
        });
    }

    /// Registers an already decoded image under `url`.
    pub fn insert(&mut self, url: &str, image: DynamicImage) {
        self.states
            .insert(url.to_string(), ResourceState::Ready(Arc::new(image)));
    }

    /// Drains finished loads; returns the urls that settled this call.
    pub fn poll(&mut self) -> Vec<String> {
        let Some(rx) = &self.rx else {
            return Vec::new();
        };

        let mut settled = Vec::new();
        while let Ok((url, result)) = rx.try_recv() {
            let state = match result {
                Ok(image) => {
                    log::debug!("loaded {url} ({}x{})", image.width(), image.height());
                    ResourceState::Ready(Arc::new(image))
                }
                Err(err) => {
                    log::warn!("resource {url}: {err}");
                    ResourceState::Failed(Arc::new(err))
                }
            };
            self.states.insert(url.clone(), state);
            settled.push(url);
        }
        settled
    }

    pub fn state(&self, url: &str) -> Option<&ResourceState> {
        self.states.get(url)
    }

    /// The decoded image, if `url` loaded successfully.
    pub fn image(&self, url: &str) -> Option<&Arc<DynamicImage>> {
        match self.states.get(url) {
            Some(ResourceState::Ready(img)) => Some(img),
            _ => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.states
            .values()
            .filter(|s| matches!(s, ResourceState::Pending))
            .count()
    }

    /// True once nothing requested is still loading.
    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    /// Abandons in-flight loads and releases every image.
    pub fn dispose(&mut self) {
        self.rx = None;
        self.states.clear();
    }
}

/// Maps a url to a local path.
pub fn resolve(url: &str, base_dir: Option<&Path>) -> Result<PathBuf, LoadError> {
    let raw = match url.strip_prefix("file://") {
        Some(rest) => rest,
        None if url.contains("://") || url.starts_with("data:") => {
            return Err(LoadError::Unsupported(url.to_string()))
        }
        None => url,
    };
    let path = PathBuf::from(raw);
    Ok(match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    })
}

fn load_image(path: &Path) -> Result<DynamicImage, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    image::load_from_memory(&bytes).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::time::{Duration, Instant};

    fn wait_settled(res: &mut Resources) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !res.is_settled() && Instant::now() < deadline {
            res.poll();
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn resolves_paths_and_rejects_remote_urls() {
        let base = Path::new("/scenes");
        assert_eq!(resolve("maps/a.png", Some(base)).ok(), Some(PathBuf::from("/scenes/maps/a.png")));
        assert_eq!(resolve("file:///abs/b.png", Some(base)).ok(), Some(PathBuf::from("/abs/b.png")));
        assert!(matches!(
            resolve("https://example.com/c.png", None),
            Err(LoadError::Unsupported(_))
        ));
    }

    #[test]
    fn loads_on_a_worker_and_reports_failures() {
        let dir = std::env::temp_dir().join(format!("dotglobe-res-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]))
            .save_with_format(dir.join("ok.png"), ImageFormat::Png)
            .expect("write png");

        let mut res = Resources::new(Some(dir.clone()));
        res.request("ok.png");
        res.request("missing.png");
        res.request("https://remote/x.png");
        assert!(matches!(res.state("https://remote/x.png"), Some(ResourceState::Failed(_))));

        wait_settled(&mut res);
        let img = res.image("ok.png").expect("decoded");
        assert_eq!((img.width(), img.height()), (3, 2));
        assert!(matches!(res.state("missing.png"), Some(ResourceState::Failed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn dispose_abandons_pending_loads() {
        let mut res = Resources::new(None);
        res.dispose();
        res.request("anything.png");
        assert!(res.state("anything.png").is_none());
        assert!(res.poll().is_empty());
    }
}
