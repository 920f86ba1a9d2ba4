//! Serving files from a directory under a wildcard route.
//!
//! `static_files("/assets", "./public")` registers `GET /assets/*filepath`.
//! The wildcard capture is the request path with the route prefix already
//! stripped (and percent-decoded), so it maps directly onto a path below the
//! root directory.
//!
//! Files are read into memory whole and sent as one body. There is no
//! `Last-Modified`, no conditional request handling and no range support, so
//! this suits small assets; put large or cache-sensitive files behind a real
//! file server.

use std::fs;
use std::path::{Component, Path, PathBuf};

use http::StatusCode;
use tracing::debug;

use crate::context::Context;
use crate::response::ContentType;

/// Name of the wildcard capture used by static routes.
pub(crate) const FILEPATH: &str = "filepath";

pub(crate) struct FileServer {
    root: PathBuf,
}

impl FileServer {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Answers `404` with no body unless the capture names a regular file
    /// inside the root.
    pub(crate) fn serve(&self, ctx: &mut Context) {
        let Some(file) = ctx.param(FILEPATH).and_then(|rel| self.resolve(rel)) else {
            ctx.status(StatusCode::NOT_FOUND);
            return;
        };
        match fs::read(&file) {
            Ok(bytes) => {
                ctx.set_header("content-type", ContentType::from_path(&file).as_str());
                ctx.data(StatusCode::OK, &bytes);
            }
            Err(err) => {
                debug!(file = %file.display(), %err, "static file unreadable");
                ctx.status(StatusCode::NOT_FOUND);
            }
        }
    }

    /// Joins `rel` onto the root, refusing anything that could climb out of
    /// it and anything that is not a regular file.
    fn resolve(&self, rel: &str) -> Option<PathBuf> {
        let rel = Path::new(rel);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        let full = self.root.join(rel);
        fs::metadata(&full).ok()?.is_file().then_some(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("weft-static-{name}-{}", std::process::id()));
        fs::create_dir_all(dir.join("css")).unwrap();
        fs::write(dir.join("css/a.css"), "body{}").unwrap();
        dir
    }

    #[test]
    fn resolves_files_inside_root_only() {
        let root = scratch_dir("resolve");
        let server = FileServer::new(root.clone());

        assert_eq!(server.resolve("css/a.css"), Some(root.join("css/a.css")));
        assert_eq!(server.resolve("css"), None);
        assert_eq!(server.resolve("missing.js"), None);
        assert_eq!(server.resolve("../etc/passwd"), None);
        assert_eq!(server.resolve("css/../css/a.css"), None);

        fs::remove_dir_all(root).unwrap();
    }
}
