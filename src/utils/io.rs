use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::Serialize;

use crate::constants::DEFAULT_CACHE_DIRNAME;
use crate::error::Result;
use crate::meta::Meta;

/// Rendered images on disk, keyed by request and render style.
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    /// Uses `dir`, or `<system temp>/hapi-data` when none is given.
    pub fn new(dir: Option<PathBuf>) -> ImageCache {
        let dir = dir.unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_CACHE_DIRNAME));
        ImageCache { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path (without extension) identifying a request. One directory per server.
    pub fn request_path(
        &self,
        server: &str,
        dataset: &str,
        parameters: &str,
        start: &str,
        stop: &str,
    ) -> PathBuf {
        let server = server
            .split_once("://")
            .map_or(server, |(_, rest)| rest)
            .trim_end_matches('/')
            .replace('/', "_");
        let time = |t: &str| t.replace(&['-', ':', '.', 'Z'][..], "");
        let fname = format!(
            "{}_{}_{}_{}",
            dataset.replace('/', "_"),
            parameters.replace(',', "-"),
            time(start),
            time(stop)
        );
        self.dir.join(server).join(fname)
    }

    /// Image file for `parameter` of the request described by `meta`, rendered with
    /// `style` into `extension` format.
    pub fn path_for(
        &self,
        meta: &Meta,
        parameter: &str,
        style: &impl Serialize,
        extension: &str,
    ) -> Result<PathBuf> {
        let request = self.request_path(
            &meta.x_server,
            &meta.x_dataset,
            parameter,
            &meta.x_time_min,
            &meta.x_time_max,
        );
        let mut fname = request.into_os_string();
        fname.push(format!("-{}.{extension}", style_hash(style)?));
        Ok(PathBuf::from(fname))
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        match std::fs::read(path.as_ref()) {
            // Image present
            Ok(bytes) => Ok(Some(bytes)),

            // Image not present
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),

            // Any other I/O error
            Err(err) => Err(err.into()),
        }
    }

    pub fn insert(&self, path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, bytes)?)
    }
}

/// md5 of the compact JSON of `style`, with object keys sorted.
pub fn style_hash(style: &impl Serialize) -> Result<String> {
    // serde_json maps are ordered by key, so going through a Value sorts them.
    let json = serde_json::to_string(&serde_json::to_value(style)?)?;
    Ok(hex::encode(Md5::digest(json.as_bytes())))
}

#[test]
fn test_request_path() {
    let cache = ImageCache::new(Some(PathBuf::from("/cache")));
    let path = cache.request_path(
        "http://hapi-server.org/servers/TestData2.0/hapi",
        "dataset1",
        "scalar,vector",
        "1970-01-01T00:00:00.000Z",
        "1970-01-02T00:00:00Z",
    );
    assert_eq!(
        path,
        PathBuf::from(
            "/cache/hapi-server.org_servers_TestData2.0_hapi/dataset1_scalar-vector_19700101T000000000_19700102T000000"
        )
    );
}

#[test]
fn test_style_hash_ignores_key_order() {
    use serde_json::json;

    let a = style_hash(&json!({"savefig.dpi": 144, "font.size": 10})).unwrap();
    let b = style_hash(&json!({"font.size": 10, "savefig.dpi": 144})).unwrap();
    let c = style_hash(&json!({"font.size": 12, "savefig.dpi": 144})).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 32);
    assert_eq!(style_hash(&json!({})).unwrap(), "99914b932bd37a50b983c5e7c90ae93b");
}

#[test]
fn test_insert_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ImageCache::new(Some(dir.path().to_path_buf()));
    let meta = Meta::from_json_str(
        r#"{"parameters": [{"name": "Time", "type": "isotime"}],
            "x_server": "http://example.org/hapi", "x_dataset": "ds",
            "x_time.min": "2000-01-01Z", "x_time.max": "2000-01-02Z"}"#,
    )
    .unwrap();
    let path = cache.path_for(&meta, "Time", &crate::options::RcParams::default(), "png").unwrap();

    assert!(path.starts_with(dir.path().join("example.org_hapi")));
    assert!(path.to_string_lossy().ends_with(".png"));
    assert_eq!(cache.get(&path).unwrap(), None);

    cache.insert(&path, b"image").unwrap();
    assert_eq!(cache.get(&path).unwrap(), Some(b"image".to_vec()));
}
