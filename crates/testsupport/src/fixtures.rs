use std::path::Path;

use tempfile::TempDir;

/// Scratch ASGI project tree for build tests: a `main.py` exposing an `app`
/// callable and a `requirements.txt`, in a temp directory that cleans up on
/// drop.
pub struct ScratchApp {
    dir: TempDir,
}

const MINIMAL_MAIN_PY: &str = r#"async def app(scope, receive, send):
    assert scope["type"] == "http"
    await send(
        {
            "type": "http.response.start",
            "status": 200,
            "headers": [[b"content-type", b"application/json"]],
        }
    )
    await send({"type": "http.response.body", "body": b'{"status": "running"}'})
"#;

impl ScratchApp {
    /// Raw-ASGI app whose only dependency is the server itself.
    pub fn minimal() -> Self {
        Self::with_manifest("uvicorn\n")
    }

    pub fn with_manifest(manifest: &str) -> Self {
        let dir = tempfile::tempdir().expect("create scratch dir");
        std::fs::write(dir.path().join("main.py"), MINIMAL_MAIN_PY).expect("write main.py");
        std::fs::write(dir.path().join("requirements.txt"), manifest)
            .expect("write requirements.txt");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let dest = self.dir.path().join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(dest, contents).expect("write fixture file");
    }
}
