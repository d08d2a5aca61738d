use crate::config::Config;
use crate::context::ProjectContext;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A throwaway project: a temp directory with a build manifest at the root,
/// an initialized `.sweepguard/` layout and a default config.
pub(crate) struct TestProject {
    _temp: TempDir,
    pub root: PathBuf,
    pub ctx: ProjectContext,
    pub config: Config,
}

impl TestProject {
    pub(crate) fn new() -> Self {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("pyproject.toml"), "[project]\nname = \"demo\"\n")
            .unwrap();

        let ctx = ProjectContext::for_root(temp.path()).unwrap();
        ctx.ensure_state_dirs().unwrap();

        Self {
            root: ctx.project_root.clone(),
            _temp: temp,
            ctx,
            config: Config::default(),
        }
    }

    /// Absolute path of `rel` inside the project.
    pub(crate) fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write `content` to `rel`, creating parent directories. Returns the absolute path.
    pub(crate) fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub(crate) fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).unwrap()
    }
}
