//! Full-screen capture through an external screenshot tool.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use clap::ValueEnum;
use tempfile::TempDir;
use thiserror::Error;

/// Screenshot programs that can write a full-screen PNG to a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptureTool {
    /// scrot (X11)
    Scrot,
    /// gnome-screenshot (GNOME, X11 or Wayland)
    GnomeScreenshot,
    /// grim (wlroots Wayland compositors)
    Grim,
}

impl CaptureTool {
    pub fn program(self) -> &'static str {
        match self {
            CaptureTool::Scrot => "scrot",
            CaptureTool::GnomeScreenshot => "gnome-screenshot",
            CaptureTool::Grim => "grim",
        }
    }

    fn command(self, path: &Path) -> Command {
        let mut cmd = Command::new(self.program());
        match self {
            CaptureTool::Scrot => {
                cmd.arg(path).args(["-q", "100"]);
            }
            CaptureTool::GnomeScreenshot => {
                cmd.arg("-f").arg(path);
            }
            CaptureTool::Grim => {
                cmd.args(["-t", "png"]).arg(path);
            }
        }
        cmd
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to create a temporary directory: {0}")]
    TempDir(#[source] io::Error),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed ({status})")]
    Failed {
        program: &'static str,
        status: ExitStatus,
    },

    #[error("{program} did not write '{}'", .path.display())]
    Missing {
        program: &'static str,
        path: PathBuf,
    },
}

/// A screenshot path inside a fresh private temp directory, removed on drop
/// unless kept.
#[derive(Debug)]
pub struct TempScreenshot {
    dir: Option<TempDir>,
    path: PathBuf,
    keep: bool,
}

impl TempScreenshot {
    pub fn new(keep: bool) -> Result<Self, CaptureError> {
        let dir = tempfile::Builder::new()
            .prefix("grabpixel-")
            .tempdir()
            .map_err(CaptureError::TempDir)?;
        let path = dir.path().join("screenshot.png");
        Ok(Self {
            dir: Some(dir),
            path,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempScreenshot {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.keep {
            let _ = dir.keep();
            tracing::info!("kept screenshot at {}", self.path.display());
            return;
        }
        let dir_path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => tracing::debug!("deleted {}", dir_path.display()),
            Err(e) => tracing::warn!("failed to delete {}: {}", dir_path.display(), e),
        }
    }
}

/// Runs `tool` to save the whole screen into `shot`.
pub fn capture(tool: CaptureTool, shot: &TempScreenshot) -> Result<(), CaptureError> {
    let program = tool.program();
    tracing::debug!(program, path = %shot.path().display(), "capturing screen");

    let status = tool
        .command(shot.path())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .map_err(|source| CaptureError::Spawn { program, source })?;

    if !status.success() {
        return Err(CaptureError::Failed { program, status });
    }
    if !shot.path().is_file() {
        return Err(CaptureError::Missing {
            program,
            path: shot.path().to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn args(tool: CaptureTool, path: &str) -> Vec<String> {
        tool.command(Path::new(path))
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn scrot_writes_full_quality_png() {
        assert_eq!(args(CaptureTool::Scrot, "/tmp/a.png"), ["/tmp/a.png", "-q", "100"]);
        assert_eq!(CaptureTool::Scrot.program(), "scrot");
    }

    #[test]
    fn other_tools_take_the_path() {
        assert_eq!(args(CaptureTool::GnomeScreenshot, "/tmp/a.png"), ["-f", "/tmp/a.png"]);
        assert_eq!(args(CaptureTool::Grim, "/tmp/a.png"), ["-t", "png", "/tmp/a.png"]);
    }

    #[test]
    fn temp_screenshot_is_removed_on_drop() {
        let shot = TempScreenshot::new(false).unwrap();
        let path = shot.path().to_path_buf();
        let dir = path.parent().unwrap().to_path_buf();
        assert!(!path.exists(), "a fresh shot must not exist before capture");

        fs::write(&path, b"png").unwrap();
        drop(shot);
        assert!(!path.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn kept_screenshot_survives_drop() {
        let shot = TempScreenshot::new(true).unwrap();
        let path = shot.path().to_path_buf();
        fs::write(&path, b"png").unwrap();
        drop(shot);
        assert!(path.exists());
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn screenshots_never_share_a_path() {
        let a = TempScreenshot::new(false).unwrap();
        let b = TempScreenshot::new(false).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
