//! Sandboxed filesystem operations rooted at a fixed working directory.
//!
//! Everything the agent can touch goes through [`Workspace`]: a path guard
//! resolves model-supplied paths against the root and rejects anything
//! that would land outside it, and the four operations (list, read,
//! write, run) build on that guard.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Default cap on characters returned by [`Workspace::read_file`].
pub const DEFAULT_MAX_READ_CHARS: usize = 10_000;

/// Default wall-clock limit for [`Workspace::run_python_file`].
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interpreter used to run Python scripts.
pub const DEFAULT_PYTHON_BIN: &str = "python3";

/// Errors a workspace operation reports back to the model.
///
/// These are recoverable by contract: the dispatcher formats them into an
/// error result string for the conversation instead of propagating them.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Access denied: \"{path}\" is outside the working directory")]
    PathEscape { path: String },

    #[error("\"{path}\" not found")]
    NotFound { path: String },

    #[error("\"{path}\" is not a directory")]
    NotADirectory { path: String },

    #[error("\"{path}\" is not a regular file")]
    NotAFile { path: String },

    #[error("\"{path}\" is not a Python file (must end with .py)")]
    NotPython { path: String },

    #[error("cannot read \"{path}\" as text (binary or unsupported encoding)")]
    NotText { path: String },

    #[error("execution of \"{path}\" timed out after {secs} seconds")]
    Timeout { path: String, secs: u64 },

    #[error("Python interpreter \"{bin}\" not found. Please install it and ensure it's in your PATH")]
    InterpreterMissing { bin: String },

    #[error("failed to {op} \"{path}\": {source}")]
    Io {
        op: &'static str,
        path: String,
        source: std::io::Error,
    },
}

/// Captured output of a finished script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl ScriptOutput {
    /// True when the script did not exit cleanly with status zero.
    pub fn is_failure(&self) -> bool {
        self.exit_code != Some(0)
    }
}

impl fmt::Display for ScriptOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sections = Vec::new();
        if !self.stdout.is_empty() {
            sections.push(format!("STDOUT:\n{}", self.stdout));
        }
        if !self.stderr.is_empty() {
            sections.push(format!("STDERR:\n{}", self.stderr));
        }
        match self.exit_code {
            Some(0) => {}
            Some(code) => sections.push(format!("Process exited with code {}", code)),
            None => sections.push("Process terminated by signal".to_string()),
        }
        if sections.is_empty() {
            f.write_str("No output produced.")
        } else {
            f.write_str(&sections.join("\n\n"))
        }
    }
}

/// A fixed working-directory root plus the limits applied to operations
/// inside it.
///
/// The root is canonicalized once at construction and never changes for
/// the lifetime of a run. Every model-supplied path is resolved against
/// it before any filesystem access.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    max_read_chars: usize,
    script_timeout: Duration,
    python_bin: String,
}

impl Workspace {
    /// Creates a workspace rooted at `root`, which must be an existing
    /// directory.
    pub fn new(root: impl AsRef<Path>) -> crate::Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| {
            crate::OrdneError::Config(format!(
                "working directory \"{}\": {}",
                root.display(),
                e
            ))
        })?;
        if !root.is_dir() {
            return Err(crate::OrdneError::Config(format!(
                "working directory \"{}\" is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            max_read_chars: DEFAULT_MAX_READ_CHARS,
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
            python_bin: DEFAULT_PYTHON_BIN.to_string(),
        })
    }

    /// Sets the character cap for file reads.
    pub fn with_max_read_chars(mut self, chars: usize) -> Self {
        self.max_read_chars = chars;
        self
    }

    /// Sets the wall-clock limit for script runs.
    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    /// Sets the interpreter binary used for Python scripts.
    pub fn with_python_bin(mut self, bin: impl Into<String>) -> Self {
        self.python_bin = bin.into();
        self
    }

    /// Absolute root every operation is confined to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a model-supplied path against the root.
    ///
    /// Normalization is purely lexical so the guard also covers paths
    /// that do not exist yet, such as write targets.
    fn resolve(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let normalized = normalize(&self.root.join(path));
        if normalized.starts_with(&self.root) {
            Ok(normalized)
        } else {
            Err(WorkspaceError::PathEscape {
                path: path.to_string(),
            })
        }
    }

    /// Lists the immediate entries of a directory under the root.
    ///
    /// One entry per line, sorted by name so listings are deterministic.
    /// Directories report a size of 0.
    pub fn list_directory(&self, directory: Option<&str>) -> Result<String, WorkspaceError> {
        let relative = directory.unwrap_or(".");
        let target = self.resolve(relative)?;
        if !target.exists() {
            return Err(WorkspaceError::NotFound {
                path: relative.to_string(),
            });
        }
        if !target.is_dir() {
            return Err(WorkspaceError::NotADirectory {
                path: relative.to_string(),
            });
        }

        let io_err = |e| WorkspaceError::Io {
            op: "list",
            path: relative.to_string(),
            source: e,
        };

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&target).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let metadata = entry.metadata().map_err(io_err)?;
            let size = if metadata.is_dir() { 0 } else { metadata.len() };
            entries.push((
                entry.file_name().to_string_lossy().into_owned(),
                size,
                metadata.is_dir(),
            ));
        }
        entries.sort();

        let lines: Vec<String> = entries
            .iter()
            .map(|(name, size, is_dir)| format!("{}: file_size={}, is_dir={}", name, size, is_dir))
            .collect();
        Ok(lines.join("\n"))
    }

    /// Reads a file under the root as UTF-8 text.
    ///
    /// Content longer than the configured cap is cut at exactly that many
    /// characters and a truncation marker naming the file is appended.
    pub fn read_file(&self, file_path: &str) -> Result<String, WorkspaceError> {
        let target = self.resolve(file_path)?;
        if !target.exists() {
            return Err(WorkspaceError::NotFound {
                path: file_path.to_string(),
            });
        }
        if !target.is_file() {
            return Err(WorkspaceError::NotAFile {
                path: file_path.to_string(),
            });
        }

        let bytes = std::fs::read(&target).map_err(|e| WorkspaceError::Io {
            op: "read",
            path: file_path.to_string(),
            source: e,
        })?;
        let content = String::from_utf8(bytes).map_err(|_| WorkspaceError::NotText {
            path: file_path.to_string(),
        })?;

        match content.char_indices().nth(self.max_read_chars) {
            Some((cut, _)) => {
                let mut truncated = content[..cut].to_string();
                truncated.push_str(&format!(
                    "\n[...File \"{}\" truncated at {} characters]",
                    file_path, self.max_read_chars
                ));
                Ok(truncated)
            }
            None => Ok(content),
        }
    }

    /// Writes content to a file under the root, creating parent
    /// directories as needed and overwriting any existing content.
    ///
    /// Returns a success message stating the character count written.
    pub fn write_file(&self, file_path: &str, content: &str) -> Result<String, WorkspaceError> {
        let target = self.resolve(file_path)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WorkspaceError::Io {
                op: "create parent directories for",
                path: file_path.to_string(),
                source: e,
            })?;
        }
        std::fs::write(&target, content).map_err(|e| WorkspaceError::Io {
            op: "write",
            path: file_path.to_string(),
            source: e,
        })?;

        Ok(format!(
            "Successfully wrote to \"{}\" ({} characters written)",
            file_path,
            content.chars().count()
        ))
    }

    /// Runs a Python script under the root with the configured
    /// interpreter, capturing stdout and stderr separately.
    ///
    /// The child runs with the root as its working directory and is
    /// killed if it outlives the configured timeout.
    pub async fn run_python_file(
        &self,
        file_path: &str,
        args: &[String],
    ) -> Result<ScriptOutput, WorkspaceError> {
        let target = self.resolve(file_path)?;
        if !target.exists() {
            return Err(WorkspaceError::NotFound {
                path: file_path.to_string(),
            });
        }
        if !target.is_file() {
            return Err(WorkspaceError::NotAFile {
                path: file_path.to_string(),
            });
        }
        if !file_path.to_lowercase().ends_with(".py") {
            return Err(WorkspaceError::NotPython {
                path: file_path.to_string(),
            });
        }

        debug!(
            "Running {} {} (timeout {}s)",
            self.python_bin,
            file_path,
            self.script_timeout.as_secs()
        );

        let mut command = Command::new(&self.python_bin);
        command
            .arg(&target)
            .args(args)
            .current_dir(&self.root)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.script_timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WorkspaceError::InterpreterMissing {
                    bin: self.python_bin.clone(),
                })
            }
            Ok(Err(e)) => {
                return Err(WorkspaceError::Io {
                    op: "run",
                    path: file_path.to_string(),
                    source: e,
                })
            }
            Err(_) => {
                return Err(WorkspaceError::Timeout {
                    path: file_path.to_string(),
                    secs: self.script_timeout.as_secs(),
                })
            }
        };

        Ok(ScriptOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

/// Lexically resolves `.` and `..` components without touching the
/// filesystem. `..` above the filesystem root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        (dir, ws)
    }

    fn python_available() -> bool {
        std::process::Command::new(DEFAULT_PYTHON_BIN)
            .arg("--version")
            .output()
            .is_ok()
    }

    #[test]
    fn test_normalize_resolves_dot_segments_lexically() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/a/../../..")), PathBuf::from("/"));
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Workspace::new(dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_guard_rejects_parent_escape() {
        let (_dir, ws) = workspace();
        assert!(matches!(
            ws.read_file("../outside.txt").unwrap_err(),
            WorkspaceError::PathEscape { .. }
        ));
    }

    #[test]
    fn test_guard_rejects_absolute_paths_outside_the_root() {
        let (_dir, ws) = workspace();
        assert!(matches!(
            ws.read_file("/etc/passwd").unwrap_err(),
            WorkspaceError::PathEscape { .. }
        ));
    }

    #[test]
    fn test_guard_rejects_escapes_for_every_operation() {
        let (_dir, ws) = workspace();
        let path = "a/../../../etc/passwd";
        assert!(matches!(
            ws.list_directory(Some(path)).unwrap_err(),
            WorkspaceError::PathEscape { .. }
        ));
        assert!(matches!(
            ws.read_file(path).unwrap_err(),
            WorkspaceError::PathEscape { .. }
        ));
        assert!(matches!(
            ws.write_file(path, "x").unwrap_err(),
            WorkspaceError::PathEscape { .. }
        ));
    }

    #[test]
    fn test_guard_allows_dotted_paths_that_stay_inside() {
        let (_dir, ws) = workspace();
        ws.write_file("sub/./deep/../file.txt", "ok").unwrap();
        assert_eq!(ws.read_file("sub/file.txt").unwrap(), "ok");
    }

    #[test]
    fn test_listing_shows_sizes_and_directories_sorted() {
        let (_dir, ws) = workspace();
        ws.write_file("b.txt", "12345").unwrap();
        ws.write_file("a/inner.txt", "x").unwrap();
        let listing = ws.list_directory(None).unwrap();
        assert_eq!(
            listing,
            "a: file_size=0, is_dir=true\nb.txt: file_size=5, is_dir=false"
        );
    }

    #[test]
    fn test_listing_rejects_files_and_missing_directories() {
        let (_dir, ws) = workspace();
        ws.write_file("plain.txt", "x").unwrap();
        assert!(matches!(
            ws.list_directory(Some("plain.txt")).unwrap_err(),
            WorkspaceError::NotADirectory { .. }
        ));
        assert!(matches!(
            ws.list_directory(Some("ghost")).unwrap_err(),
            WorkspaceError::NotFound { .. }
        ));
    }

    #[test]
    fn test_read_returns_short_content_unmodified() {
        let (_dir, ws) = workspace();
        let text = "små tegn og litt til\n";
        ws.write_file("short.txt", text).unwrap();
        assert_eq!(ws.read_file("short.txt").unwrap(), text);
    }

    #[test]
    fn test_read_truncates_at_exactly_the_cap() {
        let (_dir, ws) = workspace();
        let ws = ws.with_max_read_chars(100);
        let long = "x".repeat(150);
        ws.write_file("long.txt", &long).unwrap();

        let content = ws.read_file("long.txt").unwrap();
        let marker = "\n[...File \"long.txt\" truncated at 100 characters]";
        assert!(content.ends_with(marker));
        let body = content.strip_suffix(marker).unwrap();
        assert_eq!(body.chars().count(), 100);
        assert_eq!(body, &long[..100]);
    }

    #[test]
    fn test_read_leaves_content_at_the_cap_alone() {
        let (_dir, ws) = workspace();
        let ws = ws.with_max_read_chars(100);
        let exact = "y".repeat(100);
        ws.write_file("exact.txt", &exact).unwrap();
        assert_eq!(ws.read_file("exact.txt").unwrap(), exact);
    }

    #[test]
    fn test_read_counts_characters_not_bytes() {
        let (_dir, ws) = workspace();
        let ws = ws.with_max_read_chars(3);
        ws.write_file("uni.txt", "æøåß").unwrap();
        let content = ws.read_file("uni.txt").unwrap();
        assert!(content.starts_with("æøå"));
        assert!(content.contains("truncated at 3 characters"));
    }

    #[test]
    fn test_read_rejects_binary_content() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(matches!(
            ws.read_file("blob.bin").unwrap_err(),
            WorkspaceError::NotText { .. }
        ));
    }

    #[test]
    fn test_read_reports_missing_and_non_regular_targets() {
        let (_dir, ws) = workspace();
        assert!(matches!(
            ws.read_file("nope.txt").unwrap_err(),
            WorkspaceError::NotFound { .. }
        ));
        ws.write_file("sub/inner.txt", "x").unwrap();
        assert!(matches!(
            ws.read_file("sub").unwrap_err(),
            WorkspaceError::NotAFile { .. }
        ));
    }

    #[test]
    fn test_write_creates_parents_and_reports_character_count() {
        let (dir, ws) = workspace();
        let msg = ws.write_file("pkg/nested/mod.txt", "abcdef").unwrap();
        assert_eq!(
            msg,
            "Successfully wrote to \"pkg/nested/mod.txt\" (6 characters written)"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("pkg/nested/mod.txt")).unwrap(),
            "abcdef"
        );
    }

    #[test]
    fn test_write_overwrites_existing_content() {
        let (_dir, ws) = workspace();
        ws.write_file("note.txt", "first version").unwrap();
        ws.write_file("note.txt", "second").unwrap();
        assert_eq!(ws.read_file("note.txt").unwrap(), "second");
    }

    #[tokio::test]
    async fn test_run_rejects_escape_and_wrong_extension() {
        let (_dir, ws) = workspace();
        assert!(matches!(
            ws.run_python_file("../evil.py", &[]).await.unwrap_err(),
            WorkspaceError::PathEscape { .. }
        ));
        ws.write_file("notes.txt", "hello").unwrap();
        assert!(matches!(
            ws.run_python_file("notes.txt", &[]).await.unwrap_err(),
            WorkspaceError::NotPython { .. }
        ));
        assert!(matches!(
            ws.run_python_file("ghost.py", &[]).await.unwrap_err(),
            WorkspaceError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_run_captures_stdout_and_exit_code() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let (_dir, ws) = workspace();
        ws.write_file("hello.py", "import sys\nprint(\"hi\")\nsys.exit(3)\n")
            .unwrap();

        let out = ws.run_python_file("hello.py", &[]).await.unwrap();
        assert_eq!(out.stdout.trim(), "hi");
        assert_eq!(out.exit_code, Some(3));
        assert!(out.is_failure());

        let rendered = out.to_string();
        assert!(rendered.contains("STDOUT:\nhi"));
        assert!(rendered.contains("Process exited with code 3"));
    }

    #[tokio::test]
    async fn test_run_passes_arguments_through() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let (_dir, ws) = workspace();
        ws.write_file("echo.py", "import sys\nprint(\" \".join(sys.argv[1:]))\n")
            .unwrap();

        let out = ws
            .run_python_file("echo.py", &["alpha".into(), "beta".into()])
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "alpha beta");
        assert_eq!(out.exit_code, Some(0));
        assert!(!out.is_failure());
    }

    #[tokio::test]
    async fn test_run_times_out_without_hanging() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let (_dir, ws) = workspace();
        let ws = ws.with_script_timeout(Duration::from_millis(200));
        ws.write_file("sleepy.py", "import time\ntime.sleep(5)\n")
            .unwrap();

        let started = std::time::Instant::now();
        let err = ws.run_python_file("sleepy.py", &[]).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_script_output_renders_no_output_placeholder() {
        let out = ScriptOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
        };
        assert_eq!(out.to_string(), "No output produced.");
    }

    #[test]
    fn test_script_output_renders_sections_in_order() {
        let out = ScriptOutput {
            stdout: "data\n".to_string(),
            stderr: "warn\n".to_string(),
            exit_code: Some(2),
        };
        assert_eq!(
            out.to_string(),
            "STDOUT:\ndata\n\n\nSTDERR:\nwarn\n\n\nProcess exited with code 2"
        );
    }
}
