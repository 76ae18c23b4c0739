use std::path::{Path, PathBuf};

/// Resolved file locations for session-weave.
/// Pure data structure with no I/O.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Directory holding per-session stream logs
    /// Example: <project_root>/.session-weave/streams/
    pub stream_dir: PathBuf,
}

impl Paths {
    /// Resolves paths relative to the given project root, honouring an
    /// explicit stream directory override.
    ///
    /// Pure function: only performs path concatenation.
    /// Does NOT create directories or verify existence.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use session_weave::paths::Paths;
    ///
    /// let paths = Paths::resolve(Path::new("/home/user/project"), None);
    /// assert_eq!(
    ///     paths.stream_dir,
    ///     Path::new("/home/user/project/.session-weave/streams")
    /// );
    /// ```
    pub fn resolve(project_root: &Path, stream_dir: Option<&Path>) -> Self {
        let stream_dir = match stream_dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => project_root.join(dir),
            None => project_root.join(".session-weave").join("streams"),
        };
        Self { stream_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stream_dir() {
        let paths = Paths::resolve(Path::new("/project"), None);
        assert_eq!(paths.stream_dir, PathBuf::from("/project/.session-weave/streams"));
    }

    #[test]
    fn test_absolute_override_wins() {
        let paths = Paths::resolve(Path::new("/project"), Some(Path::new("/var/streams")));
        assert_eq!(paths.stream_dir, PathBuf::from("/var/streams"));
    }

    #[test]
    fn test_relative_override_is_joined() {
        let paths = Paths::resolve(Path::new("/project"), Some(Path::new("logs")));
        assert_eq!(paths.stream_dir, PathBuf::from("/project/logs"));
    }
}
