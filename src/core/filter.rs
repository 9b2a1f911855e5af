use std::collections::BTreeSet;
use std::path::Path;

/// Decides which files are in scope by their extension.
///
/// Matching is case-insensitive. An empty set rejects every path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    supported: BTreeSet<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let supported = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { supported }
    }

    /// The extension is whatever follows the last `.` of the file name, so
    /// `.mp3` counts as an mp3 file and `song.` has an empty extension.
    pub fn is_supported<P: AsRef<Path>>(&self, path: P) -> bool {
        let ext = path
            .as_ref()
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext);

        match ext {
            Some(ext) => self.supported.contains(&ext.to_lowercase()),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.supported.is_empty()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.supported.iter().map(String::as_str)
    }
}

/// Wraps `handler` so it only runs for supported paths.
///
/// The returned handler reports whether `handler` was invoked.
pub fn include_only<'a, F>(filter: &'a ExtensionFilter, handler: F) -> impl Fn(&Path) -> bool + 'a
where
    F: Fn(&Path) + 'a,
{
    move |path: &Path| {
        if !filter.is_supported(path) {
            tracing::trace!("Skipping unsupported file: {}", path.display());
            return false;
        }
        handler(path);
        true
    }
}
