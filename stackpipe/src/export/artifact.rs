//! `<event kind>_callchains.json` dictionary artifact

use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::dictionary::SymbolDictionary;
use crate::domain::{EventKind, PipelineError};

/// Write the dictionary's reverse mapping to `<dir>/<kind>_callchains.json`.
///
/// # Errors
/// Returns an error if the file cannot be created or written
pub fn write_dictionary(
    dir: &Path,
    kind: &EventKind,
    dictionary: &SymbolDictionary,
) -> Result<PathBuf, PipelineError> {
    let path = dir.join(kind.artifact_name());
    let artifact_error =
        |source| PipelineError::ArtifactWrite { path: path.display().to_string(), source };

    let file = File::create(&path).map_err(artifact_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &dictionary.reverse_mapping())?;
    writer.write_all(b"\n").and_then(|()| writer.flush()).map_err(artifact_error)?;

    info!("Wrote {} symbols to {}", dictionary.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_dictionary() {
        let dir = TempDir::new().unwrap();
        let mut dictionary = SymbolDictionary::new();
        dictionary.code_for("main", "/bin/app");

        let path =
            write_dictionary(dir.path(), &EventKind::from_event_type("task-clock"), &dictionary)
                .unwrap();

        assert_eq!(path, dir.path().join("walltime_callchains.json"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\" \":[\"main\",\"/bin/app\"]}\n");
    }

    #[test]
    fn test_write_dictionary_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let result =
            write_dictionary(&missing, &EventKind::from_event_type("cycles"), &SymbolDictionary::new());
        assert!(matches!(result, Err(PipelineError::ArtifactWrite { .. })));
    }
}
