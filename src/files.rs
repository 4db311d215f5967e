//! G-code file discovery, reading and writing

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use printlooper_core::{OutputDocument, SourceDocument};

/// A `.gcode` file found in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcodeFile {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl GcodeFile {
    /// Size in kilobytes, for menus
    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

/// True for `.gcode` in any letter case
pub fn is_gcode(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gcode"))
}

/// G-code files directly inside `dir`, sorted by name
pub fn find_gcode_files(dir: &Path) -> Result<Vec<GcodeFile>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !is_gcode(&path) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        files.push(GcodeFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size_bytes: metadata.len(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!("Found {} G-code file(s) in {}", files.len(), dir.display());
    Ok(files)
}

/// Read a G-code file into a [`SourceDocument`] named after the file
pub fn read_document(path: &Path) -> Result<SourceDocument> {
    if !path.is_file() {
        return Err(anyhow!("File does not exist: {}", path.display()));
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = SourceDocument::parse(display_name(path), &text);

    tracing::info!("Read {} lines from {}", document.len(), path.display());
    Ok(document)
}

/// Write the assembled output, replacing any existing file
pub fn write_output(path: &Path, output: &OutputDocument) -> Result<()> {
    fs::write(path, output.render())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} lines to {}", output.len(), path.display());
    Ok(())
}

/// `<stem>_looped_<N>x.gcode` or `<stem1>_<stem2>_alternating_<N>x.gcode`
pub fn output_file_name(primary: &Path, secondary: Option<&Path>, loop_count: u32) -> String {
    let first = stem(primary);
    match secondary {
        Some(second) => format!(
            "{}_{}_alternating_{}x.gcode",
            first,
            stem(second),
            loop_count
        ),
        None => format!("{}_looped_{}x.gcode", first, loop_count),
    }
}

/// Output location: `output_dir` if given, else the primary file's directory
pub fn output_path(
    output_dir: Option<&Path>,
    primary: &Path,
    secondary: Option<&Path>,
    loop_count: u32,
) -> PathBuf {
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| primary.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(output_file_name(primary, secondary, loop_count))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name(Path::new("dir/test_print.gcode"), None, 3),
            "test_print_looped_3x.gcode"
        );
        assert_eq!(
            output_file_name(
                Path::new("cube.GCODE"),
                Some(Path::new("/tmp/cylinder.gcode")),
                4
            ),
            "cube_cylinder_alternating_4x.gcode"
        );
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(None, Path::new("prints/a.gcode"), None, 2),
            PathBuf::from("prints/a_looped_2x.gcode")
        );
        assert_eq!(
            output_path(Some(Path::new("out")), Path::new("prints/a.gcode"), None, 2),
            PathBuf::from("out/a_looped_2x.gcode")
        );
        assert_eq!(
            output_path(None, Path::new("a.gcode"), None, 1),
            PathBuf::from("a_looped_1x.gcode")
        );
    }

    #[test]
    fn test_is_gcode() {
        assert!(is_gcode(Path::new("a.gcode")));
        assert!(is_gcode(Path::new("a.GCODE")));
        assert!(is_gcode(Path::new("a.GCode")));
        assert!(!is_gcode(Path::new("a.gco")));
        assert!(!is_gcode(Path::new("gcode")));
    }
}
