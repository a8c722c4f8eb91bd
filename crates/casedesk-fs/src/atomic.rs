//! Atomic JSON file replacement.
//!
//! The document goes to a temp file in the destination directory (so the final rename never
//! crosses devices), is synced, then persisted over the destination. Readers see either the old
//! or the new file, never a truncated one.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

/// Serialize `value` as pretty-printed JSON (trailing newline included) and replace `dest` with it.
///
/// Parent directories are created as needed. On failure `dest` is untouched and the temp file is
/// removed.
pub fn atomic_write_json<T: Serialize + ?Sized>(dest: impl AsRef<Path>, value: &T) -> io::Result<()> {
    let dest = dest.as_ref();
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|err| err.error)?;

    // Best effort: directories cannot be opened as files on Windows.
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn json_is_written_with_trailing_newline() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("nested").join("value.json");
        atomic_write_json(&dest, &serde_json::json!({ "case_id": "113001" })).expect("write");
        let text = std::fs::read_to_string(&dest).expect("read");
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"case_id\": \"113001\""));
    }

    #[test]
    fn failed_serialization_leaves_destination_and_no_temp_files() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("records.json");
        std::fs::write(&dest, b"previous").expect("seed");

        // JSON object keys must be strings.
        let value: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        assert!(atomic_write_json(&dest, &value).is_err());
        assert_eq!(std::fs::read(&dest).expect("read"), b"previous");

        let entries = std::fs::read_dir(tmp.path()).expect("read dir").count();
        assert_eq!(entries, 1, "temp file should be cleaned up");
    }

    #[test]
    fn directory_in_the_way_is_an_error() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("records.json");
        std::fs::create_dir(&dest).expect("mkdir");
        assert!(atomic_write_json(&dest, &[1, 2, 3]).is_err());
        assert!(dest.is_dir());
    }
}
