//! # Shared IO Utilities

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::errors::CcResult;

/// Serialize a value as JSON via write-to-temp-then-rename.
///
/// The temp file lives in the target directory, so the final rename is
/// atomic on the same filesystem and a partially written file is never
/// left as the only copy.
///
/// ## Arguments
/// * `path` - the destination path.
/// * `value` - the value to serialize.
pub fn atomic_write_json<P, T>(
    path: P,
    value: &T,
) -> CcResult<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let path = path.as_ref();

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    {
        let file = File::create(tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }

    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_atomic_write_json() {
        let dir = TempDir::new("chaincast-utility").unwrap();
        let path = dir.path().join("value.json");

        atomic_write_json(&path, &vec![1u32, 2, 3]).unwrap();

        let data = fs::read_to_string(&path).unwrap();
        let value: Vec<u32> = serde_json::from_str(&data).unwrap();
        assert_eq!(value, vec![1, 2, 3]);

        // No temp file is left behind.
        assert!(!dir.path().join("value.json.tmp").exists());

        // Overwrite replaces the previous copy.
        atomic_write_json(&path, &vec![9u32]).unwrap();
        let data = fs::read_to_string(&path).unwrap();
        let value: Vec<u32> = serde_json::from_str(&data).unwrap();
        assert_eq!(value, vec![9]);
    }
}
