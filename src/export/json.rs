use crate::error::ExportError;
use crate::model::ParsingResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the whole parsing result, errors included, as pretty JSON.
pub fn export_json<P: AsRef<Path>>(result: &ParsingResult, path: P) -> Result<(), ExportError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| ExportError::FileCreate {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush().map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
