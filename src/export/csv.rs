use crate::error::ExportError;
use crate::model::ParsingResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes one row per element.
pub fn export_csv<P: AsRef<Path>>(result: &ParsingResult, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    write_csv(result, file)
}

pub(crate) fn write_csv<W: Write>(result: &ParsingResult, out: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(out);

    writer.write_record([
        "GUID",
        "Id",
        "Type",
        "Name",
        "Discipline",
        "X",
        "Y",
        "Z",
        "Container",
        "Properties",
    ])?;

    for element in &result.elements {
        let [x, y, z] = element.geometry.as_ref().map_or_else(
            || [String::new(), String::new(), String::new()],
            |g| {
                [
                    g.position.x.to_string(),
                    g.position.y.to_string(),
                    g.position.z.to_string(),
                ]
            },
        );

        let id = element.id.to_string();
        let discipline = element.discipline.to_string();
        let container = element.container.map(|c| c.to_string()).unwrap_or_default();
        let property_count = element.properties.len().to_string();

        writer.write_record([
            &element.guid,
            &id,
            &element.type_name,
            &element.name,
            &discipline,
            &x,
            &y,
            &z,
            &container,
            &property_count,
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
