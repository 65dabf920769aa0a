// CSV export of a record set

use std::io::Write;
use std::path::Path;

use permis_core::{CanonicalField, PermitRecord};

use crate::error::ExportError;

pub const EXPORT_DELIMITER: u8 = b';';

/// Write records as `;`-delimited CSV: canonical field names as header, one
/// line per record, values as displayed (`None` as an empty field).
pub fn write_csv<'a, I, W>(records: I, out: W) -> Result<(), ExportError>
where
    I: IntoIterator<Item = &'a PermitRecord>,
    W: Write,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(EXPORT_DELIMITER)
        .from_writer(out);

    writer.write_record(CanonicalField::ALL.iter().map(|f| f.name()))?;
    for record in records {
        writer.write_record(CanonicalField::ALL.iter().map(|f| record.display(*f)))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_csv<'a, I>(records: I, path: &Path) -> Result<(), ExportError>
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    let file = std::fs::File::create(path)?;
    write_csv(records, std::io::BufWriter::new(file))
}

pub fn to_csv_string<'a, I>(records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
