use super::domain::ApplicationListing;

pub const EXPORT_HEADERS: [&str; 4] = ["Job", "Name", "Email", "Phone"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write export row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to finish export: {0}")]
    Io(#[from] std::io::Error),
}

/// Render joined application rows as a CSV sheet. The header row is written
/// even when there are no rows.
pub fn applications_csv(rows: &[ApplicationListing]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;

    for row in rows {
        writer.write_record([
            row.job_title.as_str(),
            row.applicant_name.as_str(),
            row.email.as_str(),
            row.phone.as_str(),
        ])?;
    }

    writer.into_inner().map_err(|err| {
        let source = err.error();
        ExportError::Io(std::io::Error::new(source.kind(), source.to_string()))
    })
}
