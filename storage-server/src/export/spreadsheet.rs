//! CSV export and import
//!
//! Export writes one row per record with Russian column headers and a
//! UTF-8 BOM so spreadsheet applications detect the encoding. Import
//! accepts the same layout (or raw field names as headers); each row is
//! turned into [`RecordFields`] and created through the normal intake path.

use shared::models::{RecordFields, RecordView};
use shared::util::format_millis;
use thiserror::Error;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Export columns: header, source
const COLUMNS: &[(&str, Column)] = &[
    ("Номер", Column::Number),
    ("ФИО", Column::Field("full_name")),
    ("Телефон", Column::Field("phone")),
    ("Доп телефон", Column::Field("phone_additional")),
    ("Марка машины", Column::Field("car_brand")),
    ("Параметры", Column::Field("parameters")),
    ("Размер", Column::Field("size")),
    ("Место хранения", Column::Field("storage_location")),
    ("Статус", Column::Status),
    ("Дата создания", Column::CreatedAt),
    ("Создал", Column::CreatedBy),
    ("Дата выдачи", Column::ReleasedAt),
    ("Выдал", Column::ReleasedBy),
];

#[derive(Debug, Clone, Copy)]
enum Column {
    Number,
    Field(&'static str),
    Status,
    CreatedAt,
    CreatedBy,
    ReleasedAt,
    ReleasedBy,
}

impl Column {
    fn value(&self, view: &RecordView) -> String {
        let record = &view.record;
        match self {
            Column::Number => record.sequence_number.to_string(),
            Column::Field(name) => record.fields.get_or_empty(name).to_string(),
            Column::Status => view.status_label.clone(),
            Column::CreatedAt => format_millis(record.created_at),
            Column::CreatedBy => record.created_by.clone(),
            Column::ReleasedAt => record.released_at.map(format_millis).unwrap_or_default(),
            Column::ReleasedBy => record.released_by.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to finish CSV output: {0}")]
    Flush(String),

    #[error("Import file has no recognizable columns")]
    NoKnownColumns,
}

/// Write records as CSV (BOM + header + one row per record)
pub fn export_csv(views: &[RecordView]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut writer = csv::Writer::from_writer(BOM.to_vec());
    writer.write_record(COLUMNS.iter().map(|(header, _)| *header))?;
    for view in views {
        writer.write_record(COLUMNS.iter().map(|(_, column)| column.value(view)))?;
    }
    writer
        .into_inner()
        .map_err(|e| SpreadsheetError::Flush(e.to_string()))
}

/// Map an import header to a record field name
///
/// Accepts the export headers and raw field names. Number, status and
/// audit columns are not importable.
fn field_for_header(header: &str) -> Option<String> {
    let header = header.trim().trim_start_matches('\u{feff}');
    for (label, column) in COLUMNS {
        if let Column::Field(name) = column
            && (header == *label || header == *name)
        {
            return Some(name.to_string());
        }
    }
    None
}

/// One parsed import row
#[derive(Debug, Clone)]
pub struct ImportRow {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub fields: RecordFields,
}

/// Parse CSV bytes into rows; unreadable rows are returned as errors
pub fn parse_import(
    bytes: &[u8],
) -> Result<Vec<Result<ImportRow, (usize, String)>>, SpreadsheetError> {
    let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mapping: Vec<Option<String>> = headers.iter().map(field_for_header).collect();
    if mapping.iter().all(Option::is_none) {
        return Err(SpreadsheetError::NoKnownColumns);
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                rows.push(Err((row, e.to_string())));
                continue;
            }
        };

        let fields: RecordFields = mapping
            .iter()
            .zip(record.iter())
            .filter_map(|(field, value)| {
                let field = field.as_ref()?;
                (!value.is_empty()).then(|| (field.clone(), value.to_string()))
            })
            .collect();
        if fields.is_empty() {
            continue;
        }
        rows.push(Ok(ImportRow { row, fields }));
    }
    Ok(rows)
}
