use crate::domain::model::{display_string, CompanyRecord, FlatRow, FIXED_FIELDS};

/// Header order for a result table: fixed fields, then extra fields.
///
/// A column appears once even if requested twice or if an extra field names a fixed one.
pub fn column_headers(extra_fields: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = FIXED_FIELDS.iter().map(|f| f.to_string()).collect();
    for field in extra_fields {
        if !columns.contains(field) {
            columns.push(field.clone());
        }
    }
    columns
}

pub fn flatten(records: &[CompanyRecord], extra_fields: &[String]) -> Vec<FlatRow> {
    let columns = column_headers(extra_fields);
    records
        .iter()
        .map(|record| flatten_record(record, &columns))
        .collect()
}

fn flatten_record(record: &CompanyRecord, columns: &[String]) -> FlatRow {
    let cells = columns
        .iter()
        .map(|column| {
            let value = record.fixed_field(column).unwrap_or_else(|| {
                record
                    .extra
                    .get(column)
                    .map(display_string)
                    .unwrap_or_default()
            });
            (column.clone(), value)
        })
        .collect();
    FlatRow::new(cells)
}
