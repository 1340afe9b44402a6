//! Decoders for `DBFUNCS` replies.
//!
//! Cell values are opaque text. Integer columns are parsed, with an empty cell (how the
//! server sends a SQL `NULL`) read as `0`.
use crate::{
    buffer::{DecodeError, FieldReader},
    protocol::Response,
};

use super::record_count;

/// A `SQLSTMNT` result grid. Row 0 holds the column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    columns: usize,
    cells: Vec<String>,
}

impl ResultSet {
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of data rows, not counting the column names.
    pub fn rows(&self) -> usize {
        if self.columns == 0 {
            0
        } else {
            self.cells.len() / self.columns - 1
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.cells[..self.columns]
    }

    pub fn column_name(&self, column: usize) -> Option<&str> {
        self.column_names().get(column).map(String::as_str)
    }

    /// Cells of data row `row`, zero based.
    pub fn row(&self, row: usize) -> Option<&[String]> {
        if row >= self.rows() {
            return None;
        }
        let start = (row + 1) * self.columns;
        Some(&self.cells[start..start + self.columns])
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.row(row)?.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub catalog: String,
    pub owner: String,
    pub table: String,
    pub column: String,
    pub key_sequence: i64,
}

/// One row of a foreign, imported or exported key listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub pk_catalog: String,
    pub pk_owner: String,
    pub pk_table: String,
    pub pk_column: String,
    pub fk_catalog: String,
    pub fk_owner: String,
    pub fk_table: String,
    pub fk_column: String,
    pub key_sequence: i64,
    pub update_rule: i64,
    pub delete_rule: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Catalog, when the driver reports one.
    pub catalog: String,
    pub schema: String,
    pub name: String,
    pub table_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub schema: String,
    pub owner: String,
    pub table: String,
    pub name: String,
    pub type_code: i64,
    pub type_name: String,
    pub precision: i64,
    pub length: i64,
    pub scale: i64,
    pub radix: i64,
    pub nullable: i64,
}

/// Column description returned by `SQLMETADATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub name: String,
    pub type_name: String,
    pub java_type: String,
}

/// Decodes a result set sent as one field per grid row, each holding its own
/// count-prefixed list of cells. This is the layout `SQLSTMNT` replies use.
pub fn decode_result_set(response: &Response) -> Result<ResultSet, DecodeError> {
    let records = record_count(response.count(), 1)?;
    if records == 0 {
        return Err(DecodeError::FieldCount {
            expected: "at least 1".into(),
            found: 0,
        });
    }

    let mut fields = response.fields();
    let mut columns = None;
    let mut cells = Vec::new();
    for _ in 0..records {
        let mut row = FieldReader::new(fields.bytes()?);
        let width = record_count(row.number()?, 1)?;

        match columns {
            None => columns = Some(width),
            Some(columns) if columns != width => {
                return Err(DecodeError::InvalidField {
                    field: "row",
                    reason: format!("{width} cells where the header has {columns}"),
                });
            }
            Some(_) => {}
        }

        for _ in 0..width {
            cells.push(row.string()?);
        }
        row.finish()?;
    }

    Ok(ResultSet {
        columns: columns.unwrap_or_default(),
        cells,
    })
}

/// Decodes a result set sent as one flat run of `columns × (rows + 1)` strings, column
/// names first.
///
/// The flat form does not carry its width, so the caller supplies it, typically from the
/// statement's `SQLMETADATA` reply.
pub fn decode_flat_result_set(
    response: &Response,
    columns: usize,
) -> Result<ResultSet, DecodeError> {
    if columns == 0 {
        return Err(DecodeError::InvalidField {
            field: "columns",
            reason: "a result set has at least one column".into(),
        });
    }
    let grid_rows = record_count(response.count(), columns)?;
    if grid_rows == 0 {
        return Err(DecodeError::FieldCount {
            expected: format!("at least {columns}"),
            found: 0,
        });
    }

    let mut fields = response.fields();
    let cells = (0..grid_rows * columns)
        .map(|_| fields.string())
        .collect::<Result<_, _>>()?;
    Ok(ResultSet { columns, cells })
}

pub fn decode_primary_keys(response: &Response) -> Result<Vec<PrimaryKey>, DecodeError> {
    decode_groups(response, 5, |fields| {
        Ok(PrimaryKey {
            catalog: fields.string()?,
            owner: fields.string()?,
            table: fields.string()?,
            column: fields.string()?,
            key_sequence: integer_cell(fields, "key sequence")?,
        })
    })
}

pub fn decode_foreign_keys(response: &Response) -> Result<Vec<ForeignKey>, DecodeError> {
    decode_groups(response, 11, |fields| {
        Ok(ForeignKey {
            pk_catalog: fields.string()?,
            pk_owner: fields.string()?,
            pk_table: fields.string()?,
            pk_column: fields.string()?,
            fk_catalog: fields.string()?,
            fk_owner: fields.string()?,
            fk_table: fields.string()?,
            fk_column: fields.string()?,
            key_sequence: integer_cell(fields, "key sequence")?,
            update_rule: integer_cell(fields, "update rule")?,
            delete_rule: integer_cell(fields, "delete rule")?,
        })
    })
}

pub fn decode_table_info(response: &Response) -> Result<Vec<TableInfo>, DecodeError> {
    decode_groups(response, 4, |fields| {
        Ok(TableInfo {
            catalog: fields.string()?,
            schema: fields.string()?,
            name: fields.string()?,
            table_type: fields.string()?,
        })
    })
}

pub fn decode_column_info(response: &Response) -> Result<Vec<ColumnInfo>, DecodeError> {
    decode_groups(response, 11, |fields| {
        Ok(ColumnInfo {
            schema: fields.string()?,
            owner: fields.string()?,
            table: fields.string()?,
            name: fields.string()?,
            type_code: integer_cell(fields, "type")?,
            type_name: fields.string()?,
            precision: integer_cell(fields, "precision")?,
            length: integer_cell(fields, "length")?,
            scale: integer_cell(fields, "scale")?,
            radix: integer_cell(fields, "radix")?,
            nullable: integer_cell(fields, "nullable")?,
        })
    })
}

pub fn decode_metadata(response: &Response) -> Result<Vec<ColumnMetadata>, DecodeError> {
    decode_groups(response, 3, |fields| {
        Ok(ColumnMetadata {
            name: fields.string()?,
            type_name: fields.string()?,
            java_type: fields.string()?,
        })
    })
}

fn decode_groups<T>(
    response: &Response,
    size: usize,
    mut decode: impl FnMut(&mut FieldReader<'_>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let groups = record_count(response.count(), size)?;
    let mut fields = response.fields();
    (0..groups).map(|_| decode(&mut fields)).collect()
}

fn integer_cell(fields: &mut FieldReader<'_>, field: &'static str) -> Result<i64, DecodeError> {
    if fields.clone().bytes()?.is_empty() {
        fields.bytes()?;
        return Ok(0);
    }
    fields.integer(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::testing::response;

    #[test]
    fn result_set_grid() {
        let reply = response(2, &[b"2:2:id4:name", b"2:1:15:Alice"]);
        let set = decode_result_set(&reply).unwrap();

        assert_eq!(set.columns(), 2);
        assert_eq!(set.rows(), 1);
        assert_eq!(set.column_names(), ["id", "name"]);
        assert_eq!(set.row(0).unwrap(), ["1", "Alice"]);
        assert_eq!(set.value(0, 1), Some("Alice"));
        assert_eq!(set.value(1, 0), None);
        assert_eq!(set.column_name(2), None);
    }

    #[test]
    fn result_set_without_rows() {
        let reply = response(1, &[b"1:5:count"]);
        let set = decode_result_set(&reply).unwrap();

        assert_eq!(set.columns(), 1);
        assert_eq!(set.rows(), 0);
        assert_eq!(set.row(0), None);
    }

    #[test]
    fn flat_result_set_grid() {
        let reply = response(4, &[b"id", b"name", b"1", b"Alice"]);
        let set = decode_flat_result_set(&reply, 2).unwrap();

        assert_eq!(set.columns(), 2);
        assert_eq!(set.rows(), 1);
        assert_eq!(set.column_names(), ["id", "name"]);
        assert_eq!(set.row(0).unwrap(), ["1", "Alice"]);
    }

    #[test]
    fn flat_result_set_width_must_divide_count() {
        let reply = response(4, &[b"id", b"name", b"1", b"Alice"]);

        assert!(matches!(
            decode_flat_result_set(&reply, 3),
            Err(DecodeError::FieldCount { found: 4, .. })
        ));
        assert!(decode_flat_result_set(&reply, 0).is_err());
        assert!(decode_flat_result_set(&response(0, &[]), 2).is_err());
        assert!(decode_flat_result_set(&response(4, &[b"id", b"name", b"1"]), 2).is_err());
    }

    #[test]
    fn nested_decoder_rejects_flat_layout() {
        let reply = response(4, &[b"id", b"name", b"1", b"Alice"]);
        assert!(decode_result_set(&reply).is_err());
    }

    #[test]
    fn result_set_ragged_rows() {
        let reply = response(2, &[b"2:2:id4:name", b"1:1:1"]);
        assert!(matches!(
            decode_result_set(&reply),
            Err(DecodeError::InvalidField { field: "row", .. })
        ));
    }

    #[test]
    fn result_set_needs_header() {
        let reply = response(0, &[]);
        assert!(decode_result_set(&reply).is_err());
    }

    #[test]
    fn primary_keys() {
        let reply = response(5, &[b"", b"dbo", b"users", b"id", b"1"]);
        let keys = decode_primary_keys(&reply).unwrap();

        assert_eq!(
            keys,
            vec![PrimaryKey {
                catalog: String::new(),
                owner: "dbo".into(),
                table: "users".into(),
                column: "id".into(),
                key_sequence: 1,
            }]
        );
    }

    #[test]
    fn primary_keys_bad_sequence() {
        let reply = response(5, &[b"", b"dbo", b"users", b"id", b"one"]);
        assert!(matches!(
            decode_primary_keys(&reply),
            Err(DecodeError::InvalidField { field: "key sequence", .. })
        ));
    }

    #[test]
    fn foreign_keys() {
        let reply = response(
            11,
            &[
                b"", b"dbo", b"users", b"id", b"", b"dbo", b"orders", b"user_id", b"1", b"0",
                b"2",
            ],
        );
        let keys = decode_foreign_keys(&reply).unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].pk_table, "users");
        assert_eq!(keys[0].fk_column, "user_id");
        assert_eq!(keys[0].update_rule, 0);
        assert_eq!(keys[0].delete_rule, 2);
    }

    #[test]
    fn foreign_keys_group_size() {
        let reply = response(5, &[b"", b"dbo", b"users", b"id", b"1"]);
        assert!(decode_foreign_keys(&reply).is_err());
    }

    #[test]
    fn column_info_with_null_cells() {
        let reply = response(
            11,
            &[
                b"dbo", b"dbo", b"users", b"name", b"12", b"varchar", b"255", b"255", b"", b"",
                b"1",
            ],
        );
        let columns = decode_column_info(&reply).unwrap();

        assert_eq!(columns[0].type_name, "varchar");
        assert_eq!(columns[0].precision, 255);
        assert_eq!(columns[0].scale, 0);
        assert_eq!(columns[0].nullable, 1);
    }

    #[test]
    fn table_info_and_metadata() {
        let reply = response(8, &[b"", b"dbo", b"users", b"TABLE", b"", b"dbo", b"v", b"VIEW"]);
        let tables = decode_table_info(&reply).unwrap();
        assert_eq!(tables[1].table_type, "VIEW");

        let reply = response(3, &[b"id", b"int", b"java.lang.Integer"]);
        let metadata = decode_metadata(&reply).unwrap();
        assert_eq!(metadata[0].java_type, "java.lang.Integer");
    }
}
