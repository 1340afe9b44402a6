use crate::{
    Result,
    protocol::{Request, Transport, family},
    records::{
        ColumnInfo, ColumnMetadata, ForeignKey, PrimaryKey, ResultSet, TableInfo,
        decode_column_info, decode_foreign_keys, decode_metadata, decode_primary_keys,
        decode_result_set, decode_strings, decode_table_info,
    },
};

use super::{Connection, required};

impl<T: Transport> Connection<T> {
    /// Names of the data sources configured on the server.
    pub fn dsn_info(&mut self) -> Result<Vec<String>> {
        let request = Ok(db_funcs("", "DSNINFO"));
        self.call(request, |r| Ok(decode_strings(r)?))
    }

    pub fn table_info(&mut self, data_source: &str) -> Result<Vec<TableInfo>> {
        let request = required("data source", data_source).map(|ds| db_funcs(ds, "TABLEINFO"));
        self.call(request, |r| Ok(decode_table_info(r)?))
    }

    pub fn column_info(&mut self, data_source: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let request = table_request(data_source, "COLUMNINFO", table);
        self.call(request, |r| Ok(decode_column_info(r)?))
    }

    pub fn primary_keys(&mut self, data_source: &str, table: &str) -> Result<Vec<PrimaryKey>> {
        let request = table_request(data_source, "PRIMARYKEYS", table);
        self.call(request, |r| Ok(decode_primary_keys(r)?))
    }

    pub fn foreign_keys(&mut self, data_source: &str, table: &str) -> Result<Vec<ForeignKey>> {
        let request = table_request(data_source, "FOREIGNKEYS", table);
        self.call(request, |r| Ok(decode_foreign_keys(r)?))
    }

    /// Keys of other tables that `table` references.
    pub fn imported_keys(&mut self, data_source: &str, table: &str) -> Result<Vec<ForeignKey>> {
        let request = table_request(data_source, "IMPORTEDKEYS", table);
        self.call(request, |r| Ok(decode_foreign_keys(r)?))
    }

    /// Keys of other tables that reference `table`.
    pub fn exported_keys(&mut self, data_source: &str, table: &str) -> Result<Vec<ForeignKey>> {
        let request = table_request(data_source, "EXPORTEDKEYS", table);
        self.call(request, |r| Ok(decode_foreign_keys(r)?))
    }

    /// Runs a statement against a data source and returns its result grid.
    pub fn sql_statement(&mut self, data_source: &str, sql: &str) -> Result<ResultSet> {
        let request = statement_request(data_source, "SQLSTMNT", sql);
        self.call(request, |r| Ok(decode_result_set(r)?))
    }

    /// Describes the columns a statement would return.
    pub fn sql_metadata(&mut self, data_source: &str, sql: &str) -> Result<Vec<ColumnMetadata>> {
        let request = statement_request(data_source, "SQLMETADATA", sql);
        self.call(request, |r| Ok(decode_metadata(r)?))
    }

    pub fn supported_commands(&mut self) -> Result<Vec<String>> {
        let request = Ok(db_funcs("", "SUPPORTEDCOMMANDS"));
        self.call(request, |r| Ok(decode_strings(r)?))
    }

    /// Product description of the database behind a data source.
    pub fn db_description(&mut self, data_source: &str) -> Result<String> {
        let request =
            required("data source", data_source).map(|ds| db_funcs(ds, "DBDESCRIPTION"));
        self.call(request, |r| r.single_string())
    }
}

fn db_funcs(data_source: &str, operation: &str) -> Request {
    Request::new(family::DB_FUNCS).arg(data_source).arg(operation)
}

fn table_request(data_source: &str, operation: &str, table: &str) -> Result<Request> {
    let data_source = required("data source", data_source)?;
    let table = required("table", table)?;
    Ok(db_funcs(data_source, operation).arg(table))
}

fn statement_request(data_source: &str, operation: &str, sql: &str) -> Result<Request> {
    let data_source = required("data source", data_source)?;
    let sql = required("sql", sql)?;
    Ok(db_funcs(data_source, operation).arg(sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Error, Status,
        protocol::ScriptedTransport,
        session::testing::{connection, fields, sent_args},
    };

    #[test]
    fn dsn_info() {
        let reply = fields(&[b"cfartgallery", b"cfbookclub"]);
        let mut connection = connection(ScriptedTransport::new().reply(reply));

        assert_eq!(connection.dsn_info().unwrap(), ["cfartgallery", "cfbookclub"]);
        assert_eq!(sent_args(&connection, 0), ["", "DSNINFO"]);
    }

    #[test]
    fn table_info() {
        let reply = fields(&[b"", b"APP", b"ART", b"TABLE"]);
        let mut connection = connection(ScriptedTransport::new().reply(reply));

        let tables = connection.table_info("cfartgallery").unwrap();

        assert_eq!(tables[0].name, "ART");
        assert_eq!(sent_args(&connection, 0), ["cfartgallery", "TABLEINFO"]);
    }

    #[test]
    fn key_listings_name_the_table() {
        let key = fields(&[b"", b"APP", b"ART", b"ARTID", b"1"]);
        let foreign = fields(&[
            b"", b"APP", b"ARTISTS", b"ARTISTID", b"", b"APP", b"ART", b"ARTISTID", b"1", b"3",
            b"3",
        ]);
        let transport = ScriptedTransport::new()
            .reply(key)
            .reply(foreign.clone())
            .reply(foreign.clone())
            .reply(foreign);
        let mut connection = connection(transport);

        assert_eq!(connection.primary_keys("cfartgallery", "ART").unwrap().len(), 1);
        assert_eq!(
            connection.foreign_keys("cfartgallery", "ART").unwrap()[0].pk_table,
            "ARTISTS"
        );
        connection.imported_keys("cfartgallery", "ART").unwrap();
        connection.exported_keys("cfartgallery", "ART").unwrap();

        assert_eq!(sent_args(&connection, 0), ["cfartgallery", "PRIMARYKEYS", "ART"]);
        assert_eq!(sent_args(&connection, 1), ["cfartgallery", "FOREIGNKEYS", "ART"]);
        assert_eq!(sent_args(&connection, 2), ["cfartgallery", "IMPORTEDKEYS", "ART"]);
        assert_eq!(sent_args(&connection, 3), ["cfartgallery", "EXPORTEDKEYS", "ART"]);
    }

    #[test]
    fn sql_statement_result_set() {
        let reply = fields(&[
            b"2:7:ARTNAME5:PRICE",
            b"2:7:Michael5:13200",
            b"2:6:Space!4:9000",
        ]);
        let mut connection = connection(ScriptedTransport::new().reply(reply));

        let set = connection
            .sql_statement("cfartgallery", "SELECT artname, price FROM art")
            .unwrap();

        assert_eq!(set.column_names(), ["ARTNAME", "PRICE"]);
        assert_eq!(set.rows(), 2);
        assert_eq!(set.value(1, 0), Some("Space!"));
        assert_eq!(
            sent_args(&connection, 0),
            ["cfartgallery", "SQLSTMNT", "SELECT artname, price FROM art"]
        );
    }

    #[test]
    fn sql_statement_needs_a_statement() {
        let mut connection = connection(ScriptedTransport::new());

        assert!(matches!(
            connection.sql_statement("cfartgallery", ""),
            Err(Error::MissingParameter("sql"))
        ));
        assert_eq!(connection.last_status(), Status::ParamMissing);
    }

    #[test]
    fn malformed_grid_is_recorded() {
        let reply = fields(&[b"2:7:ARTNAME5:PRICE", b"1:8:Michael1"]);
        let mut connection = connection(ScriptedTransport::new().reply(reply));

        assert!(connection.sql_statement("cfartgallery", "SELECT 1").is_err());
        assert_eq!(connection.last_status(), Status::ResponseMalformed);
    }

    #[test]
    fn metadata_commands_and_description() {
        let transport = ScriptedTransport::new()
            .reply(fields(&[b"ARTID", b"INTEGER", b"java.lang.Integer"]))
            .reply(fields(&[b"SQLSTMNT", b"TABLEINFO"]))
            .reply(fields(&[b"Apache Derby 10.16"]));
        let mut connection = connection(transport);

        let metadata = connection
            .sql_metadata("cfartgallery", "SELECT artid FROM art")
            .unwrap();
        assert_eq!(metadata[0].type_name, "INTEGER");
        assert_eq!(
            connection.supported_commands().unwrap(),
            ["SQLSTMNT", "TABLEINFO"]
        );
        assert_eq!(
            connection.db_description("cfartgallery").unwrap(),
            "Apache Derby 10.16"
        );

        assert_eq!(sent_args(&connection, 1), ["", "SUPPORTEDCOMMANDS"]);
        assert_eq!(sent_args(&connection, 2), ["cfartgallery", "DBDESCRIPTION"]);
    }
}
