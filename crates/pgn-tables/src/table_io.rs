//! CSV persistence for the tables.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::TableError;
use crate::game_data::{
    CleanMetadataTable, CleanMoveTable, EnrichedMoveTable, MetadataRow, MetadataTable, MoveRow,
    MoveTable, ENRICHED_MOVE_COLUMNS, GAME_ID, MOVE_COLUMNS,
};

/// A table that can be written as CSV.
pub trait CsvTable {
    fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError>;

    /// Write to `path`, creating parent directories.
    fn write_csv_path(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.write_csv(File::create(path)?)
    }
}

fn write_rows<'a, T, W>(
    rows: impl IntoIterator<Item = &'a T>,
    header: &[&str],
    writer: W,
) -> Result<(), TableError>
where
    T: Serialize + 'a,
    W: Write,
{
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(header)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

impl CsvTable for MoveTable {
    fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        write_rows(&self.rows, &MOVE_COLUMNS, writer)
    }
}

impl CsvTable for CleanMoveTable {
    fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        write_rows(&self.rows, &MOVE_COLUMNS, writer)
    }
}

impl CsvTable for EnrichedMoveTable {
    fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        write_rows(&self.rows, &ENRICHED_MOVE_COLUMNS, writer)
    }
}

impl CsvTable for MetadataTable {
    fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let columns = self.columns();
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&columns)?;
        for row in &self.rows {
            let record = columns.iter().map(|column| match column.as_str() {
                GAME_ID => row.game_id.to_string(),
                name => row.get(name).unwrap_or_default().to_string(),
            });
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl CsvTable for CleanMetadataTable {
    fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let columns = self.columns();
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&columns)?;
        for row in self.rows.values() {
            let record = columns.iter().map(|column| match column.as_str() {
                GAME_ID => row.game_id.to_string(),
                name => row.get(name).map(|v| v.to_string()).unwrap_or_default(),
            });
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Read a move table. A `ply` or `game_id` that is not an integer fails
/// the read instead of being truncated.
pub fn read_moves<R: Read>(reader: R) -> Result<MoveTable, TableError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let rows = rdr
        .deserialize::<MoveRow>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MoveTable { rows })
}

/// Read a metadata table. Every header column becomes a field of every row,
/// empty cells included.
pub fn read_metadata<R: Read>(reader: R) -> Result<MetadataTable, TableError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let id_index = headers
        .iter()
        .position(|h| h == GAME_ID)
        .ok_or(TableError::MissingColumn(GAME_ID))?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let raw_id = record.get(id_index).unwrap_or_default();
        let game_id = raw_id
            .trim()
            .parse()
            .map_err(|_| TableError::InvalidGameId {
                record: record.position().map(|p| p.record()).unwrap_or_default(),
                value: raw_id.to_string(),
            })?;

        let fields = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| *i != id_index)
            .map(|(_, (name, value))| (name.to_string(), value.to_string()))
            .collect();

        rows.push(MetadataRow { game_id, fields });
    }

    Ok(MetadataTable { rows })
}
