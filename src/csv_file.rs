//! Delimiter-separated tables stored in a [`TextFile`].
//!
//! Fields are split on the delimiter with quoting disabled, so a delimiter
//! inside a value cannot be represented. Rows may have different lengths.
//! Blank lines carry no row and are dropped.

use std::path::PathBuf;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};

use crate::file::{FileError, TextFile};

pub const DEFAULT_DELIMITER: u8 = b',';

#[derive(Debug, Clone)]
pub struct CsvFile {
    file: TextFile,
    delimiter: u8,
    rows: Vec<Vec<String>>,
}

impl CsvFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        Self::with_delimiter(path, DEFAULT_DELIMITER)
    }

    pub fn with_delimiter(path: impl Into<PathBuf>, delimiter: u8) -> Result<Self, FileError> {
        let file = TextFile::open(path)?;
        let rows = parse_rows(&file, delimiter)?;
        Ok(Self {
            file,
            delimiter,
            rows,
        })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// The cells at `index` of every row long enough to have one.
    pub fn column(&self, index: usize) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index).map(String::as_str))
            .collect()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }

    /// Overwrite an existing cell. Returns `false` when the cell does not
    /// exist.
    pub fn update_cell(&mut self, row: usize, column: usize, value: impl Into<String>) -> bool {
        match self.rows.get_mut(row).and_then(|cells| cells.get_mut(column)) {
            Some(cell) => {
                *cell = value.into();
                true
            }
            None => false,
        }
    }

    /// Write the table back through the underlying file.
    pub fn save(&mut self) -> Result<(), FileError> {
        let write_failed = |message: String| FileError::WriteFailed {
            path: self.file.path().display().to_string(),
            message,
        };

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(Vec::new());
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| write_failed(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| write_failed(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| write_failed(e.to_string()))?;

        self.file.clear();
        for line in text.lines() {
            self.file.insert_line(line, None);
        }
        self.file.save()
    }
}

fn parse_rows(file: &TextFile, delimiter: u8) -> Result<Vec<Vec<String>>, FileError> {
    let content = file.lines().join("\n");
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|r: StringRecord| r.iter().map(str::to_string).collect())
                .map_err(|e| FileError::ReadFailed {
                    path: file.path().display().to_string(),
                    message: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[fixture]
    fn table() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "name,age,city\nAna,5,NY\nBo,7\n").unwrap();
        (dir, path)
    }

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[rstest]
    fn test_rows_and_row(table: (TempDir, PathBuf)) {
        let (_dir, path) = table;
        let csv = CsvFile::open(&path).unwrap();

        assert_eq!(csv.rows().len(), 3);
        assert_eq!(csv.row(1).unwrap(), &["Ana", "5", "NY"]);
        assert_eq!(csv.row(2).unwrap(), &["Bo", "7"]);
        assert!(csv.row(3).is_none());
    }

    #[rstest]
    #[case(0, vec!["name", "Ana", "Bo"])]
    #[case(2, vec!["city", "NY"])]
    #[case(9, vec![])]
    fn test_column_skips_short_rows(
        table: (TempDir, PathBuf),
        #[case] index: usize,
        #[case] expected: Vec<&str>,
    ) {
        let (_dir, path) = table;
        let csv = CsvFile::open(&path).unwrap();
        assert_eq!(csv.column(index), expected);
    }

    #[rstest]
    #[case(1, 2, Some("NY"))]
    #[case(2, 2, None)]
    #[case(7, 0, None)]
    fn test_cell(table: (TempDir, PathBuf), #[case] row: usize, #[case] column: usize, #[case] expected: Option<&str>) {
        let (_dir, path) = table;
        assert_eq!(CsvFile::open(&path).unwrap().cell(row, column), expected);
    }

    #[rstest]
    fn test_update_cell_and_save(table: (TempDir, PathBuf)) {
        let (_dir, path) = table;
        let mut csv = CsvFile::open(&path).unwrap();

        assert!(csv.update_cell(2, 1, "8"));
        assert!(!csv.update_cell(2, 2, "LA"));
        assert!(!csv.update_cell(10, 0, "x"));
        csv.save().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "name,age,city\nAna,5,NY\nBo,8\n");
    }

    #[test]
    fn test_custom_delimiter_without_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        write(&path, "a;\"b\";c\n");

        let mut csv = CsvFile::with_delimiter(&path, b';').unwrap();
        assert_eq!(csv.row(0).unwrap(), &["a", "\"b\"", "c"]);

        csv.update_cell(0, 2, "x,y");
        csv.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a;\"b\";x,y\n");
    }

    #[test]
    fn test_missing_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let csv = CsvFile::open(dir.path().join("none.csv")).unwrap();
        assert!(csv.rows().is_empty());
        assert!(csv.column(0).is_empty());
    }
}
