//! Calamine-backed workbook access and owned worksheet snapshots.

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, Xlsx, open_workbook_from_rs};
use log::debug;

use crate::binding::SheetRecord;
use crate::coerce::parse_datetime_invariant;
use crate::error::{XlsxMapError, XlsxMapResult};
use crate::reader::{read_records, read_table};
use crate::spec::{EnumCellValue, SpecReadOptions, SpecTableRegion};
use crate::util::sanitize_sheet_name;

static CELL_EMPTY: EnumCellValue = EnumCellValue::None;

////////////////////////////////////////////////////////////////////////////////
// #region SheetGrid

/// Owned snapshot of a worksheet's populated extent.
///
/// Coordinates are absolute, 0-based worksheet coordinates; `origin` is the
/// top-left cell of the used range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetGrid {
    name: String,
    origin: (usize, usize),
    rows: Vec<Vec<EnumCellValue>>,
    width: usize,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, origin: (usize, usize), rows: Vec<Vec<EnumCellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            name: name.into(),
            origin,
            rows,
            width,
        }
    }

    /// Snapshot a calamine range.
    pub fn from_calamine(name: impl Into<String>, range: &Range<Data>) -> Self {
        let origin = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));
        let rows = range
            .rows()
            .map(|row| row.iter().map(convert_calamine_cell).collect())
            .collect();
        Self::new(name, origin, rows)
    }

    /// Grow the snapshot down and right to the declared sheet dimension
    /// (absolute, inclusive), padding with blanks.
    ///
    /// Styled cells without a value are missing from the used range, so
    /// trailing blank rows only show up in the sheet dimension.
    pub fn with_dimension(mut self, start: (usize, usize), end: (usize, usize)) -> Self {
        if self.rows.is_empty() {
            self.origin = start;
        }
        let (n_row_origin, n_col_origin) = self.origin;
        if end.0 < n_row_origin || end.1 < n_col_origin {
            return self;
        }
        let n_height = usize::max(self.rows.len(), end.0 + 1 - n_row_origin);
        let n_width = usize::max(self.width, end.1 + 1 - n_col_origin);
        self.rows.resize_with(n_height, Vec::new);
        for cells in &mut self.rows {
            cells.resize(n_width, EnumCellValue::None);
        }
        self.width = n_width;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> (usize, usize) {
        self.origin
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Cell at absolute coordinates; blank outside the snapshot.
    pub fn get(&self, row: usize, col: usize) -> &EnumCellValue {
        let (n_row_origin, n_col_origin) = self.origin;
        if row < n_row_origin || col < n_col_origin {
            return &CELL_EMPTY;
        }
        self.rows
            .get(row - n_row_origin)
            .and_then(|cells| cells.get(col - n_col_origin))
            .unwrap_or(&CELL_EMPTY)
    }

    /// Table region over the used range.
    ///
    /// `n_rows_skip` leading rows (titles) are excluded; `None` when nothing
    /// is left after skipping.
    pub fn region(
        &self,
        if_has_header_row: bool,
        n_rows_skip: usize,
        if_has_totals_row: bool,
    ) -> Option<SpecTableRegion> {
        if self.width == 0 || n_rows_skip >= self.rows.len() {
            return None;
        }
        let (n_row_origin, n_col_origin) = self.origin;
        Some(SpecTableRegion {
            n_row_start: n_row_origin + n_rows_skip,
            n_col_start: n_col_origin,
            n_row_end: n_row_origin + self.rows.len() - 1,
            n_col_end: n_col_origin + self.width - 1,
            if_has_header_row,
            if_has_totals_row,
        })
    }

    /// Header texts of `region`, `None` when the region has no header row.
    pub fn header_texts(&self, region: &SpecTableRegion) -> Option<Vec<String>> {
        let n_row = region.header_row()?;
        Some(
            (region.n_col_start..=region.n_col_end)
                .map(|n_col| self.get(n_row, n_col).to_string())
                .collect(),
        )
    }
}

fn convert_calamine_cell(cell: &Data) -> EnumCellValue {
    match cell {
        Data::Empty => EnumCellValue::None,
        Data::String(s) => EnumCellValue::String(s.clone()),
        Data::Int(n) => EnumCellValue::Integer(*n),
        Data::Float(n) => EnumCellValue::Number(*n),
        Data::Bool(b) => EnumCellValue::Boolean(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => EnumCellValue::DateTime(value),
            None => EnumCellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_datetime_invariant(s) {
            Some(value) => EnumCellValue::DateTime(value),
            None => EnumCellValue::String(s.clone()),
        },
        Data::DurationIso(s) => EnumCellValue::String(s.clone()),
        Data::Error(e) => EnumCellValue::Error(e.to_string()),
        #[allow(unreachable_patterns)]
        other => EnumCellValue::String(other.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NamedTable

/// Snapshot of a named table: header texts plus the data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecNamedTable {
    /// Table name.
    pub name: String,
    /// Worksheet holding the table.
    pub sheet_name: String,
    /// Header texts, left to right.
    pub columns: Vec<String>,
    /// Data rows (header excluded).
    pub grid: SheetGrid,
}

impl SpecNamedTable {
    /// Table region over the data rows; the header lives in `columns`.
    ///
    /// `None` when the table has no data rows.
    pub fn region(&self, if_has_totals_row: bool) -> Option<SpecTableRegion> {
        if self.grid.height() == 0 {
            return None;
        }
        let (n_row_origin, n_col_origin) = self.grid.origin();
        let n_width = usize::max(self.columns.len(), self.grid.width()).max(1);
        Some(SpecTableRegion {
            n_row_start: n_row_origin,
            n_col_start: n_col_origin,
            n_row_end: n_row_origin + self.grid.height() - 1,
            n_col_end: n_col_origin + n_width - 1,
            if_has_header_row: false,
            if_has_totals_row,
        })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Document

/// Read-side workbook handle.
pub struct XlsxDocument {
    workbook: Xlsx<Cursor<Vec<u8>>>,
    if_tables_loaded: bool,
}

impl XlsxDocument {
    /// Parse an XLSX byte buffer.
    ///
    /// Encrypted packages are not supported and fail with [`XlsxMapError::Read`].
    pub fn open_from_bytes(bytes: Vec<u8>) -> XlsxMapResult<Self> {
        let workbook: Xlsx<Cursor<Vec<u8>>> = open_workbook_from_rs(Cursor::new(bytes))?;
        Ok(Self {
            workbook,
            if_tables_loaded: false,
        })
    }

    /// Read and parse an XLSX file.
    pub fn open_path(path: impl AsRef<Path>) -> XlsxMapResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        debug!("opened {} ({} bytes)", path.as_ref().display(), bytes.len());
        Self::open_from_bytes(bytes)
    }

    /// Worksheet names in workbook order.
    pub fn worksheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Names of all defined tables.
    pub fn table_names(&mut self) -> XlsxMapResult<Vec<String>> {
        self.ensure_tables_loaded()?;
        Ok(self
            .workbook
            .table_names()
            .into_iter()
            .map(ToString::to_string)
            .collect())
    }

    /// Snapshot one worksheet by name.
    pub fn worksheet(&mut self, name: &str) -> XlsxMapResult<SheetGrid> {
        let l_names = self.worksheet_names();
        if !l_names.iter().any(|c_name| c_name == name) {
            return Err(XlsxMapError::DocumentStructure(format!(
                "worksheet '{name}' does not exist"
            )));
        }
        let dimensions = self.workbook.worksheet_cells_reader(name)?.dimensions();
        let range = self.workbook.worksheet_range(name)?;
        Ok(SheetGrid::from_calamine(name, &range).with_dimension(
            (dimensions.start.0 as usize, dimensions.start.1 as usize),
            (dimensions.end.0 as usize, dimensions.end.1 as usize),
        ))
    }

    /// Snapshot one named table.
    pub fn table(&mut self, name: &str) -> XlsxMapResult<SpecNamedTable> {
        if !self.table_names()?.iter().any(|c_name| c_name == name) {
            return Err(XlsxMapError::DocumentStructure(format!(
                "table '{name}' does not exist"
            )));
        }
        let table = self.workbook.table_by_name(name)?;
        Ok(SpecNamedTable {
            name: table.name().to_string(),
            sheet_name: table.sheet_name().to_string(),
            columns: table.columns().to_vec(),
            grid: SheetGrid::from_calamine(table.sheet_name(), table.data()),
        })
    }

    /// Read the worksheet named after `T`'s schema.
    ///
    /// Falls back to the sanitized sheet name the writer would have used.
    pub fn read_sheet<T: SheetRecord>(&mut self, options: &SpecReadOptions<T>) -> XlsxMapResult<Vec<T>> {
        let schema = T::schema()?;
        let c_name = schema.sheet_name();
        let c_name_sanitized = sanitize_sheet_name(c_name, "_");
        let l_names = self.worksheet_names();
        let c_name_found = if l_names.iter().any(|name| name == c_name) {
            c_name.to_string()
        } else if l_names.iter().any(|name| *name == c_name_sanitized) {
            c_name_sanitized
        } else {
            return Err(XlsxMapError::DocumentStructure(format!(
                "worksheet '{c_name}' does not exist"
            )));
        };
        self.read_worksheet(&c_name_found, options)
    }

    /// Read all records of a worksheet.
    pub fn read_worksheet<T: SheetRecord>(
        &mut self,
        name: &str,
        options: &SpecReadOptions<T>,
    ) -> XlsxMapResult<Vec<T>> {
        let grid = self.worksheet(name)?;
        read_records(&grid, options)?.collect()
    }

    /// Read all records of a named table.
    pub fn read_named_table<T: SheetRecord>(
        &mut self,
        name: &str,
        options: &SpecReadOptions<T>,
    ) -> XlsxMapResult<Vec<T>> {
        let table = self.table(name)?;
        read_table(&table, options)?.collect()
    }

    fn ensure_tables_loaded(&mut self) -> XlsxMapResult<()> {
        if !self.if_tables_loaded {
            self.workbook.load_tables()?;
            self.if_tables_loaded = true;
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_grid() -> SheetGrid {
        SheetGrid::new(
            "People",
            (2, 1),
            vec![
                vec![EnumCellValue::String("Report".to_string())],
                vec![
                    EnumCellValue::String("Name".to_string()),
                    EnumCellValue::String("Age".to_string()),
                ],
                vec![
                    EnumCellValue::String("John".to_string()),
                    EnumCellValue::Integer(30),
                ],
            ],
        )
    }

    #[test]
    fn test_grid_get_uses_absolute_coordinates() {
        let grid = derive_grid();
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.get(4, 2), &EnumCellValue::Integer(30));
        assert_eq!(grid.get(2, 2), &EnumCellValue::None);
        assert_eq!(grid.get(0, 0), &EnumCellValue::None);
        assert_eq!(grid.get(99, 1), &EnumCellValue::None);
    }

    #[test]
    fn test_grid_region_skips_leading_rows() {
        let grid = derive_grid();
        let region = grid.region(true, 1, false).expect("region");
        assert_eq!(region.header_row(), Some(3));
        assert_eq!(region.rows_data(), 4..5);
        assert_eq!(
            grid.header_texts(&region),
            Some(vec!["Name".to_string(), "Age".to_string()])
        );
        assert!(grid.region(true, 3, false).is_none());
    }

    #[test]
    fn test_grid_with_dimension_pads_trailing_blank_rows() {
        let grid = derive_grid().with_dimension((2, 1), (6, 2));
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.get(6, 2), &EnumCellValue::None);
        let region = grid.region(true, 1, false).expect("region");
        assert_eq!(region.rows_data(), 4..7);

        // A dimension inside the used range changes nothing.
        assert_eq!(derive_grid().with_dimension((0, 0), (1, 1)), derive_grid());
    }

    #[test]
    fn test_empty_grid_takes_dimension_origin() {
        let grid = SheetGrid::new("Blank", (0, 0), Vec::new()).with_dimension((0, 0), (1, 1));
        assert_eq!(grid.origin(), (0, 0));
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 2);
    }

    #[test]
    fn test_convert_calamine_cell() {
        assert_eq!(convert_calamine_cell(&Data::Empty), EnumCellValue::None);
        assert_eq!(convert_calamine_cell(&Data::Int(3)), EnumCellValue::Integer(3));
        assert_eq!(convert_calamine_cell(&Data::Bool(true)), EnumCellValue::Boolean(true));
        assert_eq!(
            convert_calamine_cell(&Data::DateTimeIso("2024-03-05T10:30:00".to_string())),
            EnumCellValue::DateTime(
                parse_datetime_invariant("2024-03-05 10:30:00").expect("datetime")
            )
        );
    }

    #[test]
    fn test_named_table_region_covers_data_rows() {
        let table = SpecNamedTable {
            name: "T1".to_string(),
            sheet_name: "Sheet1".to_string(),
            columns: vec!["Name".to_string()],
            grid: SheetGrid::new(
                "Sheet1",
                (1, 0),
                vec![
                    vec![EnumCellValue::String("a".to_string())],
                    vec![EnumCellValue::String("b".to_string())],
                ],
            ),
        };
        let region = table.region(false).expect("region");
        assert_eq!(region.rows_data(), 1..3);
        let region = table.region(true).expect("region");
        assert_eq!(region.rows_data(), 1..2);
    }

    #[test]
    fn test_open_garbage_bytes_fails() {
        assert!(matches!(
            XlsxDocument::open_from_bytes(b"not a zip".to_vec()),
            Err(XlsxMapError::Read(_))
        ));
    }
}
