//! `sheetkit_io_xlsx` v1:
//! Record-to-row mapping layer over XLSX workbooks.
//!
//! Module map:
//! - `conf`     : constants, default messages and format presets
//! - `spec`     : cell value, formats, regions, options and reports
//! - `error`    : error taxonomy
//! - `binding`  : column attributes and per-type record schemas
//! - `coerce`   : cell value <-> field value conversion
//! - `resolve`  : schema fields to table columns
//! - `document` : calamine-backed workbook access
//! - `reader`   : lazy row-to-record reader
//! - `validate` : record validation bridge
//! - `writer`   : rust_xlsxwriter-backed sheet rendering
//! - `util`     : pure helper functions
pub mod binding;
pub mod coerce;
pub mod conf;
pub mod document;
pub mod error;
pub mod reader;
pub mod resolve;
pub mod spec;
pub mod util;
pub mod validate;
pub mod writer;

pub use binding::{RecordSchema, SheetRecord, SpecColumnAttr, SpecFieldBinding};
pub use coerce::{FromCellValue, IntoCellValue, SheetEnum, coerce_enum};
pub use conf::{
    C_MSG_CASTING_ERROR_DEFAULT, C_MSG_COLUMN_MISSING_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
};
pub use document::{SheetGrid, SpecNamedTable, XlsxDocument};
pub use error::{XlsxMapError, XlsxMapResult};
pub use reader::{SpecReadReport, TableReader, read_records, read_table, validate_records};
pub use resolve::{SpecColumnBinding, resolve_column_bindings};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumColumnPostRender, SpecAutofitCellsPolicy,
    SpecCellFormat, SpecConversionError, SpecFieldViolation, SpecReadOptions, SpecSheetReport,
    SpecSheetStyle, SpecTableRegion,
};
pub use util::sanitize_sheet_name;
pub use validate::{RecordValidator, SpecRuleValidator};
pub use writer::{SheetBuilder, SpecColumnRender, SpecTitleRow, XlsxWorkbook, XlsxWriter};
