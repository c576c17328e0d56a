use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::{Table, TableColumn};

use sheetkit_io_xlsx::{
    EnumCellValue, RecordSchema, SheetBuilder, SheetEnum, SheetRecord, SpecCellFormat,
    SpecColumnAttr, SpecReadOptions, SpecRuleValidator, XlsxDocument, XlsxMapError,
    XlsxMapResult, XlsxWriter, impl_cell_enum, read_records, validate_records,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Genders {
    #[default]
    Male,
    Female,
}

impl SheetEnum for Genders {
    const MEMBERS: &'static [(&'static str, i64, Self)] =
        &[("MALE", 1, Genders::Male), ("FEMALE", 2, Genders::Female)];
}

impl_cell_enum!(Genders);

#[derive(Debug, Clone, PartialEq, Default)]
struct Employee {
    name: String,
    gender: Genders,
    age: Option<i32>,
    joined: NaiveDate,
    active: bool,
    score: f64,
}

impl SheetRecord for Employee {
    fn schema() -> XlsxMapResult<RecordSchema<Self>> {
        RecordSchema::new()
            .column("name", SpecColumnAttr::new(), |e: &Employee| &e.name, |e: &mut Employee| &mut e.name)
            .column(
                "gender",
                SpecColumnAttr::new(),
                |e: &Employee| &e.gender,
                |e: &mut Employee| &mut e.gender,
            )
            .column("age", SpecColumnAttr::new(), |e: &Employee| &e.age, |e: &mut Employee| &mut e.age)
            .column(
                "joined",
                SpecColumnAttr::by_name("Start Date")?,
                |e: &Employee| &e.joined,
                |e: &mut Employee| &mut e.joined,
            )
            .column(
                "active",
                SpecColumnAttr::new(),
                |e: &Employee| &e.active,
                |e: &mut Employee| &mut e.active,
            )
            .column(
                "score",
                SpecColumnAttr::new(),
                |e: &Employee| &e.score,
                |e: &mut Employee| &mut e.score,
            )
            .with_sheet_name("Employees")
    }
}

fn derive_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn derive_employees() -> Vec<Employee> {
    vec![
        Employee {
            name: "John".to_string(),
            gender: Genders::Male,
            age: Some(34),
            joined: derive_date(2019, 4, 1),
            active: true,
            score: 87.5,
        },
        Employee {
            name: "Mary".to_string(),
            gender: Genders::Female,
            age: None,
            joined: derive_date(2021, 11, 15),
            active: false,
            score: 92.25,
        },
        Employee {
            name: "Zoë".to_string(),
            gender: Genders::Female,
            age: Some(28),
            joined: derive_date(2024, 2, 29),
            active: true,
            score: 0.0,
        },
    ]
}

/// Name/Gender pair bound by property name.
#[derive(Debug, Clone, PartialEq, Default)]
struct NameGender {
    name: String,
    gender: String,
}

impl SheetRecord for NameGender {
    fn schema() -> XlsxMapResult<RecordSchema<Self>> {
        Ok(RecordSchema::new()
            .column("Name", SpecColumnAttr::new(), |r: &NameGender| &r.name, |r: &mut NameGender| &mut r.name)
            .column(
                "Gender",
                SpecColumnAttr::new(),
                |r: &NameGender| &r.gender,
                |r: &mut NameGender| &mut r.gender,
            ))
    }
}

fn derive_name_gender_buffer(l_genders: &[&str]) -> Vec<u8> {
    let l_names = ["John", "Mary", "Bob", "Ann", "Tom"];
    let l_rows: Vec<(String, String)> = l_names
        .iter()
        .zip(l_genders)
        .map(|(name, gender)| (name.to_string(), gender.to_string()))
        .collect();
    XlsxWriter::new()
        .add_sheet(
            SheetBuilder::new("People", &l_rows)
                .with_column("Name", |r: &(String, String)| r.0.clone())
                .with_column("Gender", |r: &(String, String)| r.1.clone()),
        )
        .save_to_buffer()
        .expect("save")
}

#[test]
fn test_round_trip_through_buffer() {
    let l_employees = derive_employees();
    let buffer = XlsxWriter::new()
        .add_records(&l_employees)
        .expect("schema")
        .save_to_buffer()
        .expect("save");

    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    assert_eq!(document.worksheet_names(), vec!["Employees".to_string()]);
    let l_read: Vec<Employee> = document
        .read_sheet(&SpecReadOptions::default())
        .expect("read");
    assert_eq!(l_read, l_employees);
}

#[test]
fn test_round_trip_keeps_trailing_blank_records() {
    let l_rows = vec![
        NameGender {
            name: "John".to_string(),
            gender: "MALE".to_string(),
        },
        NameGender::default(),
        NameGender::default(),
    ];
    let buffer = XlsxWriter::new()
        .add_records(&l_rows)
        .expect("schema")
        .save_to_buffer()
        .expect("save");

    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    let l_read: Vec<NameGender> = document
        .read_sheet(&SpecReadOptions::default())
        .expect("read");
    assert_eq!(l_read, l_rows);
}

#[test]
fn test_name_gender_scenario_yields_five_rows() {
    let buffer = derive_name_gender_buffer(&["MALE", "FEMALE", "MALE", "FEMALE", "MALE"]);
    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    let grid = document.worksheet("People").expect("worksheet");
    assert_eq!(grid.height(), 6);

    let options = SpecReadOptions::default();
    let l_rows: Vec<NameGender> = read_records(&grid, &options)
        .expect("resolve")
        .collect::<XlsxMapResult<_>>()
        .expect("read");
    assert_eq!(l_rows.len(), 5);
    assert_eq!(
        l_rows[0],
        NameGender {
            name: "John".to_string(),
            gender: "MALE".to_string(),
        }
    );
}

#[test]
fn test_enum_column_by_name_and_by_code() {
    #[derive(Debug, Default, PartialEq)]
    struct Person {
        name: String,
        gender: Option<Genders>,
    }
    impl SheetRecord for Person {
        fn schema() -> XlsxMapResult<RecordSchema<Self>> {
            Ok(RecordSchema::new()
                .column("Name", SpecColumnAttr::new(), |p: &Person| &p.name, |p: &mut Person| &mut p.name)
                .column(
                    "Gender",
                    SpecColumnAttr::new(),
                    |p: &Person| &p.gender,
                    |p: &mut Person| &mut p.gender,
                ))
        }
    }

    let l_rows = [
        ("Mary", EnumCellValue::String("FEMALE".to_string())),
        ("Ann", EnumCellValue::Integer(2)),
        ("Bob", EnumCellValue::String("male".to_string())),
        ("Kim", EnumCellValue::None),
    ];
    let buffer = XlsxWriter::new()
        .add_sheet(
            SheetBuilder::new("People", &l_rows)
                .with_column("Name", |r: &(&str, EnumCellValue)| r.0.to_string())
                .with_column("Gender", |r: &(&str, EnumCellValue)| r.1.clone()),
        )
        .save_to_buffer()
        .expect("save");

    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    let l_people: Vec<Person> = document
        .read_worksheet("People", &SpecReadOptions::default())
        .expect("read");
    let l_genders: Vec<Option<Genders>> = l_people.iter().map(|p| p.gender).collect();
    assert_eq!(
        l_genders,
        vec![
            Some(Genders::Female),
            Some(Genders::Female),
            Some(Genders::Male),
            None,
        ]
    );
}

#[test]
fn test_titled_report_layout() {
    let l_rows = derive_name_gender_rows();
    let workbook_builder = XlsxWriter::new().add_sheet(
        SheetBuilder::from_records(&l_rows)
            .expect("schema")
            .with_name("Report")
            .with_title("Report"),
    );
    let mut workbook = workbook_builder.materialize().expect("materialize");
    let report = workbook.reports()[0].clone();
    assert_eq!(report.n_rows_title, 1);
    assert_eq!(report.row_header, Some(1));
    assert_eq!(report.row_data_start, 2);
    assert_eq!(report.n_rows_data, 2);

    let buffer = workbook.save_to_buffer().expect("save");
    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    let grid = document.worksheet("Report").expect("worksheet");
    assert_eq!(grid.get(0, 0), &EnumCellValue::String("Report".to_string()));
    assert_eq!(grid.get(1, 0), &EnumCellValue::String("Name".to_string()));
    assert_eq!(grid.get(1, 1), &EnumCellValue::String("Gender".to_string()));
    assert_eq!(grid.get(2, 0), &EnumCellValue::String("John".to_string()));
    assert_eq!(grid.get(3, 1), &EnumCellValue::String("FEMALE".to_string()));

    let options = SpecReadOptions {
        n_rows_skip: 1,
        ..Default::default()
    };
    let l_read: Vec<NameGender> = read_records(&grid, &options)
        .expect("resolve")
        .collect::<XlsxMapResult<_>>()
        .expect("read");
    assert_eq!(l_read, l_rows);
}

fn derive_name_gender_rows() -> Vec<NameGender> {
    vec![
        NameGender {
            name: "John".to_string(),
            gender: "MALE".to_string(),
        },
        NameGender {
            name: "Mary".to_string(),
            gender: "FEMALE".to_string(),
        },
    ]
}

#[test]
fn test_strict_and_skip_casting_on_real_workbook() {
    #[derive(Debug, Default, PartialEq)]
    struct Aged {
        name: String,
        age: Option<i32>,
    }
    impl SheetRecord for Aged {
        fn schema() -> XlsxMapResult<RecordSchema<Self>> {
            Ok(RecordSchema::new()
                .column("Name", SpecColumnAttr::new(), |a: &Aged| &a.name, |a: &mut Aged| &mut a.name)
                .column("Age", SpecColumnAttr::new(), |a: &Aged| &a.age, |a: &mut Aged| &mut a.age))
        }
    }

    let l_rows = [("John", "41"), ("Mary", "unknown"), ("Bob", "")];
    let buffer = XlsxWriter::new()
        .add_sheet(
            SheetBuilder::new("Ages", &l_rows)
                .with_column("Name", |r: &(&str, &str)| r.0.to_string())
                .with_column("Age", |r: &(&str, &str)| r.1.to_string()),
        )
        .save_to_buffer()
        .expect("save");
    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    let grid = document.worksheet("Ages").expect("worksheet");

    let options = SpecReadOptions::default();
    let l_results: Vec<XlsxMapResult<Aged>> =
        read_records(&grid, &options).expect("resolve").collect();
    assert_eq!(l_results.len(), 2);
    let err = l_results[1].as_ref().expect_err("cast error");
    assert_eq!(err.conversion().expect("detail").cell_address, "B3");

    let options = SpecReadOptions {
        if_skip_casting_errors: true,
        ..Default::default()
    };
    let l_read: Vec<Aged> = read_records(&grid, &options)
        .expect("resolve")
        .collect::<XlsxMapResult<_>>()
        .expect("read");
    let l_ages: Vec<Option<i32>> = l_read.iter().map(|a| a.age).collect();
    assert_eq!(l_ages, vec![Some(41), None, None]);
}

#[test]
fn test_missing_column_fails_before_any_row() {
    let buffer = derive_name_gender_buffer(&["MALE", "FEMALE", "MALE", "FEMALE", "MALE"]);
    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    let err = document
        .read_worksheet::<Employee>("People", &SpecReadOptions::default())
        .expect_err("resolution error");
    assert!(matches!(err, XlsxMapError::Resolution(ref msg) if msg == "age column could not be found"));
}

#[test]
fn test_validate_records_reports_all_problems() {
    let buffer = derive_name_gender_buffer(&["MALE", "", "MALE", "", "FEMALE"]);
    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    let grid = document.worksheet("People").expect("worksheet");

    let options = SpecReadOptions::default()
        .with_validator(SpecRuleValidator::new().required("Gender", |r: &NameGender| &r.gender));
    let report = validate_records::<NameGender>(&grid, &options).expect("resolve");
    assert_eq!(report.records.len(), 3);
    let l_rows: Vec<usize> = report
        .errors
        .iter()
        .filter_map(|err| match err {
            XlsxMapError::Validation { row, .. } => Some(*row),
            _ => None,
        })
        .collect();
    assert_eq!(l_rows, vec![3, 5]);
}

#[test]
fn test_save_and_open_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("employees.xlsx");
    let l_employees = derive_employees();

    let l_reports = XlsxWriter::new()
        .add_records(&l_employees)
        .expect("schema")
        .save(&path)
        .expect("save");
    assert_eq!(l_reports.len(), 1);

    let mut document = XlsxDocument::open_path(&path).expect("open");
    let l_read: Vec<Employee> = document
        .read_sheet(&SpecReadOptions::default())
        .expect("read");
    assert_eq!(l_read.len(), 3);
    assert_eq!(l_read[2].name, "Zoë");
}

#[test]
fn test_multi_sheet_and_template() {
    let l_employees = derive_employees();
    let buffer = XlsxWriter::new()
        .add_records(&l_employees)
        .expect("schema")
        .write_template::<NameGender>()
        .expect("template")
        .save_to_buffer()
        .expect("save");

    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    assert_eq!(
        document.worksheet_names(),
        vec!["Employees".to_string(), "NameGender".to_string()]
    );
    let l_empty: Vec<NameGender> = document
        .read_sheet(&SpecReadOptions::default())
        .expect("read template");
    assert!(l_empty.is_empty());
}

#[test]
fn test_duplicate_sheet_names_fail_at_save() {
    let l_employees = derive_employees();
    let err = XlsxWriter::new()
        .add_records(&l_employees)
        .expect("schema")
        .add_records(&l_employees)
        .expect("schema")
        .save_to_buffer()
        .expect_err("duplicate sheet name");
    assert!(matches!(err, XlsxMapError::Write(_)));
}

#[test]
fn test_unknown_worksheet_and_table() {
    let buffer = derive_name_gender_buffer(&["MALE", "FEMALE", "MALE", "FEMALE", "MALE"]);
    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    assert!(matches!(
        document.worksheet("Nope"),
        Err(XlsxMapError::DocumentStructure(_))
    ));
    assert!(document.table_names().expect("tables").is_empty());
    assert!(matches!(
        document.table("Nope"),
        Err(XlsxMapError::DocumentStructure(_))
    ));
}

#[test]
fn test_read_named_table() {
    let l_rows = derive_name_gender_rows();
    let mut workbook = XlsxWriter::new()
        .add_sheet(
            SheetBuilder::from_records(&l_rows)
                .expect("schema")
                .with_name("Data")
                .with_title("Roster")
                .with_header_row_format(SpecCellFormat {
                    bold: Some(true),
                    ..Default::default()
                }),
        )
        .materialize()
        .expect("materialize");

    let table = Table::new().set_name("Roster").set_columns(&[
        TableColumn::new().set_header("Name"),
        TableColumn::new().set_header("Gender"),
    ]);
    workbook
        .workbook_mut()
        .worksheet_from_name("Data")
        .expect("worksheet")
        .add_table(1, 0, 3, 1, &table)
        .expect("table");
    let buffer = workbook.save_to_buffer().expect("save");

    let mut document = XlsxDocument::open_from_bytes(buffer).expect("open");
    assert_eq!(document.table_names().expect("tables"), vec!["Roster".to_string()]);
    let l_read: Vec<NameGender> = document
        .read_named_table("Roster", &SpecReadOptions::default())
        .expect("read");
    assert_eq!(l_read, l_rows);
}
