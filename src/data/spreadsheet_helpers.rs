use crate::errors::{MortError, RSMortResult};
use calamine::{Data, Range, Reader, open_workbook_auto, open_workbook_auto_from_rs};
use polars::prelude::*;
use spreadsheet_ods::{Value, read_ods};
use std::io::Cursor;

/// One parsed spreadsheet cell. Age-group labels arrive as text, counts as numbers.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum SheetCell {
    Number(f64),
    Text(String),
    Empty,
}

// ========= Workbook entry points =========

/// Read the named sheet of a local XLSX/XLS file into a DataFrame.
pub(super) fn read_excel_frame(file_path: &str, sheet_name: &str) -> RSMortResult<DataFrame> {
    let mut workbook = open_workbook_auto(file_path)?;
    let range = workbook.worksheet_range(sheet_name)?;
    excel_range_to_frame(&range, sheet_name)
}

/// Download an XLSX/XLS workbook and read the named sheet into a DataFrame.
pub(super) fn fetch_excel_frame(url: &str, sheet_name: &str) -> RSMortResult<DataFrame> {
    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(MortError::invalid_data(format!(
            "failed to fetch workbook from {url}: HTTP {}",
            response.status()
        )));
    }
    let bytes = response.bytes()?;
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let sheet_names = workbook.sheet_names().to_owned();
    if !sheet_names.iter().any(|n| n == sheet_name) {
        return Err(MortError::invalid_data(format!(
            "sheet '{sheet_name}' not found in workbook at {url}"
        )));
    }
    let range = workbook.worksheet_range(sheet_name)?;
    excel_range_to_frame(&range, sheet_name)
}

/// Read the named sheet of a local ODS file into a DataFrame.
pub(super) fn read_ods_frame(file_path: &str, sheet_name: &str) -> RSMortResult<DataFrame> {
    let workbook = read_ods(file_path)?;

    let sheet = (0..workbook.num_sheets())
        .map(|i| workbook.sheet(i))
        .find(|sheet| sheet.name() == sheet_name)
        .ok_or_else(|| {
            MortError::invalid_data(format!("sheet '{sheet_name}' not found in {file_path}"))
        })?;

    let (max_row, _) = sheet.used_grid_size();
    if max_row < 1 {
        return Err(MortError::invalid_data(format!("sheet '{sheet_name}' is empty")));
    }

    let headers = parse_ods_headers(sheet, 0);
    let columns = parse_ods_data(sheet, 1, headers.len());
    columns_to_frame(&headers, columns)
}

// ========= ODS Using spreadsheet_ods =========

pub(super) fn parse_ods_headers(
    sheet: &spreadsheet_ods::Sheet,
    header_row: u32, // Base 0 - identify which row is header
) -> Vec<String> {
    let mut column_names = Vec::new();
    let mut col = 0;

    loop {
        let col_name = match sheet.value(header_row, col) {
            Value::Text(s) if !s.trim().is_empty() => s.trim().to_lowercase(),
            Value::Number(f) => f.to_string(),
            _ => break,
        };
        column_names.push(col_name);
        col += 1;
    }

    column_names
}

pub(super) fn parse_ods_data(
    sheet: &spreadsheet_ods::Sheet,
    start_row: u32,
    ncols: usize,
) -> Vec<Vec<SheetCell>> {
    let mut columns: Vec<Vec<SheetCell>> = vec![Vec::new(); ncols];
    let mut row_num = start_row;

    loop {
        let row: Vec<SheetCell> = (0..ncols)
            .map(|col| ods_cell(sheet.value(row_num, col as u32)))
            .collect();

        // A fully blank row ends the table
        if row.iter().all(|cell| *cell == SheetCell::Empty) {
            break;
        }

        for (column, cell) in columns.iter_mut().zip(row) {
            column.push(cell);
        }
        row_num += 1;
    }

    columns
}

fn ods_cell(value: &Value) -> SheetCell {
    match value {
        Value::Number(f) => SheetCell::Number(*f),
        Value::Text(s) if s.trim().is_empty() => SheetCell::Empty,
        Value::Text(s) => text_cell(s),
        Value::Boolean(b) => SheetCell::Number(if *b { 1.0 } else { 0.0 }),
        Value::Empty => SheetCell::Empty,
        other => SheetCell::Text(format!("{other:?}")),
    }
}

// ========= XLSX - Using Calamine =========

fn excel_range_to_frame(range: &Range<Data>, sheet_name: &str) -> RSMortResult<DataFrame> {
    if range.is_empty() {
        return Err(MortError::invalid_data(format!("sheet '{sheet_name}' is empty")));
    }
    let headers = parse_excel_headers(range, 0)?;
    let columns = parse_excel_data(range, 1, headers.len());
    columns_to_frame(&headers, columns)
}

pub(super) fn parse_excel_headers(
    range: &Range<Data>,
    start_row: usize, // Base 0
) -> RSMortResult<Vec<String>> {
    if range.get((start_row, 0)).is_none() {
        return Err(MortError::invalid_data("header row is empty"));
    }

    let mut headers = Vec::new();
    let mut col = 0;

    loop {
        match range.get((start_row, col)) {
            Some(Data::String(s)) if !s.trim().is_empty() => headers.push(s.trim().to_lowercase()),
            Some(Data::Empty) | None => return Ok(headers),
            Some(Data::String(_)) => return Ok(headers),
            Some(other) => headers.push(other.to_string()),
        }
        col += 1;
    }
}

pub(super) fn parse_excel_data(range: &Range<Data>, start_row: usize, ncols: usize) -> Vec<Vec<SheetCell>> {
    let mut columns: Vec<Vec<SheetCell>> = vec![Vec::new(); ncols];
    let mut row_num = start_row;

    loop {
        let row: Vec<SheetCell> = (0..ncols)
            .map(|col| excel_cell(range.get((row_num, col))))
            .collect();

        // A fully blank row ends the table
        if row.iter().all(|cell| *cell == SheetCell::Empty) {
            break;
        }

        for (column, cell) in columns.iter_mut().zip(row) {
            column.push(cell);
        }
        row_num += 1;
    }

    columns
}

fn excel_cell(cell: Option<&Data>) -> SheetCell {
    match cell {
        Some(Data::Float(f)) => SheetCell::Number(*f),
        Some(Data::Int(v)) => SheetCell::Number(*v as f64),
        Some(Data::Bool(b)) => SheetCell::Number(if *b { 1.0 } else { 0.0 }),
        Some(Data::String(s)) if s.trim().is_empty() => SheetCell::Empty,
        Some(Data::String(s)) => text_cell(s),
        Some(Data::Empty) | None => SheetCell::Empty,
        Some(other) => SheetCell::Text(other.to_string()),
    }
}

// ========= Shared =========

/// Numbers stored as text ("1,234") are common in published population tables.
fn text_cell(s: &str) -> SheetCell {
    let trimmed = s.trim();
    match trimmed.replace(',', "").parse::<f64>() {
        Ok(v) => SheetCell::Number(v),
        Err(_) => SheetCell::Text(trimmed.to_string()),
    }
}

/// Build a DataFrame from parsed columns.
///
/// A column whose non-empty cells are all numeric becomes `f64` (empty cells become
/// null); any other column becomes a string column.
pub(super) fn columns_to_frame(headers: &[String], columns: Vec<Vec<SheetCell>>) -> RSMortResult<DataFrame> {
    if columns.is_empty() || columns[0].is_empty() {
        return Err(MortError::invalid_data("no data rows found in sheet"));
    }

    let mut frame_columns = Vec::with_capacity(headers.len());
    for (name, cells) in headers.iter().zip(columns) {
        let all_numeric = cells
            .iter()
            .all(|c| matches!(c, SheetCell::Number(_) | SheetCell::Empty));

        let series = if all_numeric {
            let values: Vec<Option<f64>> = cells
                .into_iter()
                .map(|c| match c {
                    SheetCell::Number(v) => Some(v),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        } else {
            let values: Vec<Option<String>> = cells
                .into_iter()
                .map(|c| match c {
                    SheetCell::Number(v) => Some(v.to_string()),
                    SheetCell::Text(s) => Some(s),
                    SheetCell::Empty => None,
                })
                .collect();
            Series::new(name.into(), values)
        };
        frame_columns.push(series.into_column());
    }

    Ok(DataFrame::new(frame_columns)?)
}
