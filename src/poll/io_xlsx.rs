// Survey exports saved as Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::poll::{io_common::simplify_file_name, *};

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> BPollResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    let wrange = if let Some(worksheet_name) = worksheet_name_o {
        workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name,
            })?
            .context(OpeningExcelSnafu { path })?
    } else {
        workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?
    };
    Ok(wrange)
}

fn read_cell(cell: &DataType, lineno: usize) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Error(e) => {
            warn!("read_cell: line {}: error cell {:?}, reading it as empty", lineno, e);
            String::new()
        }
        // Numbers and dates are read the way they are displayed.
        x => x.to_string(),
    }
}

/// Reads a worksheet as a grid of cells. By default, the first worksheet is used.
pub fn read_xlsx_grid(
    path: &str,
    worksheet_name_o: Option<&str>,
) -> BPollResult<Vec<Vec<String>>> {
    let wrange = get_range(path, worksheet_name_o)?;
    let grid: Vec<Vec<String>> = wrange
        .rows()
        .enumerate()
        .map(|(idx, row)| row.iter().map(|c| read_cell(c, idx + 1)).collect())
        .collect();
    info!(
        "read_xlsx_grid: {}: {} rows",
        simplify_file_name(path),
        grid.len()
    );
    if grid.is_empty() {
        return Err(Box::new(PollError::EmptyExcel {}));
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Float(5.0), 1), "5");
        assert_eq!(read_cell(&DataType::Float(2.5), 1), "2.5");
        assert_eq!(read_cell(&DataType::Int(3), 1), "3");
        assert_eq!(read_cell(&DataType::String("Red, Blue".to_string()), 1), "Red, Blue");
        assert_eq!(read_cell(&DataType::Empty, 1), "");
    }

    #[test]
    fn missing_file() {
        let res = read_xlsx_grid("/nonexistent/survey.xlsx", None);
        assert!(matches!(res.map_err(|e| *e), Err(PollError::OpeningExcel { .. })));
    }
}
