// Primitives for reading CSV files.

use crate::poll::{io_common::simplify_file_name, *};

/// The raw content of an export. The parsing itself is left to the library, which tolerates
/// malformed records.
pub fn read_csv_content(path: &str) -> BPollResult<Vec<u8>> {
    let content = fs::read(path).context(OpeningFileSnafu { path })?;
    info!(
        "read_csv_content: {}: {} bytes",
        simplify_file_name(path),
        content.len()
    );
    if content.is_empty() {
        return Err(Box::new(PollError::EmptyInputFile {
            path: path.to_string(),
        }));
    }
    Ok(content)
}

/// Reads the export as a grid of cells.
pub fn read_csv_grid(path: &str) -> BPollResult<Vec<Vec<String>>> {
    let content = read_csv_content(path)?;
    let (grid, warnings) = parse_grid_bytes(&content);
    for w in warnings.iter() {
        warn!("read_csv_grid: {}: {}", simplify_file_name(path), w);
    }
    debug!("read_csv_grid: {} rows", grid.len());
    Ok(grid)
}

/// Writes a grid back as CSV text.
pub fn grid_to_csv(grid: &[Vec<String>]) -> BPollResult<String> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in grid.iter() {
        wtr.write_record(row).context(WritingCsvSnafu {})?;
    }
    let bytes = wtr.into_inner().map_err(|e| {
        Box::new(PollError::WritingCsv {
            source: csv::Error::from(e.into_error()),
        })
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
