pub use crate::aggregate::SurveyTable;
pub use crate::config::*;

/// A builder for survey tables, when the responses do not come from an export.
///
/// ```
/// pub use poll_tally::builder::SurveyBuilder;
/// pub use poll_tally::{compute_topline, AggregateRules, ViewMode};
/// # use poll_tally::TallyErrors;
///
/// let mut builder = SurveyBuilder::new(&["Timestamp".to_string(), "Vote".to_string()])?;
///
/// builder.add_response(&["t1".to_string(), "Yes".to_string()])?;
/// builder.add_response(&["t2".to_string(), "".to_string()])?;
///
/// let table = builder.build();
/// let topline = compute_topline(&table.rows, "Vote", ViewMode::Absolute, &AggregateRules::default());
/// assert_eq!(topline.labels, vec!["Yes", "No Response"]);
///
/// # Ok::<(), TallyErrors>(())
/// ```
pub struct SurveyBuilder {
    pub(crate) _headers: Vec<String>,
    pub(crate) _responses: Vec<Vec<String>>,
}

impl SurveyBuilder {
    pub fn new(headers: &[String]) -> Result<SurveyBuilder, TallyErrors> {
        if headers.is_empty() {
            return Err(TallyErrors::EmptyInput);
        }
        Ok(SurveyBuilder {
            _headers: headers.to_vec(),
            _responses: Vec::new(),
        })
    }

    /// Adds the answers of one respondent, in the order of the headers.
    ///
    /// Missing answers at the end are left empty.
    pub fn add_response(&mut self, answers: &[String]) -> Result<(), TallyErrors> {
        if answers.len() > self._headers.len() {
            return Err(TallyErrors::CsvParse {
                line: self._responses.len() as u64 + 2,
                message: format!(
                    "{} answers for {} questions",
                    answers.len(),
                    self._headers.len()
                ),
            });
        }
        self._responses.push(answers.to_vec());
        Ok(())
    }

    /// The same response several times.
    pub fn add_responses(&mut self, answers: &[String], count: u32) -> Result<(), TallyErrors> {
        for _ in 0..count {
            self.add_response(answers)?;
        }
        Ok(())
    }

    /// The table as it would be read from an export.
    pub fn grid(&self) -> Vec<Vec<String>> {
        let mut grid = vec![self._headers.clone()];
        grid.extend(self._responses.iter().cloned());
        grid
    }

    pub fn build(&self) -> SurveyTable {
        SurveyTable::from_grid(&self.grid())
    }

    /// Writes the table as a CSV export.
    pub fn to_csv(&self) -> Result<String, TallyErrors> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for (idx, row) in self.grid().iter().enumerate() {
            wtr.write_record(row).map_err(|e| TallyErrors::CsvParse {
                line: idx as u64 + 1,
                message: e.to_string(),
            })?;
        }
        let bytes = wtr.into_inner().map_err(|e| TallyErrors::CsvParse {
            line: 0,
            message: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| TallyErrors::CsvParse {
            line: 0,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ingest;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn export_and_ingest() {
        let mut b = SurveyBuilder::new(&strings(&["Timestamp", "Color"])).unwrap();
        b.add_responses(&strings(&["t", "Red, Blue"]), 4).unwrap();
        b.add_response(&strings(&["t", "Green"])).unwrap();
        let csv = b.to_csv().unwrap();
        assert!(csv.starts_with("Timestamp,Color\nt,\"Red, Blue\"\n"));

        let polls = ingest(&csv, &IngestRules::default());
        assert_eq!(polls.len(), 1);
        let options: Vec<(String, u64)> = polls[0]
            .results
            .iter()
            .map(|r| (r.option.clone(), r.value))
            .collect();
        assert_eq!(
            options,
            vec![("Red".to_string(), 4), ("Blue".to_string(), 4)]
        );
    }

    #[test]
    fn too_many_answers() {
        let mut b = SurveyBuilder::new(&strings(&["Q"])).unwrap();
        assert!(b.add_response(&strings(&["a", "b"])).is_err());
        assert_eq!(b.build().rows.len(), 0);
        assert!(SurveyBuilder::new(&[]).is_err());
    }
}
