//! Bar-chart series derived from a query result.

use crate::error::{DeskError, Result};
use crate::storage::dataset::{Dataset, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct BarGroupData {
    pub label: String,
    /// (series index, value) pairs; null cells have no bar.
    pub bars: Vec<(usize, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChartData {
    pub title: String,
    pub series: Vec<String>,
    pub groups: Vec<BarGroupData>,
}

impl BarChartData {
    /// Every numeric column becomes a series and every row a group of bars.
    /// Rows are labelled by the first non-numeric column, or by their index.
    pub fn from_dataset(dataset: &Dataset, title: impl Into<String>) -> Result<Self> {
        let numeric: Vec<usize> = dataset
            .schema
            .columns
            .iter()
            .enumerate()
            .filter(|(i, c)| c.data_type.is_numeric() || column_is_numeric(dataset, *i))
            .map(|(i, _)| i)
            .collect();

        if numeric.is_empty() {
            return Err(DeskError::NothingToChart);
        }

        let label_column = (0..dataset.column_count()).find(|i| !numeric.contains(i));

        let series = numeric
            .iter()
            .map(|&i| dataset.schema.columns[i].name.clone())
            .collect();

        let groups = dataset
            .rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let label = match label_column.and_then(|i| row.get(i)) {
                    Some(Value::Null) | None => row_idx.to_string(),
                    Some(v) => v.to_string(),
                };
                let bars = numeric
                    .iter()
                    .enumerate()
                    .filter_map(|(series_idx, &col)| {
                        row.get(col)
                            .and_then(Value::as_float)
                            .map(|v| (series_idx, v))
                    })
                    .collect();
                BarGroupData { label, bars }
            })
            .collect();

        Ok(Self {
            title: title.into(),
            series,
            groups,
        })
    }

    pub fn max_value(&self) -> f64 {
        self.groups
            .iter()
            .flat_map(|g| g.bars.iter().map(|(_, v)| *v))
            .fold(0.0, f64::max)
    }

    /// Plain-text rendering, one line per bar, scaled to `width` characters.
    pub fn render_text(&self, width: usize) -> String {
        let max = self.max_value();
        let label_width = self
            .groups
            .iter()
            .map(|g| g.label.len())
            .chain(self.series.iter().map(|s| s.len()))
            .max()
            .unwrap_or(0);

        let mut out = format!("{}\n", self.title);
        for group in &self.groups {
            for (series_idx, value) in &group.bars {
                let len = if max > 0.0 {
                    ((value.max(0.0) / max) * width as f64).round() as usize
                } else {
                    0
                };
                let label = if self.series.len() > 1 {
                    format!("{} {}", group.label, self.series[*series_idx])
                } else {
                    group.label.clone()
                };
                out.push_str(&format!(
                    "{:<w$} | {} {}\n",
                    label,
                    "#".repeat(len),
                    value,
                    w = label_width * 2 + 1
                ));
            }
        }
        out
    }
}

// SQLite expressions such as `count(*)` carry no declared type, so a column
// whose values are all numbers (or null) is treated as numeric too.
fn column_is_numeric(dataset: &Dataset, index: usize) -> bool {
    let mut seen = false;
    for row in &dataset.rows {
        match row.get(index) {
            Some(Value::Integer(_)) | Some(Value::Float(_)) => seen = true,
            Some(Value::Null) | None => {}
            Some(_) => return false,
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::dataset::{Column, DataType, Row, Schema};

    fn sales() -> Dataset {
        let schema = Schema::new(vec![
            Column::new("region", DataType::String),
            Column::new("units", DataType::Integer),
            Column::new("revenue", DataType::Float),
        ]);
        Dataset::with_rows(
            "sales",
            schema,
            vec![
                Row::new(vec![
                    Value::String("north".to_string()),
                    Value::Integer(10),
                    Value::Float(99.5),
                ]),
                Row::new(vec![
                    Value::String("south".to_string()),
                    Value::Null,
                    Value::Float(12.0),
                ]),
            ],
        )
    }

    #[test]
    fn test_series_and_labels() {
        let chart = BarChartData::from_dataset(&sales(), "Sales").unwrap();

        assert_eq!(chart.series, vec!["units".to_string(), "revenue".to_string()]);
        assert_eq!(chart.groups.len(), 2);
        assert_eq!(chart.groups[0].label, "north");
        assert_eq!(chart.groups[0].bars, vec![(0, 10.0), (1, 99.5)]);
        assert_eq!(chart.groups[1].bars, vec![(1, 12.0)]);
        assert_eq!(chart.max_value(), 99.5);
    }

    #[test]
    fn test_index_labels_without_text_column() {
        let schema = Schema::new(vec![Column::new("n", DataType::String)]);
        let dataset = Dataset::with_rows(
            "q",
            schema,
            vec![Row::new(vec![Value::Integer(3)]), Row::new(vec![Value::Integer(5)])],
        );

        let chart = BarChartData::from_dataset(&dataset, "q").unwrap();
        assert_eq!(chart.groups[0].label, "0");
        assert_eq!(chart.groups[1].label, "1");
    }

    #[test]
    fn test_no_numeric_column() {
        let schema = Schema::new(vec![Column::new("name", DataType::String)]);
        let dataset = Dataset::with_rows(
            "q",
            schema,
            vec![Row::new(vec![Value::String("a".to_string())])],
        );

        assert!(matches!(
            BarChartData::from_dataset(&dataset, "q"),
            Err(DeskError::NothingToChart)
        ));
    }

    #[test]
    fn test_render_text_scales_bars() {
        let chart = BarChartData::from_dataset(&sales(), "Sales").unwrap();
        let text = chart.render_text(10);

        assert!(text.starts_with("Sales\n"));
        assert!(text.contains("########## 99.5"));
        assert_eq!(text.lines().count(), 4);
    }
}
