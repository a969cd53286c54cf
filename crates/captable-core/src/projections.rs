use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CapTableError;
use crate::types::{Money, Year};

/// Operating metrics the projection collaborator supplies per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Arr,
    Ebitda,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Arr => "ARR",
            Metric::Ebitda => "EBITDA",
        }
    }
}

/// One projected year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionYear {
    pub year: Year,
    pub arr: Money,
    pub ebitda: Money,
}

/// Year-indexed ARR/EBITDA values produced by the revenue projector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ProjectionYear>", into = "Vec<ProjectionYear>")]
pub struct ProjectionSeries {
    years: BTreeMap<Year, ProjectionYear>,
}

impl From<Vec<ProjectionYear>> for ProjectionSeries {
    fn from(rows: Vec<ProjectionYear>) -> Self {
        // Later rows for the same year replace earlier ones.
        let years = rows.into_iter().map(|row| (row.year, row)).collect();
        Self { years }
    }
}

impl From<ProjectionSeries> for Vec<ProjectionYear> {
    fn from(series: ProjectionSeries) -> Self {
        series.years.into_values().collect()
    }
}

impl ProjectionSeries {
    pub fn new(rows: Vec<ProjectionYear>) -> Self {
        rows.into()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = &ProjectionYear> {
        self.years.values()
    }

    /// Strict lookup: a missing year is an error.
    pub fn value(&self, year: Year, metric: Metric) -> Result<Money, CapTableError> {
        self.years
            .get(&year)
            .map(|row| match metric {
                Metric::Arr => row.arr,
                Metric::Ebitda => row.ebitda,
            })
            .ok_or_else(|| CapTableError::MissingInput {
                metric: metric.label().to_string(),
                year,
            })
    }

    /// Lenient lookup: a missing year resolves to zero and is reported as a warning.
    pub fn value_or_zero(&self, year: Year, metric: Metric, warnings: &mut Vec<String>) -> Money {
        match self.value(year, metric) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("{e}");
                warnings.push(e.to_string());
                Decimal::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series() -> ProjectionSeries {
        ProjectionSeries::new(vec![
            ProjectionYear {
                year: 2026,
                arr: dec!(12_000_000),
                ebitda: dec!(-1_000_000),
            },
            ProjectionYear {
                year: 2030,
                arr: dec!(39_500_000),
                ebitda: dec!(8_600_000),
            },
        ])
    }

    #[test]
    fn test_lookup_present_year() {
        let s = series();
        assert_eq!(s.value(2026, Metric::Arr).unwrap(), dec!(12_000_000));
        assert_eq!(s.value(2030, Metric::Ebitda).unwrap(), dec!(8_600_000));
    }

    #[test]
    fn test_missing_year_is_zero_with_warning() {
        let s = series();
        let mut warnings = Vec::new();
        let v = s.value_or_zero(2028, Metric::Arr, &mut warnings);
        assert_eq!(v, Decimal::ZERO);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ARR"));
        assert!(warnings[0].contains("2028"));
    }

    #[test]
    fn test_deserialize_from_row_list() {
        let json = r#"[
            {"year": 2030, "arr": "100", "ebitda": "20"},
            {"year": 2026, "arr": "50", "ebitda": "-5"}
        ]"#;
        let s: ProjectionSeries = serde_json::from_str(json).unwrap();
        let years: Vec<Year> = s.years().map(|y| y.year).collect();
        assert_eq!(years, vec![2026, 2030]);
        assert_eq!(s.value(2026, Metric::Ebitda).unwrap(), dec!(-5));
    }
}
