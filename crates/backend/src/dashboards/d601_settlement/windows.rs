use chrono::NaiveDate;
use contracts::usecases::u601_settlement_report::DateWindow;
use std::str::FromStr;

use crate::shared::catalog::Window;
use crate::shared::dates::{month_bounds, parse_year_month, previous_month};
use crate::shared::errors::PipelineError;

/// Измерение группировки отчёта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Entity,
    Tier,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Entity => "entity",
            Dimension::Tier => "tier",
        }
    }

    /// Absent selector is an error, never a silent default
    pub fn from_request(value: Option<&str>) -> Result<Self, PipelineError> {
        match value {
            Some(v) => v.parse(),
            None => Err(PipelineError::InvalidDimension(
                "dimension is required (entity | tier)".to_string(),
            )),
        }
    }
}

impl FromStr for Dimension {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entity" | "dealer" | "nsc_code" | "id" | "经销商id" => Ok(Dimension::Entity),
            "tier" | "level" | "层级" => Ok(Dimension::Tier),
            other => Err(PipelineError::InvalidDimension(format!(
                "unknown dimension '{}', expected entity | tier",
                other
            ))),
        }
    }
}

/// Current and prior windows of a run; either may be absent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportWindows {
    pub current: Option<DateWindow>,
    pub prior: Option<DateWindow>,
}

impl ReportWindows {
    pub fn new(current: Option<DateWindow>, prior: Option<DateWindow>) -> Result<Self, PipelineError> {
        for window in [current, prior].into_iter().flatten() {
            if window.start > window.end {
                return Err(PipelineError::InvalidWindow(format!(
                    "start {} is after end {}",
                    window.start, window.end
                )));
            }
        }
        if let (Some(c), Some(p)) = (current, prior) {
            if c.overlaps(&p) {
                return Err(PipelineError::InvalidWindow(format!(
                    "current {}..{} overlaps prior {}..{}",
                    c.start, c.end, p.start, p.end
                )));
            }
        }
        Ok(Self { current, prior })
    }

    /// T = месяц якоря, T-1 = предыдущий календарный месяц
    pub fn from_anchor_month(anchor: &str) -> Result<Self, PipelineError> {
        let invalid = || PipelineError::InvalidWindow(format!("malformed anchor month '{}'", anchor));
        let (year, month) = parse_year_month(anchor).ok_or_else(invalid)?;
        let (start, end) = month_bounds(year, month).ok_or_else(invalid)?;
        let (prior_year, prior_month) = previous_month(start);
        let (prior_start, prior_end) = month_bounds(prior_year, prior_month).ok_or_else(invalid)?;
        Self::new(
            Some(DateWindow::new(start, end)),
            Some(DateWindow::new(prior_start, prior_end)),
        )
    }

    /// Explicit windows or an anchor month, not both
    pub fn resolve(
        current: Option<DateWindow>,
        prior: Option<DateWindow>,
        anchor_month: Option<&str>,
    ) -> Result<Self, PipelineError> {
        match anchor_month {
            Some(_) if current.is_some() || prior.is_some() => Err(PipelineError::InvalidWindow(
                "anchor_month cannot be combined with explicit windows".to_string(),
            )),
            Some(anchor) => Self::from_anchor_month(anchor),
            None => Self::new(current, prior),
        }
    }

    pub fn contains(&self, window: Window, date: NaiveDate) -> bool {
        match window {
            Window::Total => true,
            Window::Current => self.current.map_or(false, |w| w.contains(date)),
            Window::Prior => self.prior.map_or(false, |w| w.contains(date)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_dimension_selector() {
        assert_eq!("Tier".parse::<Dimension>().unwrap(), Dimension::Tier);
        assert_eq!("层级".parse::<Dimension>().unwrap(), Dimension::Tier);
        assert_eq!("NSC_CODE".parse::<Dimension>().unwrap(), Dimension::Entity);
        assert!(matches!(
            "region".parse::<Dimension>(),
            Err(PipelineError::InvalidDimension(_))
        ));
        assert!(matches!(
            Dimension::from_request(None),
            Err(PipelineError::InvalidDimension(_))
        ));
    }

    #[test]
    fn test_anchor_month_across_year() {
        let windows = ReportWindows::from_anchor_month("2024-01").unwrap();
        assert_eq!(windows.current, Some(DateWindow::new(d(2024, 1, 1), d(2024, 1, 31))));
        assert_eq!(windows.prior, Some(DateWindow::new(d(2023, 12, 1), d(2023, 12, 31))));
        assert!(windows.contains(Window::Prior, d(2023, 12, 31)));
        assert!(!windows.contains(Window::Current, d(2024, 2, 1)));
        assert!(windows.contains(Window::Total, d(2020, 5, 5)));
    }

    #[test]
    fn test_invalid_windows() {
        let jan = DateWindow::new(d(2024, 1, 1), d(2024, 1, 31));
        let overlapping = DateWindow::new(d(2024, 1, 20), d(2024, 2, 10));
        let reversed = DateWindow::new(d(2024, 3, 1), d(2024, 2, 1));

        assert!(matches!(
            ReportWindows::new(Some(jan), Some(overlapping)),
            Err(PipelineError::InvalidWindow(_))
        ));
        assert!(ReportWindows::new(Some(reversed), None).is_err());
        assert!(ReportWindows::resolve(Some(jan), None, Some("2024-02")).is_err());
        assert!(ReportWindows::from_anchor_month("2024-13").is_err());
        assert_eq!(
            ReportWindows::resolve(None, None, None).unwrap(),
            ReportWindows::default()
        );
    }
}
