use serde::{Deserialize, Serialize};

/// Parse a filing-year cell. Accepts integers and integral decimals
/// ("2021", " 2021 ", "2021.0"); anything else is `None`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    let value: f64 = raw.parse().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearRangeMode {
    /// No range check.
    Off,
    /// Keep out-of-range rows, count them.
    #[default]
    Flag,
    /// Drop out-of-range rows, count them.
    Reject,
}

/// What to do with a coerced year outside `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearPolicy {
    pub mode: YearRangeMode,
    pub min: i32,
    pub max: i32,
}

impl Default for YearPolicy {
    fn default() -> Self {
        Self {
            mode: YearRangeMode::Flag,
            min: 1950,
            max: 2100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearCheck {
    Ok,
    Flagged,
    Rejected,
}

impl YearPolicy {
    pub fn reject(min: i32, max: i32) -> Self {
        Self { mode: YearRangeMode::Reject, min, max }
    }

    pub fn in_range(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }

    pub fn check(&self, year: i32) -> YearCheck {
        match self.mode {
            YearRangeMode::Off => YearCheck::Ok,
            _ if self.in_range(year) => YearCheck::Ok,
            YearRangeMode::Flag => YearCheck::Flagged,
            YearRangeMode::Reject => YearCheck::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integers_and_integral_decimals() {
        assert_eq!(parse_year("2021"), Some(2021));
        assert_eq!(parse_year(" 2019 "), Some(2019));
        assert_eq!(parse_year("2021.0"), Some(2021));
    }

    #[test]
    fn rejects_non_numeric_and_fractional() {
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("deux mille"), None);
        assert_eq!(parse_year("2021.5"), None);
        assert_eq!(parse_year("NaN"), None);
        assert_eq!(parse_year("inf"), None);
    }

    #[test]
    fn policy_modes() {
        let flag = YearPolicy::default();
        assert_eq!(flag.check(2020), YearCheck::Ok);
        assert_eq!(flag.check(1899), YearCheck::Flagged);

        let reject = YearPolicy::reject(2000, 2030);
        assert_eq!(reject.check(2031), YearCheck::Rejected);
        assert_eq!(reject.check(2000), YearCheck::Ok);

        let off = YearPolicy { mode: YearRangeMode::Off, ..YearPolicy::default() };
        assert_eq!(off.check(-5), YearCheck::Ok);
    }
}
