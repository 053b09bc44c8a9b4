use std::fmt;
use std::str::FromStr;

/// One resale transaction as delivered by a row source.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleRecord {
    /// `YYYY-MM`
    pub month: String,
    pub town: String,
    pub floor_area: f64,
    pub resale_price: f64,
}

impl SaleRecord {
    pub fn new(
        month: impl Into<String>,
        town: impl Into<String>,
        floor_area: f64,
        resale_price: f64,
    ) -> Self {
        Self {
            month: month.into(),
            town: town.into(),
            floor_area,
            resale_price,
        }
    }
}

/// A calendar month, ordered chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: u16,
    month: u8,
}

impl YearMonth {
    pub fn new(year: u16, month: u8) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(Self { year, month })
    }

    pub fn year(self) -> u16 {
        self.year
    }

    pub fn month(self) -> u8 {
        self.month
    }

    /// The following calendar month; December rolls into January.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseYearMonthError;

impl fmt::Display for ParseYearMonthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected YYYY-MM")
    }
}

impl std::error::Error for ParseYearMonthError {}

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(ParseYearMonthError);
        }
        if !bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit) {
            return Err(ParseYearMonthError);
        }
        let year: u16 = s[..4].parse().map_err(|_| ParseYearMonthError)?;
        let month: u8 = s[5..].parse().map_err(|_| ParseYearMonthError)?;
        Self::new(year, month).ok_or(ParseYearMonthError)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
