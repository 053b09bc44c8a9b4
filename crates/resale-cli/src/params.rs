use anyhow::{bail, Context, Result};
use resale_columnar::YearMonth;

pub const TOWNS: [&str; 10] = [
    "BEDOK",
    "BUKIT PANJANG",
    "CLEMENTI",
    "CHOA CHU KANG",
    "HOUGANG",
    "JURONG WEST",
    "PASIR RIS",
    "TAMPINES",
    "WOODLANDS",
    "YISHUN",
];

/// Query parameters encoded in a matriculation identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryParams {
    pub start: YearMonth,
    pub town: &'static str,
}

impl QueryParams {
    /// Decode the three digits before the trailing check letter.
    ///
    /// Counting from the end: the digit at `len - 2` is the year, `len - 3` the start month and
    /// `len - 4` the town.
    pub fn from_matric(id: &str) -> Result<Self> {
        let chars: Vec<char> = id.trim().chars().collect();
        if chars.len() < 4 {
            bail!("matriculation id `{id}` is too short: need at least 4 characters");
        }
        let digit = |from_end: usize, what: &str| -> Result<u32> {
            let c = chars[chars.len() - from_end];
            c.to_digit(10)
                .with_context(|| format!("matriculation id `{id}`: {what} digit `{c}` is not 0-9"))
        };

        let year = match digit(2, "year")? {
            d @ 0..=3 => 2020 + d,
            d => 2010 + d,
        };
        let start_month = match digit(3, "month")? {
            0 => 10,
            d => d,
        };
        let town = TOWNS[digit(4, "town")? as usize];
        let start = YearMonth::new(year as u16, start_month as u8)
            .with_context(|| format!("matriculation id `{id}`: no month {start_month}"))?;

        Ok(Self { start, town })
    }

    pub fn year(&self) -> u16 {
        self.start.year()
    }

    pub fn start_month(&self) -> u8 {
        self.start.month()
    }

    /// The start month and the month after it.
    pub fn range(&self) -> (YearMonth, YearMonth) {
        (self.start, self.start.succ())
    }
}
