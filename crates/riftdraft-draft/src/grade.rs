// Letter grades for scored drafts, with an explicit rank order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sequence::Side;

/// Draft grade. Variants are declared worst-first so the derived `Ord`
/// is the rank order: `F < D- < D < ... < A+ < S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Grade {
    F,
    DMinus,
    D,
    DPlus,
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    AMinus,
    A,
    APlus,
    S,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised grade `{0}`")]
pub struct ParseGradeError(pub String);

impl Grade {
    pub const ALL: [Grade; 14] = [
        Grade::F,
        Grade::DMinus,
        Grade::D,
        Grade::DPlus,
        Grade::CMinus,
        Grade::C,
        Grade::CPlus,
        Grade::BMinus,
        Grade::B,
        Grade::BPlus,
        Grade::AMinus,
        Grade::A,
        Grade::APlus,
        Grade::S,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::F => "F",
            Grade::DMinus => "D-",
            Grade::D => "D",
            Grade::DPlus => "D+",
            Grade::CMinus => "C-",
            Grade::C => "C",
            Grade::CPlus => "C+",
            Grade::BMinus => "B-",
            Grade::B => "B",
            Grade::BPlus => "B+",
            Grade::AMinus => "A-",
            Grade::A => "A",
            Grade::APlus => "A+",
            Grade::S => "S",
        }
    }

    /// Position in the rank table, 0 for `F`.
    pub fn rank(self) -> usize {
        self as usize
    }
}

impl FromStr for Grade {
    type Err = ParseGradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| ParseGradeError(s.to_string()))
    }
}

impl TryFrom<String> for Grade {
    type Error = ParseGradeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Grade> for String {
    fn from(g: Grade) -> Self {
        g.as_str().to_string()
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of comparing the two sides' grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Winner(Side),
    Even,
}

pub fn compare_grades(blue: Grade, red: Grade) -> Verdict {
    match blue.cmp(&red) {
        std::cmp::Ordering::Greater => Verdict::Winner(Side::Blue),
        std::cmp::Ordering::Less => Verdict::Winner(Side::Red),
        std::cmp::Ordering::Equal => Verdict::Even,
    }
}
