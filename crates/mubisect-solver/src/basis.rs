/// Per-variable status in the native basis convention.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisStatus {
    /// Nonbasic at lower bound (code 0)
    LowerBound,
    /// Nonbasic at upper bound (code 1)
    UpperBound,
    /// Superbasic (code 2); accepted on input, never produced here
    Superbasic,
    /// Basic (code 3)
    Basic,
}

impl BasisStatus {
    pub fn code(self) -> i32 {
        match self {
            BasisStatus::LowerBound => 0,
            BasisStatus::UpperBound => 1,
            BasisStatus::Superbasic => 2,
            BasisStatus::Basic => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(BasisStatus::LowerBound),
            1 => Some(BasisStatus::UpperBound),
            2 => Some(BasisStatus::Superbasic),
            3 => Some(BasisStatus::Basic),
            _ => None,
        }
    }
}

/// One status per structural variable followed by one per slack, the
/// layout warm starts are exchanged in. A solve updates it in place, so
/// the vector that comes back from one growth rate seeds the next.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basis {
    pub statuses: Vec<BasisStatus>,
}

impl Basis {
    /// The all-at-lower-bound vector a cold start begins from.
    pub fn cold(len: usize) -> Self {
        Self {
            statuses: vec![BasisStatus::LowerBound; len],
        }
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn num_basic(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s == BasisStatus::Basic)
            .count()
    }

    pub fn codes(&self) -> Vec<i32> {
        self.statuses.iter().map(|s| s.code()).collect()
    }

    pub fn from_codes(codes: &[i32]) -> Option<Self> {
        let statuses = codes
            .iter()
            .map(|&c| BasisStatus::from_code(c))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { statuses })
    }
}
