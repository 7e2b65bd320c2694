use serde::{Deserialize, Serialize};

pub const SCORE_MIN: i32 = -100;
pub const SCORE_MAX: i32 = 100;
pub const DIMENSIONS: usize = 5;

/// One axis of the sustainability rating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    /// Pollution of air, water and ground, waste, toxic releases (without greenhouse gases).
    Environment,
    /// Greenhouse gas emissions and other climate-active actions such as land-use change.
    Climate,
    /// Working conditions, fair pay, child labour, treatment of suppliers.
    Society,
    /// Impact on the consumer's health.
    Health,
    /// Value for money and longevity.
    Economy,
}

impl Dimension {
    pub const ALL: [Dimension; DIMENSIONS] = [
        Dimension::Environment,
        Dimension::Climate,
        Dimension::Society,
        Dimension::Health,
        Dimension::Economy,
    ];

    pub fn index(&self) -> usize {
        match self {
            Dimension::Environment => 0,
            Dimension::Climate => 1,
            Dimension::Society => 2,
            Dimension::Health => 3,
            Dimension::Economy => 4,
        }
    }
}

/// Sustainability rating of a scorable asset. Every dimension is in `[-100, 100]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub environment: i32,
    pub climate: i32,
    pub society: i32,
    pub health: i32,
    pub economy: i32,
}

impl Score {
    pub const ZERO: Score = Score {
        environment: 0,
        climate: 0,
        society: 0,
        health: 0,
        economy: 0,
    };

    /// Build a score from unbounded totals, clamping each dimension into range.
    pub fn clamped(raw: [i64; DIMENSIONS]) -> Self {
        let clamp = |value: i64| value.clamp(i64::from(SCORE_MIN), i64::from(SCORE_MAX)) as i32;
        Self {
            environment: clamp(raw[0]),
            climate: clamp(raw[1]),
            society: clamp(raw[2]),
            health: clamp(raw[3]),
            economy: clamp(raw[4]),
        }
    }

    pub fn get(&self, dimension: Dimension) -> i32 {
        self.to_array()[dimension.index()]
    }

    pub fn to_array(&self) -> [i32; DIMENSIONS] {
        [
            self.environment,
            self.climate,
            self.society,
            self.health,
            self.economy,
        ]
    }

    pub fn is_within_bounds(&self) -> bool {
        self.to_array()
            .iter()
            .all(|value| (SCORE_MIN..=SCORE_MAX).contains(value))
    }
}
