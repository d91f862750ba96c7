//! Reference ranges for body composition
//!
//! Pure lookup tables keyed by age, height or weight band and gender. The
//! height-dependent muscle range is resolved once when the [`Scale`] is built.

use crate::config::{Gender, CONSTRAINT_AGE_MAX};

/// Age band with per-gender ranges
struct AgeBand {
    min: u32,
    max: u32,
    female: [f64; 4],
    male: [f64; 4],
}

/// Fat percentage `[low, normal_low, normal_high, high]` by age
const FAT_PERCENTAGE_BANDS: [AgeBand; 7] = [
    AgeBand {
        min: 0,
        max: 12,
        female: [12.0, 21.0, 30.0, 34.0],
        male: [7.0, 16.0, 25.0, 30.0],
    },
    AgeBand {
        min: 12,
        max: 14,
        female: [15.0, 24.0, 33.0, 37.0],
        male: [7.0, 16.0, 25.0, 30.0],
    },
    AgeBand {
        min: 14,
        max: 16,
        female: [18.0, 27.0, 36.0, 40.0],
        male: [7.0, 16.0, 25.0, 30.0],
    },
    AgeBand {
        min: 16,
        max: 18,
        female: [20.0, 28.0, 37.0, 41.0],
        male: [7.0, 16.0, 25.0, 30.0],
    },
    AgeBand {
        min: 18,
        max: 40,
        female: [21.0, 28.0, 35.0, 40.0],
        male: [11.0, 17.0, 22.0, 27.0],
    },
    AgeBand {
        min: 40,
        max: 60,
        female: [22.0, 29.0, 36.0, 41.0],
        male: [12.0, 18.0, 23.0, 28.0],
    },
    AgeBand {
        min: 60,
        max: 100,
        female: [23.0, 30.0, 37.0, 42.0],
        male: [14.0, 20.0, 25.0, 30.0],
    },
];

/// Band selected when `value >= min` for the gender, first match wins
struct ThresholdBand<const N: usize> {
    min_female: f64,
    min_male: f64,
    female: [f64; N],
    male: [f64; N],
}

impl<const N: usize> ThresholdBand<N> {
    fn min(&self, gender: Gender) -> f64 {
        match gender {
            Gender::Female => self.min_female,
            Gender::Male => self.min_male,
        }
    }

    fn range(&self, gender: Gender) -> [f64; N] {
        match gender {
            Gender::Female => self.female,
            Gender::Male => self.male,
        }
    }
}

fn lookup<const N: usize>(bands: &[ThresholdBand<N>], gender: Gender, value: f64) -> [f64; N] {
    // the last band starts at 0 so every non-negative value matches
    bands
        .iter()
        .find(|band| value >= band.min(gender))
        .or_else(|| bands.last())
        .map(|band| band.range(gender))
        .unwrap_or([0.0; N])
}

/// Muscle mass `[low, high]` (kg) by height (cm)
const MUSCLE_MASS_BANDS: [ThresholdBand<2>; 3] = [
    ThresholdBand {
        min_female: 160.0,
        min_male: 170.0,
        female: [36.5, 42.6],
        male: [49.4, 59.5],
    },
    ThresholdBand {
        min_female: 150.0,
        min_male: 160.0,
        female: [32.9, 37.6],
        male: [44.0, 52.5],
    },
    ThresholdBand {
        min_female: 0.0,
        min_male: 0.0,
        female: [29.1, 34.8],
        male: [38.5, 46.6],
    },
];

/// Bone mass `[low, high]` (kg) by weight (kg)
const BONE_MASS_BANDS: [ThresholdBand<2>; 3] = [
    ThresholdBand {
        min_female: 60.0,
        min_male: 75.0,
        female: [1.8, 3.9],
        male: [2.0, 4.2],
    },
    ThresholdBand {
        min_female: 45.0,
        min_male: 60.0,
        female: [1.5, 3.8],
        male: [1.9, 4.1],
    },
    ThresholdBand {
        min_female: 0.0,
        min_male: 0.0,
        female: [1.3, 3.6],
        male: [1.6, 3.9],
    },
];

/// BMR kcal per kg, `(age upper bound, coefficient)` in ascending age
const BMR_COEFFICIENTS_MALE: [(u32, f64); 3] = [(30, 21.6), (50, 20.07), (100, 19.35)];
const BMR_COEFFICIENTS_FEMALE: [(u32, f64); 3] = [(30, 21.24), (50, 19.53), (100, 18.63)];

/// BMI `[underweight, overweight, obese, severely obese]` boundaries
pub const BMI_RANGE: [f64; 4] = [18.5, 25.0, 28.0, 32.0];
/// Visceral fat `[normal, high]`
pub const VISCERAL_FAT_RANGE: [f64; 2] = [10.0, 15.0];
/// Protein percentage `[low, high]`
pub const PROTEIN_PERCENTAGE_RANGE: [f64; 2] = [16.0, 20.0];
/// Body score `[very bad, bad, normal, good]`, better above the last
pub const BODY_SCORE_RANGE: [f64; 4] = [50.0, 60.0, 80.0, 90.0];

/// Reference ranges for one height and gender
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    height: u32,
    gender: Gender,
    muscle_mass: [f64; 2],
}

impl Scale {
    pub fn new(height: u32, gender: Gender) -> Self {
        Self {
            height,
            gender,
            muscle_mass: lookup(&MUSCLE_MASS_BANDS, gender, f64::from(height)),
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    /// Fat percentage `[low, normal_low, normal_high, high]` for an age.
    ///
    /// Ages past the table use the oldest band.
    pub fn fat_percentage(&self, age: u32) -> [f64; 4] {
        let age = age.min(CONSTRAINT_AGE_MAX);
        let band = FAT_PERCENTAGE_BANDS
            .iter()
            .find(|band| band.min <= age && age < band.max)
            .unwrap_or(&FAT_PERCENTAGE_BANDS[FAT_PERCENTAGE_BANDS.len() - 1]);
        match self.gender {
            Gender::Female => band.female,
            Gender::Male => band.male,
        }
    }

    /// Muscle mass `[low, high]` (kg)
    pub fn muscle_mass(&self) -> [f64; 2] {
        self.muscle_mass
    }

    /// Bone mass `[low, high]` (kg) for a body weight
    pub fn bone_mass(&self, weight: f64) -> [f64; 2] {
        lookup(&BONE_MASS_BANDS, self.gender, weight)
    }

    /// Water percentage `[low, high]`
    pub fn water_percentage(&self) -> [f64; 2] {
        match self.gender {
            Gender::Male => [55.0, 65.1],
            Gender::Female => [45.0, 60.1],
        }
    }

    /// BMR coefficient (kcal per kg) for an age, `None` from 100 years on
    pub fn bmr_coefficient(&self, age: u32) -> Option<f64> {
        let coefficients = match self.gender {
            Gender::Male => &BMR_COEFFICIENTS_MALE,
            Gender::Female => &BMR_COEFFICIENTS_FEMALE,
        };
        coefficients
            .iter()
            .find(|(max_age, _)| age < *max_age)
            .map(|(_, coefficient)| *coefficient)
    }

    /// Expected BMR (kcal) for an age and weight
    pub fn bmr(&self, age: u32, weight: f64) -> Option<f64> {
        self.bmr_coefficient(age).map(|c| weight * c)
    }

    /// BMI range converted to weights (kg) for this height
    pub fn ideal_weight(&self) -> [f64; 4] {
        let height = f64::from(self.height);
        BMI_RANGE.map(|bmi| bmi * height * height / 10000.0)
    }
}
