//! Metrics that need an impedance reading, directly or through LBM

use std::fmt;

use serde::{Deserialize, Serialize};

use super::check_value_constraints;
use crate::config::Gender;
use crate::scale::Scale;

/// Lean body mass coefficient
pub fn lbm(height_cm: f64, weight: f64, impedance: f64, age: f64) -> f64 {
    let mut lbm = (height_cm * 9.058 / 100.0) * (height_cm / 100.0);
    lbm += weight * 0.32 + 12.226;
    lbm -= impedance * 0.0068;
    lbm -= age * 0.0542;
    lbm
}

/// Body fat percentage, clamped to `[5, 75]`
pub fn fat_percentage(gender: Gender, height_cm: f64, weight: f64, age: f64, lbm: f64) -> f64 {
    let mut coefficient = 1.0;

    let constant = match gender {
        Gender::Female => {
            if weight > 60.0 {
                coefficient = 0.96;
            } else if weight < 50.0 {
                coefficient = 1.02;
            }
            if height_cm > 160.0 && (weight < 50.0 || weight > 60.0) {
                coefficient *= 1.03;
            }
            if age <= 49.0 {
                9.25
            } else {
                7.25
            }
        }
        Gender::Male => {
            if weight < 61.0 {
                coefficient = 0.98;
            }
            0.8
        }
    };

    let mut fat_percentage = (1.0 - ((lbm - constant) * coefficient / weight)) * 100.0;
    if fat_percentage > 63.0 {
        fat_percentage = 75.0;
    }

    check_value_constraints(fat_percentage, 5.0, 75.0)
}

/// Water percentage, clamped to `[35, 75]`
pub fn water_percentage(fat_percentage: f64) -> f64 {
    let mut water_percentage = (100.0 - fat_percentage) * 0.7;
    let coefficient = if water_percentage <= 50.0 { 1.02 } else { 0.98 };

    water_percentage *= coefficient;
    if water_percentage >= 65.0 {
        water_percentage = 75.0;
    }

    check_value_constraints(water_percentage, 35.0, 75.0)
}

/// Bone mass (kg), clamped to `[0.5, 8]`
pub fn bone_mass(gender: Gender, lbm: f64) -> f64 {
    let base = match gender {
        Gender::Female => 0.245691014,
        Gender::Male => 0.18016894,
    };

    let mut bone_mass = (base - lbm * 0.05158) * -1.0;
    if bone_mass > 2.2 {
        bone_mass += 0.1;
    } else {
        bone_mass -= 0.1;
    }

    let cap = match gender {
        Gender::Female => 5.1,
        Gender::Male => 5.2,
    };
    if bone_mass > cap {
        bone_mass = 8.0;
    }

    check_value_constraints(bone_mass, 0.5, 8.0)
}

/// Muscle mass (kg), clamped to `[10, 120]`
pub fn muscle_mass(gender: Gender, weight: f64, fat_percentage: f64, bone_mass: f64) -> f64 {
    let mut muscle_mass = weight - (fat_percentage * 0.01) * weight - bone_mass;

    let cap = match gender {
        Gender::Female => 84.0,
        Gender::Male => 93.5,
    };
    if muscle_mass >= cap {
        muscle_mass = 120.0;
    }

    check_value_constraints(muscle_mass, 10.0, 120.0)
}

/// Metabolic age (years), clamped to `[15, 80]`
pub fn metabolic_age(gender: Gender, height_cm: f64, weight: f64, age: f64, impedance: f64) -> f64 {
    let metabolic_age = match gender {
        Gender::Female => {
            height_cm * -1.1165 + weight * 1.5784 + age * 0.4615 + impedance * 0.0415 + 83.2548
        }
        Gender::Male => {
            height_cm * -0.7471 + weight * 0.9161 + age * 0.4184 + impedance * 0.0517 + 54.2267
        }
    };

    check_value_constraints(metabolic_age, 15.0, 80.0)
}

/// Protein percentage, clamped to `[5, 32]`. Zero for a zero weight.
pub fn protein_percentage(weight: f64, muscle_mass: f64, water_percentage: f64) -> f64 {
    if weight == 0.0 {
        return 0.0;
    }

    let protein_percentage = (muscle_mass / weight) * 100.0 - water_percentage;
    check_value_constraints(protein_percentage, 5.0, 32.0)
}

/// Fat mass (kg) separating the actual fat percentage from the upper normal.
///
/// Positive means fat can be gained, negative means fat should be lost.
pub fn fat_mass_to_ideal_weight(scale: &Scale, age: u32, weight: f64, fat_percentage: f64) -> f64 {
    let target_fat_percentage = scale.fat_percentage(age)[2];
    weight * (target_fat_percentage / 100.0) - weight * (fat_percentage / 100.0)
}

/// Nine-way body classification from fat and muscle ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    Obese,
    Overweight,
    ThickSet,
    LackExercise,
    Balanced,
    BalancedMuscular,
    Skinny,
    BalancedSkinny,
    SkinnyMuscular,
}

impl BodyType {
    const ALL: [BodyType; 9] = [
        BodyType::Obese,
        BodyType::Overweight,
        BodyType::ThickSet,
        BodyType::LackExercise,
        BodyType::Balanced,
        BodyType::BalancedMuscular,
        BodyType::Skinny,
        BodyType::BalancedSkinny,
        BodyType::SkinnyMuscular,
    ];

    /// Type for `factor * 3 + muscle_class`, `None` outside `0..9`
    pub fn from_index(index: usize) -> Option<BodyType> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Obese => "obese",
            BodyType::Overweight => "overweight",
            BodyType::ThickSet => "thick_set",
            BodyType::LackExercise => "lack_exercise",
            BodyType::Balanced => "balanced",
            BodyType::BalancedMuscular => "balanced_muscular",
            BodyType::Skinny => "skinny",
            BodyType::BalancedSkinny => "balanced_skinny",
            BodyType::SkinnyMuscular => "skinny_muscular",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify fat against the normal fat range and muscle against the muscle range
pub fn body_type(scale: &Scale, age: u32, fat_percentage: f64, muscle_mass: f64) -> BodyType {
    let fat_scale = scale.fat_percentage(age);
    let factor = if fat_percentage > fat_scale[2] {
        0
    } else if fat_percentage < fat_scale[1] {
        2
    } else {
        1
    };

    let muscle_scale = scale.muscle_mass();
    let muscle_class = if muscle_mass > muscle_scale[1] {
        2
    } else if muscle_mass < muscle_scale[0] {
        0
    } else {
        1
    };

    // factor <= 2 and muscle_class <= 2 keep the index below 9
    BodyType::from_index(factor * 3 + muscle_class).unwrap_or(BodyType::Balanced)
}
