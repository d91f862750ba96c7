//! Metrics that only need a weight reading

use super::check_value_constraints;
use crate::config::Gender;

/// Body mass index, clamped to `[10, 90]`
pub fn bmi(height_cm: f64, weight: f64) -> f64 {
    let height_m = height_cm / 100.0;
    check_value_constraints(weight / (height_m * height_m), 10.0, 90.0)
}

/// Basal metabolic rate (kcal), clamped to `[500, 5000]`
pub fn bmr(gender: Gender, height_cm: f64, weight: f64, age: f64) -> f64 {
    let bmr = match gender {
        Gender::Female => {
            let bmr = 864.6 + weight * 10.2036 - height_cm * 0.39336 - age * 6.204;
            if bmr > 2996.0 {
                5000.0
            } else {
                bmr
            }
        }
        Gender::Male => {
            let bmr = 877.8 + weight * 14.916 - height_cm * 0.726 - age * 8.976;
            if bmr > 2322.0 {
                5000.0
            } else {
                bmr
            }
        }
    };

    check_value_constraints(bmr, 500.0, 5000.0)
}

/// Visceral fat rating, clamped to `[1, 50]`
pub fn visceral_fat(gender: Gender, height_cm: f64, weight: f64, age: f64) -> f64 {
    let height = height_cm;

    let vfal = match gender {
        Gender::Female => {
            if weight > (13.0 - height * 0.5) * -1.0 {
                let subsubcalc = (height * 1.45 + height * 0.1158 * height) - 120.0;
                let subcalc = weight * 500.0 / subsubcalc;
                (subcalc - 6.0) + age * 0.07
            } else {
                let subcalc = 0.691 + height * -0.0024 + height * -0.0024;
                ((height * 0.027 - subcalc * weight) * -1.0) + age * 0.07 - age
            }
        }
        Gender::Male => {
            if height < weight * 1.6 {
                let subcalc = (height * 0.4 - height * (height * 0.0826)) * -1.0;
                (weight * 305.0) / (subcalc + 48.0) - 2.9 + age * 0.15
            } else {
                let subcalc = 0.765 + height * -0.0015;
                ((height * 0.143 - weight * subcalc) * -1.0) + age * 0.15 - 5.0
            }
        }
    };

    check_value_constraints(vfal, 1.0, 50.0)
}
