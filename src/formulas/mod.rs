//! Body composition formulas
//!
//! Every formula is a pure function of the profile and already known metric
//! values. The constants are empirically tuned to match the vendor scale
//! firmware and must be kept as they are.
//!
//! - [`weight`]: metrics that need only a weight (BMI, BMR, visceral fat)
//! - [`impedance`]: metrics that also need the bioelectrical impedance
//! - [`body_score`]: the aggregate score built from deductions

pub mod body_score;
pub mod impedance;
pub mod weight;

use crate::config::{BodyScaleConfig, Gender};
use crate::metric::round_to;

pub use body_score::{body_score, BodyScoreInput};
pub use impedance::{
    body_type, bone_mass, fat_mass_to_ideal_weight, fat_percentage, lbm, metabolic_age,
    muscle_mass, protein_percentage, water_percentage, BodyType,
};
pub use weight::{bmi, bmr, visceral_fat};

/// Clamp a value into `[minimum, maximum]`
pub fn check_value_constraints(value: f64, minimum: f64, maximum: f64) -> f64 {
    if value < minimum {
        minimum
    } else if value > maximum {
        maximum
    } else {
        value
    }
}

/// Ideal weight (kg) for the configured height, a reversed BMI estimate
pub fn ideal_weight(config: &BodyScaleConfig) -> f64 {
    let height = f64::from(config.height);
    let ideal = match config.gender {
        Gender::Female => (height - 70.0) * 0.6,
        Gender::Male => (height - 80.0) * 0.7,
    };
    round_to(ideal, 0)
}

/// Human readable BMI category
pub fn bmi_label(bmi: f64) -> &'static str {
    if bmi < 18.5 {
        "Underweight"
    } else if bmi < 25.0 {
        "Normal or Healthy Weight"
    } else if bmi < 27.0 {
        "Slight overweight"
    } else if bmi < 30.0 {
        "Overweight"
    } else if bmi < 35.0 {
        "Moderate obesity"
    } else if bmi < 40.0 {
        "Severe obesity"
    } else {
        "Massive obesity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_check_value_constraints() {
        assert_eq!(check_value_constraints(0.3, 10.0, 90.0), 10.0);
        assert_eq!(check_value_constraints(173.0, 10.0, 90.0), 90.0);
        assert_eq!(check_value_constraints(23.9, 10.0, 90.0), 23.9);
    }

    #[test]
    fn test_ideal_weight() {
        let birthday = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let male = BodyScaleConfig::new(180, birthday, Gender::Male, "sensor.weight");
        assert_eq!(ideal_weight(&male), 70.0);

        let female = BodyScaleConfig::new(165, birthday, Gender::Female, "sensor.weight");
        assert_eq!(ideal_weight(&female), 57.0);
    }

    #[test]
    fn test_bmi_label() {
        assert_eq!(bmi_label(17.0), "Underweight");
        assert_eq!(bmi_label(23.9), "Normal or Healthy Weight");
        assert_eq!(bmi_label(26.0), "Slight overweight");
        assert_eq!(bmi_label(29.9), "Overweight");
        assert_eq!(bmi_label(34.0), "Moderate obesity");
        assert_eq!(bmi_label(39.0), "Severe obesity");
        assert_eq!(bmi_label(45.0), "Massive obesity");
    }
}
