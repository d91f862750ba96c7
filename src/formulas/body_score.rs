//! Body score
//!
//! Starts at 100 and subtracts one deduction per component (BMI, fat, muscle,
//! water, visceral fat, bone, BMR, protein). Each deduction ramps linearly
//! between two breakpoints via [`get_malus`].

use crate::config::Gender;
use crate::scale::Scale;

/// Every metric the body score reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyScoreInput {
    pub age: u32,
    pub weight: f64,
    pub bmi: f64,
    pub fat_percentage: f64,
    pub muscle_mass: f64,
    pub water_percentage: f64,
    pub bone_mass: f64,
    pub bmr: f64,
    pub visceral_fat: f64,
    pub protein_percentage: f64,
}

/// Linear penalty between `max_data` and `min_data`, never negative
pub fn get_malus(data: f64, min_data: f64, max_data: f64, max_malus: f64, min_malus: f64) -> f64 {
    let result = ((data - max_data) / (min_data - max_data)) * (max_malus - min_malus);
    if result >= 0.0 {
        result
    } else {
        0.0
    }
}

fn bmi_deduct_score(scale: &Scale, input: &BodyScoreInput) -> f64 {
    const BMI_VERY_LOW: f64 = 14.0;
    const BMI_LOW: f64 = 15.0;
    const BMI_NORMAL: f64 = 18.5;
    const BMI_OVERWEIGHT: f64 = 28.0;
    const BMI_OBESE: f64 = 32.0;

    if scale.height() < 90 {
        return 0.0;
    }

    let bmi = input.bmi;
    let adult = input.age >= 18;
    let fat_scale = scale.fat_percentage(input.age);

    if bmi <= BMI_VERY_LOW {
        return 30.0;
    }

    if input.fat_percentage < fat_scale[2]
        && ((bmi >= BMI_NORMAL && adult) || (bmi >= BMI_LOW && !adult))
    {
        return 0.0;
    }

    if bmi < BMI_LOW {
        return get_malus(bmi, BMI_VERY_LOW, BMI_LOW, 30.0, 15.0) + 15.0;
    }
    if bmi < BMI_NORMAL && adult {
        return get_malus(bmi, 15.0, 18.5, 15.0, 5.0) + 5.0;
    }

    if input.fat_percentage >= fat_scale[2] {
        if bmi >= BMI_OBESE {
            return 10.0;
        }
        if bmi > BMI_OVERWEIGHT {
            return get_malus(bmi, 28.0, 25.0, 5.0, 10.0) + 5.0;
        }
    }

    0.0
}

fn body_fat_deduct_score(scale: &Scale, input: &BodyScoreInput) -> f64 {
    let fat = input.fat_percentage;
    let fat_scale = scale.fat_percentage(input.age);

    let best_fat_level = match scale.gender() {
        Gender::Male => fat_scale[2] - 3.0,
        Gender::Female => fat_scale[2] - 2.0,
    };

    if fat_scale[0] <= fat && fat < best_fat_level {
        return 0.0;
    }
    if fat >= fat_scale[3] {
        return 20.0;
    }

    get_malus(fat, fat_scale[3], fat_scale[2], 20.0, 10.0) + 10.0
}

fn common_deduct_score(min_value: f64, max_value: f64, value: f64) -> f64 {
    if value >= max_value {
        return 0.0;
    }
    if value < min_value {
        return 10.0;
    }
    get_malus(value, min_value, max_value, 10.0, 5.0) + 5.0
}

fn muscle_deduct_score(scale: &Scale, muscle_mass: f64) -> f64 {
    let low = scale.muscle_mass()[0];
    common_deduct_score(low - 5.0, low, muscle_mass)
}

fn water_deduct_score(scale: &Scale, water_percentage: f64) -> f64 {
    let normal = scale.water_percentage()[0];
    common_deduct_score(normal - 5.0, normal, water_percentage)
}

fn bone_deduct_score(scale: &Scale, weight: f64, bone_mass: f64) -> f64 {
    let expected = scale.bone_mass(weight)[0];
    common_deduct_score(expected - 0.3, expected, bone_mass)
}

fn visceral_deduct_score(visceral_fat: f64) -> f64 {
    let max_data = 15.0;
    let min_data = 10.0;

    if visceral_fat < min_data {
        return 0.0;
    }
    if visceral_fat >= max_data {
        return 15.0;
    }
    get_malus(visceral_fat, max_data, min_data, max_data, min_data) + 10.0
}

fn basal_metabolism_deduct_score(scale: &Scale, input: &BodyScoreInput) -> f64 {
    let normal_bmr = scale.bmr(input.age, input.weight).unwrap_or(20.0);

    if input.bmr >= normal_bmr {
        return 0.0;
    }
    if input.bmr <= normal_bmr - 300.0 {
        return 6.0;
    }
    get_malus(input.bmr, normal_bmr - 300.0, normal_bmr, 6.0, 3.0) + 5.0
}

fn protein_deduct_score(protein_percentage: f64) -> f64 {
    if protein_percentage > 17.0 {
        return 0.0;
    }
    if protein_percentage < 10.0 {
        return 10.0;
    }
    if protein_percentage <= 16.0 {
        return get_malus(protein_percentage, 10.0, 16.0, 10.0, 5.0) + 5.0;
    }
    get_malus(protein_percentage, 16.0, 17.0, 5.0, 3.0) + 3.0
}

/// Body score out of 100, floored at 0
pub fn body_score(scale: &Scale, input: &BodyScoreInput) -> f64 {
    let mut score = 100.0;
    score -= bmi_deduct_score(scale, input);
    score -= body_fat_deduct_score(scale, input);
    score -= muscle_deduct_score(scale, input.muscle_mass);
    score -= water_deduct_score(scale, input.water_percentage);
    score -= visceral_deduct_score(input.visceral_fat);
    score -= bone_deduct_score(scale, input.weight, input.bone_mass);
    score -= basal_metabolism_deduct_score(scale, input);
    score -= protein_deduct_score(input.protein_percentage);

    f64::max(0.0, score)
}
