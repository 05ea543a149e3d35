// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calorie formulas and daily meal aggregation.

use serde::Serialize;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{ActivityLevel, Meal, MealType, Sex, User};

/// Calories burned per step.
const CALORIES_PER_STEP: f64 = 0.05;

/// Basal metabolic rate (Mifflin-St Jeor).
///
/// `weight_kg` in kilograms, `height_cm` in centimetres, `age` in years.
pub fn bmr(weight_kg: f64, height_cm: f64, age: u32, sex: Sex) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    match sex {
        Sex::Homme => base + 5.0,
        Sex::Femme => base - 161.0,
    }
}

/// Multiplier applied to the BMR for a given activity level.
pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentaire => 1.2,
        ActivityLevel::Leger => 1.375,
        ActivityLevel::Moderee => 1.55,
        ActivityLevel::Intense => 1.725,
        ActivityLevel::Unknown => 1.2,
    }
}

/// Daily calorie need: BMR scaled by activity level.
pub fn daily_calories(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    sex: Sex,
    level: ActivityLevel,
) -> f64 {
    bmr(weight_kg, height_cm, age, sex) * activity_multiplier(level)
}

/// Calories burned by walking `steps` steps, rounded to the nearest unit.
pub fn calories_burned(steps: u32) -> u32 {
    (f64::from(steps) * CALORIES_PER_STEP).round() as u32
}

/// Daily target for a profile, if every input is known.
///
/// A missing activity level counts as sedentary.
pub fn target_for(user: &User) -> Option<f64> {
    Some(daily_calories(
        user.weight_kg?,
        user.height_cm?,
        user.age?,
        user.sex?,
        user.activity_level.unwrap_or(ActivityLevel::Unknown),
    ))
}

/// Calorie totals for one day.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailySummary {
    /// Total per meal type; every type is present, possibly with 0
    pub by_meal_type: BTreeMap<MealType, u32>,
    pub total: u32,
    pub meal_count: u32,
    pub target: Option<f64>,
    pub burned: u32,
    /// `target - total + burned`, when a target is known
    pub remaining: Option<f64>,
}

/// Sum the meals of one day.
pub fn summarize_day(meals: &[Meal], target: Option<f64>, steps: u32) -> DailySummary {
    let mut by_meal_type: BTreeMap<MealType, u32> =
        MealType::ALL.iter().map(|t| (*t, 0)).collect();

    for meal in meals {
        *by_meal_type.entry(meal.meal_type).or_insert(0) += meal.calories;
    }

    let total = by_meal_type.values().sum();
    let burned = calories_burned(steps);

    DailySummary {
        by_meal_type,
        total,
        meal_count: meals.len() as u32,
        target,
        burned,
        remaining: target.map(|t| t - f64::from(total) + f64::from(burned)),
    }
}
