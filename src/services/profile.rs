// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile edits and admin user listing.

use serde::Deserialize;
use std::cmp::Ordering;

use crate::error::{AppError, Result};
use crate::models::{ActivityLevel, Role, Sex, User};
use crate::services::nutrition;

const MAX_NAME_LEN: usize = 80;

/// One editable profile field with its new value.
///
/// Wire format: `{"field": "weight_kg", "value": 72.5}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ProfileUpdate {
    DisplayName(String),
    WeightKg(f64),
    HeightCm(f64),
    Age(u32),
    Sex(Sex),
    ActivityLevel(ActivityLevel),
    AvatarUrl(Option<String>),
}

impl ProfileUpdate {
    /// Whether this edit feeds into the calorie target.
    fn is_physiological(&self) -> bool {
        matches!(
            self,
            ProfileUpdate::WeightKg(_)
                | ProfileUpdate::HeightCm(_)
                | ProfileUpdate::Age(_)
                | ProfileUpdate::Sex(_)
                | ProfileUpdate::ActivityLevel(_)
        )
    }
}

/// Validate an edit and apply it to `user`.
///
/// Recomputes `daily_calories` after physiological edits when every input is
/// known.
pub fn apply_update(user: &mut User, update: ProfileUpdate, now: &str) -> Result<()> {
    let recompute = update.is_physiological();

    match update {
        ProfileUpdate::DisplayName(name) => {
            user.display_name = validate_display_name(&name)?;
        }
        ProfileUpdate::WeightKg(w) => {
            user.weight_kg = Some(in_range("weight_kg", w, 20.0, 400.0)?);
        }
        ProfileUpdate::HeightCm(h) => {
            user.height_cm = Some(in_range("height_cm", h, 80.0, 260.0)?);
        }
        ProfileUpdate::Age(age) => {
            if !(10..=120).contains(&age) {
                return Err(AppError::BadRequest(
                    "age must be between 10 and 120".to_string(),
                ));
            }
            user.age = Some(age);
        }
        ProfileUpdate::Sex(sex) => user.sex = Some(sex),
        ProfileUpdate::ActivityLevel(ActivityLevel::Unknown) => {
            return Err(AppError::BadRequest(
                "activity_level must be one of sedentaire, leger, moderee, intense".to_string(),
            ));
        }
        ProfileUpdate::ActivityLevel(level) => user.activity_level = Some(level),
        ProfileUpdate::AvatarUrl(url) => {
            user.avatar_url = match url.map(|u| u.trim().to_string()) {
                Some(u) if u.is_empty() => None,
                Some(u) if u.starts_with("https://") || u.starts_with("http://") => Some(u),
                Some(_) => {
                    return Err(AppError::BadRequest(
                        "avatar_url must be an http(s) URL".to_string(),
                    ))
                }
                None => None,
            };
        }
    }

    if recompute {
        if let Some(target) = nutrition::target_for(user) {
            user.daily_calories = Some(target);
        }
    }
    user.updated_at = now.to_string();
    Ok(())
}

pub fn validate_display_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "display_name must be 1 to {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn in_range(field: &str, value: f64, min: f64, max: f64) -> Result<f64> {
    if !value.is_finite() || value < min || value > max {
        return Err(AppError::BadRequest(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(value)
}

// ─── Admin listing ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Rating,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Admin user list query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
    /// Case-insensitive substring of name or e-mail
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
}

/// Filter and sort users for the admin screens.
///
/// Users without a rating always sort last, whatever the order.
pub fn filter_and_sort(users: Vec<User>, query: &UserQuery) -> Vec<User> {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut users: Vec<User> = users
        .into_iter()
        .filter(|u| query.role.map_or(true, |r| u.role == r))
        .filter(|u| {
            needle.as_deref().map_or(true, |n| {
                u.display_name.to_lowercase().contains(n) || u.email.contains(n)
            })
        })
        .collect();

    let directed = |ord: Ordering| match query.order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    };

    users.sort_by(|a, b| match query.sort {
        SortKey::Name => directed(
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase()),
        ),
        SortKey::Rating => match (a.rating, b.rating) {
            (Some(x), Some(y)) => directed(x.total_cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
    });

    users
}

/// Coaches for the booking screen: best rated first, then by name.
pub fn sort_coaches(mut coaches: Vec<User>) -> Vec<User> {
    coaches.sort_by(|a, b| {
        let by_rating = match (a.rating, b.rating) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_rating.then_with(|| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
        })
    });
    coaches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str, name: &str, role: Role, rating: Option<f64>, created: &str) -> User {
        let mut u = User::new(uid.to_string(), &format!("{}@example.com", uid), name, created);
        u.role = role;
        u.rating = rating;
        u
    }

    #[test]
    fn test_update_wire_format() {
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"field":"weight_kg","value":72.5}"#).unwrap();
        assert_eq!(update, ProfileUpdate::WeightKg(72.5));

        let update: ProfileUpdate =
            serde_json::from_str(r#"{"field":"sex","value":"femme"}"#).unwrap();
        assert_eq!(update, ProfileUpdate::Sex(Sex::Femme));

        assert!(serde_json::from_str::<ProfileUpdate>(r#"{"field":"role","value":"admin"}"#)
            .is_err());
    }

    #[test]
    fn test_physiological_edits_recompute_target() {
        let mut u = user("u1", "Alex", Role::Utilisateur, None, "t0");
        for update in [
            ProfileUpdate::WeightKg(70.0),
            ProfileUpdate::HeightCm(175.0),
            ProfileUpdate::Age(30),
            ProfileUpdate::Sex(Sex::Homme),
        ] {
            apply_update(&mut u, update, "t1").unwrap();
        }
        assert_eq!(u.daily_calories, Some(1648.75 * 1.2));

        apply_update(&mut u, ProfileUpdate::ActivityLevel(ActivityLevel::Moderee), "t2").unwrap();
        assert!((u.daily_calories.unwrap() - 2555.5625).abs() < 1e-9);
        assert_eq!(u.updated_at, "t2");
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut u = user("u1", "Alex", Role::Utilisateur, None, "t0");
        assert!(apply_update(&mut u, ProfileUpdate::WeightKg(-3.0), "t1").is_err());
        assert!(apply_update(&mut u, ProfileUpdate::WeightKg(f64::NAN), "t1").is_err());
        assert!(apply_update(&mut u, ProfileUpdate::HeightCm(400.0), "t1").is_err());
        assert!(apply_update(&mut u, ProfileUpdate::Age(3), "t1").is_err());
        assert!(apply_update(&mut u, ProfileUpdate::DisplayName("  ".into()), "t1").is_err());
        assert!(apply_update(
            &mut u,
            ProfileUpdate::AvatarUrl(Some("javascript:alert(1)".into())),
            "t1"
        )
        .is_err());
        assert!(apply_update(
            &mut u,
            ProfileUpdate::ActivityLevel(ActivityLevel::Unknown),
            "t1"
        )
        .is_err());
        assert!(u.weight_kg.is_none());
        assert_eq!(u.updated_at, "t0");
    }

    #[test]
    fn test_avatar_can_be_cleared() {
        let mut u = user("u1", "Alex", Role::Utilisateur, None, "t0");
        apply_update(
            &mut u,
            ProfileUpdate::AvatarUrl(Some("https://cdn.example.com/a.png".into())),
            "t1",
        )
        .unwrap();
        assert!(u.avatar_url.is_some());
        apply_update(&mut u, ProfileUpdate::AvatarUrl(None), "t2").unwrap();
        assert!(u.avatar_url.is_none());
    }

    #[test]
    fn test_sort_by_name_is_case_insensitive() {
        let users = vec![
            user("a", "bruno", Role::Coach, None, "t1"),
            user("b", "Alice", Role::Coach, None, "t2"),
            user("c", "Chloé", Role::Utilisateur, None, "t3"),
        ];
        let sorted = filter_and_sort(users, &UserQuery::default());
        let names: Vec<_> = sorted.iter().map(|u| u.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "bruno", "Chloé"]);
    }

    #[test]
    fn test_sort_by_rating_puts_unrated_last() {
        let users = vec![
            user("a", "A", Role::Coach, None, "t1"),
            user("b", "B", Role::Coach, Some(3.5), "t2"),
            user("c", "C", Role::Coach, Some(4.8), "t3"),
        ];
        let query = UserQuery {
            sort: SortKey::Rating,
            order: SortOrder::Desc,
            ..Default::default()
        };
        let uids: Vec<_> = filter_and_sort(users.clone(), &query)
            .into_iter()
            .map(|u| u.uid)
            .collect();
        assert_eq!(uids, vec!["c", "b", "a"]);

        let query = UserQuery {
            sort: SortKey::Rating,
            ..Default::default()
        };
        let uids: Vec<_> = filter_and_sort(users, &query)
            .into_iter()
            .map(|u| u.uid)
            .collect();
        assert_eq!(uids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_filter_by_role_and_search() {
        let users = vec![
            user("marie", "Marie Curie", Role::Coach, None, "t1"),
            user("paul", "Paul", Role::Utilisateur, None, "t2"),
            user("mario", "Mario", Role::Utilisateur, None, "t3"),
        ];
        let query = UserQuery {
            role: Some(Role::Utilisateur),
            search: Some("MAR".to_string()),
            ..Default::default()
        };
        let uids: Vec<_> = filter_and_sort(users, &query)
            .into_iter()
            .map(|u| u.uid)
            .collect();
        assert_eq!(uids, vec!["mario"]);
    }

    #[test]
    fn test_sort_coaches() {
        let coaches = vec![
            user("a", "zoe", Role::Coach, Some(4.0), "t1"),
            user("b", "Yann", Role::Coach, None, "t2"),
            user("c", "Anna", Role::Coach, Some(4.0), "t3"),
            user("d", "Bob", Role::Coach, Some(4.9), "t4"),
        ];
        let uids: Vec<_> = sort_coaches(coaches).into_iter().map(|u| u.uid).collect();
        assert_eq!(uids, vec!["d", "c", "a", "b"]);
    }
}
