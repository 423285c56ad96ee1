// THEORY:
// The `ColorProfileRegistry` is the detector's only notion of "what a hold looks like":
// a short, ordered table of named colour bands in HSV space. A sample belongs to a band
// when its hue sits inside the band's hue range and it is at least as saturated and as
// bright as the band's floors.
//
// The ORDER of the table is part of its contract. The scanner tests every band in
// registry order and a hold accepted for one colour blocks the whole neighbourhood
// for every other colour, so the first band to fire on a region claims it. Reordering
// the table changes detection results.
//
// The default table is the gym's four hold colours:
//   red (0-10°), blue (200-260°), green (80-140°), yellow (40-80°),
// each requiring saturation and value of at least 50%.

use std::borrow::Cow;
use std::collections::HashSet;

use crate::core_modules::pixel::pixel::Hsv;
use crate::error::DetectionError;

/// A named, detectable colour band.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorProfile {
    /// The colour tag reported for holds in this band.
    pub name: Cow<'static, str>,
    /// Lowest accepted hue, in degrees (inclusive).
    pub h_min: f64,
    /// Highest accepted hue, in degrees (inclusive).
    pub h_max: f64,
    /// Saturation floor, in percent (inclusive).
    pub s_min: f64,
    /// Value floor, in percent (inclusive).
    pub v_min: f64,
}

impl ColorProfile {
    pub const fn new(name: &'static str, h_min: f64, h_max: f64, s_min: f64, v_min: f64) -> Self {
        Self {
            name: Cow::Borrowed(name),
            h_min,
            h_max,
            s_min,
            v_min,
        }
    }

    /// A profile with a runtime-provided name.
    pub fn named(name: impl Into<String>, h_min: f64, h_max: f64, s_min: f64, v_min: f64) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            h_min,
            h_max,
            s_min,
            v_min,
        }
    }

    /// Whether the colour falls inside this band.
    #[inline]
    pub fn contains(&self, hsv: &Hsv) -> bool {
        hsv.hue >= self.h_min
            && hsv.hue <= self.h_max
            && hsv.saturation >= self.s_min
            && hsv.value >= self.v_min
    }

    /// The centre of the hue range, the hue this band scores best at.
    #[inline]
    pub fn hue_center(&self) -> f64 {
        (self.h_min + self.h_max) / 2.0
    }
}

/// The gym's hold colours, in dedup priority order.
pub const HOLD_COLOR_PROFILES: [ColorProfile; 4] = [
    ColorProfile::new("red", 0.0, 10.0, 50.0, 50.0),
    ColorProfile::new("blue", 200.0, 260.0, 50.0, 50.0),
    ColorProfile::new("green", 80.0, 140.0, 50.0, 50.0),
    ColorProfile::new("yellow", 40.0, 80.0, 50.0, 50.0),
];

/// An ordered, validated set of colour profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorProfileRegistry {
    profiles: Vec<ColorProfile>,
}

impl Default for ColorProfileRegistry {
    fn default() -> Self {
        Self {
            profiles: HOLD_COLOR_PROFILES.to_vec(),
        }
    }
}

impl ColorProfileRegistry {
    /// Builds a registry from profiles given in priority order.
    ///
    /// Rejects an empty table, blank or duplicate names, non-finite bounds and
    /// inverted hue ranges.
    pub fn new(profiles: Vec<ColorProfile>) -> Result<Self, DetectionError> {
        if profiles.is_empty() {
            return Err(DetectionError::InvalidConfig(
                "colour registry must contain at least one profile".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(profiles.len());
        for profile in &profiles {
            if profile.name.trim().is_empty() {
                return Err(DetectionError::InvalidConfig(
                    "colour profile name must not be blank".to_string(),
                ));
            }
            if !seen.insert(profile.name.as_ref()) {
                return Err(DetectionError::InvalidConfig(format!(
                    "duplicate colour profile `{}`",
                    profile.name
                )));
            }
            let bounds = [profile.h_min, profile.h_max, profile.s_min, profile.v_min];
            if bounds.iter().any(|bound| !bound.is_finite()) {
                return Err(DetectionError::InvalidConfig(format!(
                    "colour profile `{}` has a non-finite bound",
                    profile.name
                )));
            }
            if profile.h_min > profile.h_max {
                return Err(DetectionError::InvalidConfig(format!(
                    "colour profile `{}` has h_min above h_max",
                    profile.name
                )));
            }
        }

        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[ColorProfile] {
        &self.profiles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColorProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ColorProfile> {
        self.profiles.iter().find(|profile| profile.name == name)
    }
}

impl<'a> IntoIterator for &'a ColorProfileRegistry {
    type Item = &'a ColorProfile;
    type IntoIter = std::slice::Iter<'a, ColorProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::convert;

    #[test]
    fn default_order_is_red_blue_green_yellow() {
        let registry = ColorProfileRegistry::default();
        let names: Vec<&str> = registry.iter().map(|p| p.name.as_ref()).collect();
        assert_eq!(names, ["red", "blue", "green", "yellow"]);
    }

    #[test]
    fn pure_red_matches_red_band() {
        let red = ColorProfile::new("red", 0.0, 10.0, 50.0, 50.0);
        assert!(red.contains(&convert(255, 0, 0)));
        assert!(!red.contains(&convert(0, 0, 255)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let band = ColorProfile::new("green", 80.0, 120.0, 100.0, 100.0);
        // hue 120, s 100, v 100 sits exactly on the upper hue and both floors
        assert!(band.contains(&convert(0, 255, 0)));
    }

    #[test]
    fn dull_colours_fall_below_floors() {
        let registry = ColorProfileRegistry::default();
        // dark red: v ~ 39%
        let dark = convert(100, 0, 0);
        assert!(registry.iter().all(|p| !p.contains(&dark)));
        // washed-out red: s ~ 20%
        let pale = convert(255, 204, 204);
        assert!(registry.iter().all(|p| !p.contains(&pale)));
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(ColorProfileRegistry::new(Vec::new()).is_err());
        assert!(
            ColorProfileRegistry::new(vec![
                ColorProfile::new("red", 0.0, 10.0, 50.0, 50.0),
                ColorProfile::named("red", 340.0, 359.0, 50.0, 50.0),
            ])
            .is_err()
        );
        assert!(ColorProfileRegistry::new(vec![ColorProfile::new("x", 20.0, 10.0, 0.0, 0.0)]).is_err());
        assert!(ColorProfileRegistry::new(vec![ColorProfile::new(" ", 0.0, 10.0, 0.0, 0.0)]).is_err());
        assert!(ColorProfileRegistry::new(vec![ColorProfile::new("nan", f64::NAN, 10.0, 0.0, 0.0)]).is_err());
    }

    #[test]
    fn custom_table_keeps_given_order() {
        let registry = ColorProfileRegistry::new(vec![
            ColorProfile::named("purple", 260.0, 300.0, 40.0, 40.0),
            ColorProfile::new("red", 0.0, 10.0, 50.0, 50.0),
        ])
        .expect("valid registry");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.profiles()[0].name, "purple");
        assert!(registry.get("red").is_some());
        assert!(registry.get("blue").is_none());
    }
}
