// THEORY:
// The grouper reshapes the scanner's flat, scan-ordered candidate list into the form
// the Mini-App consumes: one list of points per colour. Within a colour the scan order
// is preserved; colours appear in the order of their first candidate; a colour with
// no candidates does not appear at all. `total_holds` always equals the number of
// candidates grouped.

use crate::core_modules::grid_scanner::HoldCandidate;
use crate::core_modules::pixel::pixel::Coordinate;
use crate::core_modules::smart_pixel::smart_pixel::Confidence;

/// One hold as reported to clients; the colour is implied by its group.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HoldPoint {
    pub x: Coordinate,
    pub y: Coordinate,
    pub confidence: Confidence,
}

/// All holds of one colour, in scan order.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldGroup {
    pub color: String,
    pub holds: Vec<HoldPoint>,
}

/// The grouped output of one scan. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    groups: Vec<HoldGroup>,
    total_holds: usize,
}

impl DetectionResult {
    /// A result with no holds.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[HoldGroup] {
        &self.groups
    }

    pub fn holds_for(&self, color: &str) -> Option<&[HoldPoint]> {
        self.groups
            .iter()
            .find(|group| group.color == color)
            .map(|group| group.holds.as_slice())
    }

    pub fn colors(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.color.as_str())
    }

    pub fn total_holds(&self) -> usize {
        self.total_holds
    }

    pub fn is_empty(&self) -> bool {
        self.total_holds == 0
    }
}

/// Partitions candidates by colour.
pub fn group(candidates: &[HoldCandidate]) -> DetectionResult {
    let mut groups: Vec<HoldGroup> = Vec::new();

    for candidate in candidates {
        let point = HoldPoint {
            x: candidate.x,
            y: candidate.y,
            confidence: candidate.confidence,
        };
        match groups.iter_mut().find(|group| group.color == candidate.color) {
            Some(group) => group.holds.push(point),
            None => groups.push(HoldGroup {
                color: candidate.color.clone(),
                holds: vec![point],
            }),
        }
    }

    DetectionResult {
        groups,
        total_holds: candidates.len(),
    }
}

impl From<Vec<HoldCandidate>> for DetectionResult {
    fn from(candidates: Vec<HoldCandidate>) -> Self {
        group(&candidates)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::{DetectionResult, HoldGroup};
    use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};

    /// Groups as a JSON object keyed by colour, in group order.
    struct ByColor<'a>(&'a [HoldGroup]);

    impl Serialize for ByColor<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.0.len()))?;
            for group in self.0 {
                map.serialize_entry(&group.color, &group.holds)?;
            }
            map.end()
        }
    }

    impl Serialize for DetectionResult {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut state = serializer.serialize_struct("DetectionResult", 2)?;
            state.serialize_field("detectedHolds", &ByColor(&self.groups))?;
            state.serialize_field("totalHolds", &self.total_holds)?;
            state.end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: u32, y: u32, color: &str, confidence: f64) -> HoldCandidate {
        HoldCandidate {
            x,
            y,
            color: color.to_string(),
            confidence,
        }
    }

    #[test]
    fn groups_by_color() {
        let result = group(&[candidate(1, 1, "red", 80.0), candidate(2, 2, "blue", 70.0)]);
        assert_eq!(
            result.holds_for("red"),
            Some(
                &[HoldPoint {
                    x: 1,
                    y: 1,
                    confidence: 80.0
                }][..]
            )
        );
        assert_eq!(
            result.holds_for("blue"),
            Some(
                &[HoldPoint {
                    x: 2,
                    y: 2,
                    confidence: 70.0
                }][..]
            )
        );
        assert_eq!(result.total_holds(), 2);
    }

    #[test]
    fn keeps_scan_order_within_and_first_seen_order_across_colors() {
        let result = group(&[
            candidate(0, 0, "yellow", 10.0),
            candidate(30, 0, "red", 20.0),
            candidate(60, 0, "yellow", 30.0),
        ]);
        assert_eq!(result.colors().collect::<Vec<_>>(), ["yellow", "red"]);
        let yellow: Vec<u32> = result
            .holds_for("yellow")
            .expect("yellow group")
            .iter()
            .map(|p| p.x)
            .collect();
        assert_eq!(yellow, [0, 60]);
        assert_eq!(result.total_holds(), 3);
    }

    #[test]
    fn absent_colors_have_no_key() {
        let result = group(&[candidate(5, 5, "green", 50.0)]);
        assert!(result.holds_for("red").is_none());
        assert_eq!(result.groups().len(), 1);
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let result = group(&[]);
        assert!(result.is_empty());
        assert_eq!(result, DetectionResult::empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_to_transport_shape() {
        let result = group(&[candidate(1, 1, "red", 80.0), candidate(2, 2, "blue", 70.0)]);
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "detectedHolds": {
                    "red": [{"x": 1, "y": 1, "confidence": 80.0}],
                    "blue": [{"x": 2, "y": 2, "confidence": 70.0}]
                },
                "totalHolds": 2
            })
        );
    }
}
