use hold_vision::core_modules::grid_scanner::scan;
use hold_vision::core_modules::hold_grouper::group;
use hold_vision::core_modules::utils::image_helper::encode_png;
use hold_vision::{
    ColorProfile, ColorProfileRegistry, DetectionConfig, DetectionPipeline, HoldCandidate,
};
use image::{Rgb, RgbImage};

fn wall(width: u32, height: u32, holds: &[(u32, u32, [u8; 3])]) -> RgbImage {
    // light grey wall: v high, s zero, matches nothing
    let mut image = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
    for &(x, y, rgb) in holds {
        for dy in 0..6 {
            for dx in 0..6 {
                if x + dx < width && y + dy < height {
                    image.put_pixel(x + dx, y + dy, Rgb(rgb));
                }
            }
        }
    }
    image
}

#[test]
fn painted_holds_are_found_once_each() {
    let image = wall(
        200,
        120,
        &[
            (20, 20, [220, 20, 20]),
            (100, 20, [30, 60, 230]),
            (20, 80, [40, 200, 40]),
            (150, 80, [230, 210, 30]),
        ],
    );
    let pipeline = DetectionPipeline::new(DetectionConfig::default()).expect("pipeline");
    let result = pipeline.detect(&encode_png(&image).expect("png"));

    assert_eq!(result.total_holds(), 4);
    assert_eq!(
        result.colors().collect::<Vec<_>>(),
        ["red", "blue", "green", "yellow"]
    );
    for group in result.groups() {
        assert_eq!(group.holds.len(), 1, "{} detected more than once", group.color);
        let hold = group.holds[0];
        assert!((0.0..=100.0).contains(&hold.confidence));
    }
}

#[test]
fn cross_colour_claim_blocks_neighbouring_hold() {
    // a blue hold 15 px from a red one is swallowed by the red claim
    let mut image = RgbImage::from_pixel(60, 60, Rgb([200, 200, 200]));
    image.put_pixel(10, 10, Rgb([255, 0, 0]));
    image.put_pixel(25, 25, Rgb([0, 0, 255]));
    let candidates = scan(&image, &ColorProfileRegistry::default(), 5).expect("scan");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].color, "red");
    assert_eq!((candidates[0].x, candidates[0].y), (10, 10));
}

#[test]
fn registry_order_decides_who_claims_a_region() {
    let image = wall(40, 40, &[(10, 10, [255, 0, 0])]);
    let wide_first = ColorProfileRegistry::new(vec![
        ColorProfile::named("any-warm", 0.0, 60.0, 30.0, 30.0),
        ColorProfile::new("red", 0.0, 10.0, 50.0, 50.0),
    ])
    .expect("registry");
    let red_first = ColorProfileRegistry::new(vec![
        ColorProfile::new("red", 0.0, 10.0, 50.0, 50.0),
        ColorProfile::named("any-warm", 0.0, 60.0, 30.0, 30.0),
    ])
    .expect("registry");

    let first = scan(&image, &wide_first, 5).expect("scan");
    let second = scan(&image, &red_first, 5).expect("scan");
    assert_eq!(first[0].color, "any-warm");
    assert_eq!(second[0].color, "red");
    assert_eq!(first.len(), second.len());
}

#[test]
fn grouping_matches_documented_example() {
    let result = group(&[
        HoldCandidate {
            x: 1,
            y: 1,
            color: "red".to_string(),
            confidence: 80.0,
        },
        HoldCandidate {
            x: 2,
            y: 2,
            color: "blue".to_string(),
            confidence: 70.0,
        },
    ]);
    assert_eq!(result.total_holds(), 2);
    assert_eq!(result.holds_for("red").map(|h| h[0].x), Some(1));
    assert_eq!(result.holds_for("blue").map(|h| h[0].confidence), Some(70.0));
}

#[test]
fn scanning_twice_is_identical() {
    let image = RgbImage::from_fn(160, 120, |x, y| {
        Rgb([
            ((x * 13 + y) % 256) as u8,
            ((y * 9) % 256) as u8,
            ((x * 5 + y * 3) % 256) as u8,
        ])
    });
    let bytes = encode_png(&image).expect("png");
    let pipeline = DetectionPipeline::new(DetectionConfig::default()).expect("pipeline");
    assert_eq!(pipeline.detect(&bytes), pipeline.detect(&bytes));
    assert_eq!(
        scan(&image, &ColorProfileRegistry::default(), 5).expect("scan"),
        scan(&image, &ColorProfileRegistry::default(), 5).expect("scan")
    );
}
