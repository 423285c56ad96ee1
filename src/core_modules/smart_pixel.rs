// THEORY:
// The `SmartPixel` module provides the judging capabilities of the detector. It is a
// "smart" wrapper around a "dumb" `Pixel`: it converts the pixel to HSV once and then
// answers two questions for any colour profile:
//
// 1.  **Does it match?** (`matches`) The band test from the profile itself.
// 2.  **How well?** (`confidence`) A 0..100 score of how close the sample is to the
//     ideal hold of that colour: the centre of the profile's hue range, and an
//     "ideal" saturation and value of 75%. The three distances are averaged with
//     equal weight and subtracted from 100, floored at 0.
//
// Caching the HSV conversion matters because one sample is tested against every
// profile of the registry.

pub mod smart_pixel {
    use crate::core_modules::color_profile::ColorProfile;
    use crate::core_modules::pixel::pixel::{Hsv, Pixel};

    pub type Confidence = f64;

    /// Saturation and value (percent) of a textbook hold colour.
    pub const IDEAL_SATURATION: f64 = 75.0;
    pub const IDEAL_VALUE: f64 = 75.0;
    pub const MAX_CONFIDENCE: Confidence = 100.0;

    /// Scores how well `hsv` fits `profile`, in [0, 100].
    pub fn score(hsv: &Hsv, profile: &ColorProfile) -> Confidence {
        let hue_difference = (hsv.hue - profile.hue_center()).abs();
        let saturation_difference = (hsv.saturation - IDEAL_SATURATION).abs();
        let value_difference = (hsv.value - IDEAL_VALUE).abs();

        let penalty = (hue_difference + saturation_difference + value_difference) / 3.0;
        (MAX_CONFIDENCE - penalty).max(0.0)
    }

    /// A sampled pixel with its HSV conversion cached.
    #[derive(Debug, Clone, Copy)]
    pub struct SmartPixel {
        /// The raw sample this `SmartPixel` is judging.
        pub pixel: Pixel,
        hsv: Hsv,
    }

    impl SmartPixel {
        pub fn new(pixel: Pixel) -> Self {
            Self {
                hsv: pixel.hsv(),
                pixel,
            }
        }

        pub fn hsv(&self) -> &Hsv {
            &self.hsv
        }

        pub fn matches(&self, profile: &ColorProfile) -> bool {
            profile.contains(&self.hsv)
        }

        pub fn confidence(&self, profile: &ColorProfile) -> Confidence {
            score(&self.hsv, profile)
        }
    }
}
