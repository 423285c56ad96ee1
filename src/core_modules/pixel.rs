// THEORY (Pixel Colour Space):
// The `Pixel` module is the most fundamental unit of the detector. A `Pixel` is a
// "dumb" data container for one sampled image location plus its RGB channels, and the
// only heuristic it knows is its own conversion into hue/saturation/value.
//
// HSV is used instead of raw RGB because hue stays put when a hold is lit unevenly:
// a red hold in shadow and a red hold under a spotlight differ in value, not in hue.
// That makes a coarse "is this red?" test a simple band check.
//
// The conversion is pinned down exactly, because stored detection results and tests
// depend on the precise numbers:
// - channels are normalised to 0..1 as f64
// - hue comes from whichever channel is the maximum (hexagonal sector formula),
//   is rounded to a whole degree with ties going up, and is folded into [0, 360)
// - saturation (chroma / max) and value (max) are scaled to 0..100 and NOT rounded
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbours or other samples.
// 2) Determinism: the same bytes always give bit-identical HSV values.

pub mod pixel {
    pub type Channel = u8;
    pub type NormalizedChannel = f64;
    pub type Hue = f64;
    pub type Saturation = f64;
    pub type Value = f64;
    pub type Coordinate = u32;

    /// Scale of the saturation and value axes.
    pub const PERCENT_SCALE: f64 = 100.0;
    /// Width of one hue sector in degrees.
    const DEGREES_PER_SECTOR: f64 = 60.0;
    const FULL_TURN: f64 = 360.0;

    /// A colour in hue/saturation/value space.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Hsv {
        /// Whole degrees in [0, 360).
        pub hue: Hue,
        /// Percent in [0, 100].
        pub saturation: Saturation,
        /// Percent in [0, 100].
        pub value: Value,
    }

    /// A "dumb" data container representing one sampled image location.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Pixel {
        /// Column of the sample in the source image.
        pub x: Coordinate,
        /// Row of the sample in the source image.
        pub y: Coordinate,
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub fn new(x: Coordinate, y: Coordinate, rgb: [Channel; 3]) -> Self {
            Pixel {
                x,
                y,
                red: rgb[0],
                green: rgb[1],
                blue: rgb[2],
            }
        }

        /// This sample's colour in HSV space.
        pub fn hsv(&self) -> Hsv {
            convert(self.red, self.green, self.blue)
        }
    }

    /// Converts 8-bit RGB channels into HSV.
    ///
    /// - Hue is 0 for any grey (including black and white).
    /// - When two channels tie for the maximum, red wins over green and green over blue.
    pub fn convert(red: Channel, green: Channel, blue: Channel) -> Hsv {
        let red_normalized = red as NormalizedChannel / 255.0;
        let green_normalized = green as NormalizedChannel / 255.0;
        let blue_normalized = blue as NormalizedChannel / 255.0;

        let maximum_channel = red_normalized.max(green_normalized.max(blue_normalized));
        let minimum_channel = red_normalized.min(green_normalized.min(blue_normalized));
        let chroma = maximum_channel - minimum_channel;

        let mut sector = 0.0;
        if chroma != 0.0 {
            sector = if maximum_channel == red_normalized {
                // `%` keeps the sign of the dividend; negatives are folded below.
                ((green_normalized - blue_normalized) / chroma) % 6.0
            } else if maximum_channel == green_normalized {
                (blue_normalized - red_normalized) / chroma + 2.0
            } else {
                (red_normalized - green_normalized) / chroma + 4.0
            };
        }

        let mut hue = round_half_up(sector * DEGREES_PER_SECTOR);
        if hue < 0.0 {
            hue += FULL_TURN;
        }

        let saturation = if maximum_channel == 0.0 {
            0.0
        } else {
            chroma / maximum_channel
        };

        Hsv {
            hue,
            saturation: saturation * PERCENT_SCALE,
            value: maximum_channel * PERCENT_SCALE,
        }
    }

    /// Nearest integer, with .5 going towards positive infinity.
    #[inline]
    fn round_half_up(degrees: f64) -> f64 {
        (degrees + 0.5).floor()
    }

    impl From<Pixel> for Hsv {
        fn from(pixel: Pixel) -> Self {
            pixel.hsv()
        }
    }
}
