pub mod color_profile;
pub mod grid_scanner;
pub mod hold_grouper;
pub mod launch_data;
pub mod launch_verifier;
pub mod pixel;
pub mod smart_pixel;
pub mod utils;
