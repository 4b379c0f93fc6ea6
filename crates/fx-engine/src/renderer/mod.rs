pub mod camera;
pub mod instance;

pub use camera::ScreenTransform;
pub use instance::ScreenSprite;
