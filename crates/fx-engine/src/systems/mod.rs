pub mod vfx;
