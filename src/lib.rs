pub mod config;
pub mod geometry;
pub mod ik;
pub mod io;
pub mod localization;
pub mod skeleton;
pub mod system;
pub mod tracking;
