//! Small client helpers shared by pages and state modules.

pub mod mandelbrot;
pub mod time;
