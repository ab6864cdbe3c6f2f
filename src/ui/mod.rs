/// User interface components
///
/// - Image slot canvas with pan/zoom input and text overlay (canvas.rs)

pub mod canvas;
