pub mod annotations;
pub mod renderer;
