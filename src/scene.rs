pub mod bounds;
pub mod camera;
pub mod lights;
pub mod model;
pub mod normalize;
