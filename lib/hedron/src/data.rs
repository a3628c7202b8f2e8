mod buffer;
mod id;
mod mesh;

pub use buffer::*;
pub use id::*;
pub use mesh::*;
