mod flatten;
mod reshape;

pub use self::flatten::Flatten;
pub use self::reshape::Reshape;
