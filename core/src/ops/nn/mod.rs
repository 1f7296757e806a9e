mod activations;
mod dense;
mod dropout;

pub use self::activations::Activation;
pub(crate) use self::activations::softmax_in_place;
pub use self::dense::Dense;
pub use self::dropout::Dropout;
