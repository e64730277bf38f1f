use super::Sigmoid;

const SIGMOID_TAG: &str = "sigmoid";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActFn {
    Sigmoid(Sigmoid),
}
use ActFn::*;

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        Sigmoid(super::Sigmoid::new(amp))
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Sigmoid(a) => a.f(x),
        }
    }

    /// Encodes the activation as stored in checkpoint metadata, e.g. `sigmoid:1`.
    pub fn encode(&self) -> String {
        match self {
            Sigmoid(a) => format!("{SIGMOID_TAG}:{}", a.amp()),
        }
    }

    /// Parses the representation produced by [`ActFn::encode`].
    ///
    /// # Returns
    /// The activation or `None` if the string isn't a known activation.
    pub fn decode(s: &str) -> Option<Self> {
        let (tag, arg) = s.split_once(':').unwrap_or((s, "1"));

        match tag.trim() {
            SIGMOID_TAG => arg.trim().parse().ok().map(Self::sigmoid),
            _ => None,
        }
    }
}
