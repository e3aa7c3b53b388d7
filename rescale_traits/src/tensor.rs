use std::fmt;

/// A scale or shift value: one number, or one number per species.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    Scalar(f64),
    PerSpecies(Vec<f64>),
}

impl Tensor {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Tensor::Scalar(v) => Some(*v),
            Tensor::PerSpecies(_) => None,
        }
    }

    /// Smallest entry; `None` for an empty per-species vector.
    ///
    /// NaN propagates: any NaN entry makes the minimum NaN.
    pub fn min(&self) -> Option<f64> {
        match self {
            Tensor::Scalar(v) => Some(*v),
            Tensor::PerSpecies(vs) => vs
                .iter()
                .copied()
                .reduce(|a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }),
        }
    }

    /// Value that applies to `species`. Scalars broadcast.
    pub fn at(&self, species: usize) -> Option<f64> {
        match self {
            Tensor::Scalar(v) => Some(*v),
            Tensor::PerSpecies(vs) => vs.get(species).copied(),
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Tensor {
        match self {
            Tensor::Scalar(v) => Tensor::Scalar(f(*v)),
            Tensor::PerSpecies(vs) => Tensor::PerSpecies(vs.iter().map(|v| f(*v)).collect()),
        }
    }

    pub fn divided_by(&self, divisor: f64) -> Tensor {
        self.map(|v| v / divisor)
    }
}

impl From<f64> for Tensor {
    fn from(v: f64) -> Self {
        Tensor::Scalar(v)
    }
}

impl From<Vec<f64>> for Tensor {
    fn from(vs: Vec<f64>) -> Self {
        Tensor::PerSpecies(vs)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tensor::Scalar(v) => write!(f, "{v}"),
            Tensor::PerSpecies(vs) => {
                f.write_str("[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_of_vector_and_scalar() {
        assert_eq!(Tensor::from(vec![4.0, 1.5, 6.0]).min(), Some(1.5));
        assert_eq!(Tensor::from(3.0).min(), Some(3.0));
        assert_eq!(Tensor::PerSpecies(Vec::new()).min(), None);
    }

    #[test]
    fn min_propagates_nan() {
        assert!(Tensor::from(vec![f64::NAN, 4.0]).min().unwrap().is_nan());
        assert!(Tensor::from(vec![4.0, f64::NAN, 1.0]).min().unwrap().is_nan());
    }

    #[test]
    fn scalar_broadcasts_per_species() {
        let t = Tensor::from(2.0);
        assert_eq!(t.at(0), Some(2.0));
        assert_eq!(t.at(7), Some(2.0));
        assert_eq!(Tensor::from(vec![1.0]).at(1), None);
    }

    #[test]
    fn display_matches_list_syntax() {
        assert_eq!(Tensor::from(vec![2.0, 3.5]).to_string(), "[2, 3.5]");
        assert_eq!(Tensor::from(0.25).to_string(), "0.25");
    }
}
