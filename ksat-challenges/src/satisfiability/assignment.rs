use rand::Rng;
use serde::{Deserialize, Serialize};

/// A total assignment over variables `1..=n`, stored densely so that
/// lookups in the flip loops never hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    #[serde(with = "bool_vec_as_u8")]
    variables: Vec<bool>,
}

impl Assignment {
    /// `values[i]` is the value of variable `i + 1`.
    pub fn new(values: Vec<bool>) -> Self {
        Self { variables: values }
    }

    pub fn all(num_variables: usize, value: bool) -> Self {
        Self::new(vec![value; num_variables])
    }

    pub fn random<R: Rng + ?Sized>(num_variables: usize, rng: &mut R) -> Self {
        Self::new((0..num_variables).map(|_| rng.gen::<bool>()).collect())
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn value(&self, variable: usize) -> bool {
        self.variables[variable - 1]
    }

    pub fn set(&mut self, variable: usize, value: bool) {
        self.variables[variable - 1] = value;
    }

    #[inline]
    pub fn flip(&mut self, variable: usize) {
        let slot = &mut self.variables[variable - 1];
        *slot = !*slot;
    }

    /// Copy of `self` with `variable` flipped.
    pub fn flipped(&self, variable: usize) -> Self {
        let mut neighbour = self.clone();
        neighbour.flip(variable);
        neighbour
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.variables
    }

    pub fn into_vec(self) -> Vec<bool> {
        self.variables
    }

    /// `(variable, value)` pairs in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.variables
            .iter()
            .enumerate()
            .map(|(idx, &value)| (idx + 1, value))
    }
}

/// Values go out as `0`/`1`; either `0`/`1` or booleans are read back.
mod bool_vec_as_u8 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bit {
        Int(u8),
        Bool(bool),
    }

    pub fn serialize<S: Serializer>(data: &Vec<bool>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(data.iter().map(|&value| u8::from(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<bool>, D::Error> {
        Vec::<Bit>::deserialize(deserializer)?
            .into_iter()
            .map(|bit| match bit {
                Bit::Bool(value) => Ok(value),
                Bit::Int(0) => Ok(false),
                Bit::Int(1) => Ok(true),
                Bit::Int(other) => Err(de::Error::custom(format!(
                    "assignment values must be 0 or 1, got {}",
                    other
                ))),
            })
            .collect()
    }
}
