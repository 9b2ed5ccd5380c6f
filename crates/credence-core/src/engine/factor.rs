//! # Factors
//!
//! A [`Factor`] is a non-negative table over a tuple of variables. Factors
//! are created from CPTs at the start of a query, combined and summed out
//! during elimination, and dropped when the query returns.
//!
//! Tables are dense and row-major over the factor's scope (last variable
//! fastest). A factor with an empty scope is a scalar.
//!
//! Operations (Koller & Friedman, ch. 4 and 9):
//! - **reduce**: fix one variable to an observed outcome, dropping its axis
//! - **product**: pointwise product over the union of both scopes, aligning
//!   shared variables
//! - **sum_out**: marginalize one variable away

use smallvec::SmallVec;

use crate::engine::errors::InferenceError;
use crate::engine::network::{BayesNet, Variable, VariableId};

type Axes<T> = SmallVec<[T; 6]>;

#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    scope: Axes<VariableId>,
    cardinalities: Axes<usize>,
    values: Vec<f64>,
}

impl Factor {
    /// The multiplicative identity: a scalar 1.
    pub fn unit() -> Self {
        Self {
            scope: Axes::new(),
            cardinalities: Axes::new(),
            values: vec![1.0],
        }
    }

    /// Builds a factor from an explicit table.
    ///
    /// # Errors
    ///
    /// `ShapeError` if the scope repeats a variable, the cardinalities do not
    /// line up with the scope, the table length is wrong, or any value is
    /// negative or non-finite.
    pub fn new(
        scope: &[VariableId],
        cardinalities: &[usize],
        values: Vec<f64>,
    ) -> Result<Self, InferenceError> {
        if scope.len() != cardinalities.len() {
            return Err(InferenceError::ShapeError(format!(
                "factor scope has {} variables but {} cardinalities",
                scope.len(),
                cardinalities.len()
            )));
        }
        for (idx, id) in scope.iter().enumerate() {
            if scope[..idx].contains(id) {
                return Err(InferenceError::ShapeError(format!(
                    "factor scope lists {:?} twice",
                    id
                )));
            }
        }
        let expected: usize = cardinalities.iter().product();
        if values.len() != expected {
            return Err(InferenceError::ShapeError(format!(
                "factor table has {} entries, expected {}",
                values.len(),
                expected
            )));
        }
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(InferenceError::ShapeError(
                "factor values must be finite and non-negative".into(),
            ));
        }
        Ok(Self {
            scope: scope.iter().copied().collect(),
            cardinalities: cardinalities.iter().copied().collect(),
            values,
        })
    }

    /// Lifts a variable's CPT into a factor over `[parents.., variable]` and
    /// reduces every axis that `observed` binds.
    pub(crate) fn from_cpt(
        network: &BayesNet,
        variable: &Variable,
        observed: &[Option<usize>],
    ) -> Result<Self, InferenceError> {
        let mut scope: Axes<VariableId> = variable.parents().iter().copied().collect();
        scope.push(variable.id());
        let cardinalities: Axes<usize> = scope
            .iter()
            .map(|id| network.resolve(*id).map(Variable::cardinality))
            .collect::<Result<_, _>>()?;

        let mut factor = Self {
            scope,
            cardinalities,
            values: variable.cpt().values().to_vec(),
        };
        if factor.values.len() != factor.cardinalities.iter().product::<usize>() {
            return Err(InferenceError::Internal(format!(
                "CPT of '{}' does not match its declared shape",
                variable.name()
            )));
        }

        let bound: Axes<(VariableId, usize)> = factor
            .scope
            .iter()
            .filter_map(|id| observed.get(id.index()).copied().flatten().map(|o| (*id, o)))
            .collect();
        for (id, outcome) in bound {
            factor = factor.reduce(id, outcome)?;
        }
        Ok(factor)
    }

    pub fn scope(&self) -> &[VariableId] {
        &self.scope
    }

    pub fn cardinalities(&self) -> &[usize] {
        &self.cardinalities
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of axes.
    pub fn width(&self) -> usize {
        self.scope.len()
    }

    /// Number of table entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn mentions(&self, id: VariableId) -> bool {
        self.scope.contains(&id)
    }

    /// Sum of all entries.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Value at an assignment aligned with [`Self::scope`].
    pub fn value(&self, assignment: &[usize]) -> Option<f64> {
        if assignment.len() != self.scope.len() {
            return None;
        }
        let mut idx = 0usize;
        for (&value, &card) in assignment.iter().zip(&self.cardinalities) {
            if value >= card {
                return None;
            }
            idx = idx * card + value;
        }
        self.values.get(idx).copied()
    }

    /// Fixes `id` to `outcome` and drops its axis. A factor that does not
    /// mention `id` is returned unchanged.
    pub fn reduce(&self, id: VariableId, outcome: usize) -> Result<Self, InferenceError> {
        let Some(pos) = self.position(id) else {
            return Ok(self.clone());
        };
        let card = self.cardinalities[pos];
        if outcome >= card {
            return Err(InferenceError::OutOfRange {
                variable: format!("{:?}", id),
                index: outcome,
                cardinality: card,
            });
        }
        let (outer, inner) = self.split_at(pos);

        let mut values = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let base = (o * card + outcome) * inner;
            values.extend_from_slice(&self.values[base..base + inner]);
        }
        Ok(self.without_axis(pos, values))
    }

    /// Marginalizes `id` out. A factor that does not mention `id` is
    /// returned unchanged.
    pub fn sum_out(&self, id: VariableId) -> Self {
        let Some(pos) = self.position(id) else {
            return self.clone();
        };
        let card = self.cardinalities[pos];
        let (outer, inner) = self.split_at(pos);

        let mut values = vec![0.0; outer * inner];
        for o in 0..outer {
            let target = &mut values[o * inner..(o + 1) * inner];
            for k in 0..card {
                let base = (o * card + k) * inner;
                for (slot, v) in target.iter_mut().zip(&self.values[base..base + inner]) {
                    *slot += v;
                }
            }
        }
        self.without_axis(pos, values)
    }

    /// Pointwise product over the union of both scopes.
    ///
    /// The result's scope is `self`'s scope followed by the variables of
    /// `other` that `self` does not mention.
    pub fn product(&self, other: &Self) -> Result<Self, InferenceError> {
        if other.is_scalar() {
            return Ok(self.scaled(other.values[0]));
        }
        if self.is_scalar() {
            return Ok(other.scaled(self.values[0]));
        }

        let mut scope = self.scope.clone();
        let mut cardinalities = self.cardinalities.clone();
        for (id, &card) in other.scope.iter().zip(&other.cardinalities) {
            match self.position(*id) {
                Some(pos) if self.cardinalities[pos] != card => {
                    return Err(InferenceError::Internal(format!(
                        "factor product: {:?} has cardinality {} and {}",
                        id, self.cardinalities[pos], card
                    )));
                }
                Some(_) => {}
                None => {
                    scope.push(*id);
                    cardinalities.push(card);
                }
            }
        }

        let left = self.strides_along(&scope);
        let right = other.strides_along(&scope);
        let len: usize = cardinalities.iter().product();
        let axes = scope.len();

        let mut values = Vec::with_capacity(len);
        let mut counter: Axes<usize> = smallvec::smallvec![0; axes];
        let (mut li, mut ri) = (0usize, 0usize);
        for _ in 0..len {
            values.push(self.values[li] * other.values[ri]);
            for axis in (0..axes).rev() {
                counter[axis] += 1;
                li += left[axis];
                ri += right[axis];
                if counter[axis] < cardinalities[axis] {
                    break;
                }
                li -= left[axis] * cardinalities[axis];
                ri -= right[axis] * cardinalities[axis];
                counter[axis] = 0;
            }
        }

        Ok(Self {
            scope,
            cardinalities,
            values,
        })
    }

    /// Returns the factor with every entry divided by its total, or `None`
    /// when the total is not strictly above `threshold`.
    pub fn normalized(&self, threshold: f64) -> Option<Vec<f64>> {
        let total = self.total();
        if !total.is_finite() || total <= threshold {
            return None;
        }
        Some(self.values.iter().map(|v| v / total).collect())
    }

    fn position(&self, id: VariableId) -> Option<usize> {
        self.scope.iter().position(|v| *v == id)
    }

    /// (product of cardinalities before `pos`, product after `pos`)
    fn split_at(&self, pos: usize) -> (usize, usize) {
        let outer = self.cardinalities[..pos].iter().product();
        let inner = self.cardinalities[pos + 1..].iter().product();
        (outer, inner)
    }

    fn without_axis(&self, pos: usize, values: Vec<f64>) -> Self {
        let mut scope = self.scope.clone();
        let mut cardinalities = self.cardinalities.clone();
        scope.remove(pos);
        cardinalities.remove(pos);
        Self {
            scope,
            cardinalities,
            values,
        }
    }

    /// Stride of each variable of `scope` within this factor's table, zero
    /// for variables this factor does not mention.
    fn strides_along(&self, scope: &[VariableId]) -> Axes<usize> {
        let mut own: Axes<usize> = smallvec::smallvec![0; self.scope.len()];
        let mut stride = 1usize;
        for axis in (0..self.scope.len()).rev() {
            own[axis] = stride;
            stride *= self.cardinalities[axis];
        }
        scope
            .iter()
            .map(|id| self.position(*id).map(|pos| own[pos]).unwrap_or(0))
            .collect()
    }

    fn scaled(&self, by: f64) -> Self {
        Self {
            scope: self.scope.clone(),
            cardinalities: self.cardinalities.clone(),
            values: self.values.iter().map(|v| v * by).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: VariableId = VariableId(0);
    const B: VariableId = VariableId(1);
    const C: VariableId = VariableId(2);

    fn approx(lhs: &[f64], rhs: &[f64]) -> bool {
        lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(l, r)| (l - r).abs() < 1e-12)
    }

    #[test]
    fn new_validates_shape() {
        assert!(Factor::new(&[A, B], &[2, 3], vec![0.0; 6]).is_ok());
        assert!(Factor::new(&[A, B], &[2], vec![0.0; 2]).is_err());
        assert!(Factor::new(&[A, A], &[2, 2], vec![0.0; 4]).is_err());
        assert!(Factor::new(&[A], &[2], vec![0.0; 3]).is_err());
        assert!(Factor::new(&[A], &[2], vec![-0.1, 1.1]).is_err());
    }

    #[test]
    fn value_indexes_row_major() {
        let f = Factor::new(&[A, B], &[2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).expect("f");
        assert_eq!(f.value(&[1, 0]), Some(3.0));
        assert_eq!(f.value(&[0, 2]), Some(2.0));
        assert_eq!(f.value(&[2, 0]), None);
        assert_eq!(f.value(&[0]), None);
    }

    #[test]
    fn reduce_drops_axis() {
        let f = Factor::new(&[A, B], &[2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).expect("f");
        let on_a = f.reduce(A, 1).expect("reduce");
        assert_eq!(on_a.scope(), &[B]);
        assert!(approx(on_a.values(), &[3.0, 4.0, 5.0]));

        let on_b = f.reduce(B, 2).expect("reduce");
        assert_eq!(on_b.scope(), &[A]);
        assert!(approx(on_b.values(), &[2.0, 5.0]));

        assert_eq!(f.reduce(C, 0).expect("noop"), f);
        assert!(f.reduce(B, 3).is_err());
    }

    #[test]
    fn sum_out_marginalizes() {
        let f = Factor::new(&[A, B], &[2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).expect("f");
        let over_b = f.sum_out(A);
        assert_eq!(over_b.scope(), &[B]);
        assert!(approx(over_b.values(), &[3.0, 5.0, 7.0]));

        let over_a = f.sum_out(B);
        assert!(approx(over_a.values(), &[3.0, 12.0]));

        let scalar = over_a.sum_out(A);
        assert!(scalar.is_scalar());
        assert!(approx(scalar.values(), &[15.0]));
    }

    #[test]
    fn product_aligns_shared_axes() {
        // f(A, B) * g(B, C)
        let f = Factor::new(&[A, B], &[2, 2], vec![0.1, 0.9, 0.6, 0.4]).expect("f");
        let g = Factor::new(&[B, C], &[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("g");
        let h = f.product(&g).expect("product");
        assert_eq!(h.scope(), &[A, B, C]);
        assert_eq!(h.len(), 12);
        for a in 0..2 {
            for b in 0..2 {
                for c in 0..3 {
                    let expected = f.value(&[a, b]).unwrap() * g.value(&[b, c]).unwrap();
                    assert!((h.value(&[a, b, c]).unwrap() - expected).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn product_with_permuted_scope() {
        let f = Factor::new(&[A, B], &[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("f");
        let g = Factor::new(&[B, A], &[3, 2], vec![1.0, 0.5, 2.0, 0.25, 3.0, 0.125]).expect("g");
        let h = f.product(&g).expect("product");
        assert_eq!(h.scope(), &[A, B]);
        for a in 0..2 {
            for b in 0..3 {
                let expected = f.value(&[a, b]).unwrap() * g.value(&[b, a]).unwrap();
                assert!((h.value(&[a, b]).unwrap() - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn product_of_disjoint_scopes_is_outer_product() {
        let f = Factor::new(&[A], &[2], vec![0.3, 0.7]).expect("f");
        let g = Factor::new(&[C], &[3], vec![0.2, 0.3, 0.5]).expect("g");
        let h = f.product(&g).expect("product");
        assert!(approx(
            h.values(),
            &[0.06, 0.09, 0.15, 0.14, 0.21, 0.35]
        ));
    }

    #[test]
    fn unit_is_identity() {
        let f = Factor::new(&[A], &[2], vec![0.3, 0.7]).expect("f");
        assert_eq!(Factor::unit().product(&f).expect("p"), f);
        assert_eq!(f.product(&Factor::unit()).expect("p"), f);
    }

    #[test]
    fn product_rejects_mismatched_cardinality() {
        let f = Factor::new(&[A], &[2], vec![0.3, 0.7]).expect("f");
        let g = Factor::new(&[A], &[3], vec![0.2, 0.3, 0.5]).expect("g");
        assert!(matches!(
            f.product(&g),
            Err(InferenceError::Internal(_))
        ));
    }

    #[test]
    fn normalized_rejects_zero_mass() {
        let f = Factor::new(&[A], &[2], vec![1.0, 3.0]).expect("f");
        assert!(approx(&f.normalized(0.0).unwrap(), &[0.25, 0.75]));

        let zero = Factor::new(&[A], &[2], vec![0.0, 0.0]).expect("zero");
        assert!(zero.normalized(0.0).is_none());
    }
}
