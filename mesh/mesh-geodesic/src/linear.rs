//! Sparse linear solves used by the heat method.

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;
use nalgebra_sparse::factorization::CscCholesky;
use thiserror::Error;

/// Failure reported by a [`SparseSolver`].
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct SolveError {
    /// Backend-specific description.
    pub reason: String,
}

impl SolveError {
    /// Create an error from any message.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Solver for symmetric positive definite sparse systems `A x = b`.
///
/// The heat method performs two solves per query through this trait, so any
/// backend (a GPU library, an iterative method) can be plugged into
/// [`GeodesicSolver::with_sparse_solver`](crate::GeodesicSolver::with_sparse_solver).
pub trait SparseSolver {
    /// Solve `matrix * x = rhs`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError`] if the system cannot be solved, for example
    /// when it is not positive definite.
    fn solve(&self, matrix: &CscMatrix<f64>, rhs: &[f64]) -> Result<Vec<f64>, SolveError>;
}

/// Sparse Cholesky factorization from `nalgebra-sparse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CholeskySolver;

impl SparseSolver for CholeskySolver {
    fn solve(&self, matrix: &CscMatrix<f64>, rhs: &[f64]) -> Result<Vec<f64>, SolveError> {
        if matrix.nrows() != rhs.len() || matrix.ncols() != rhs.len() {
            return Err(SolveError::new(format!(
                "system is {}x{} but right-hand side has {} entries",
                matrix.nrows(),
                matrix.ncols(),
                rhs.len()
            )));
        }

        let factor = CscCholesky::factor(matrix).map_err(|e| SolveError::new(e.to_string()))?;
        let b = DMatrix::from_column_slice(rhs.len(), 1, rhs);
        let x = factor.solve(&b);

        if x.iter().any(|v| !v.is_finite()) {
            return Err(SolveError::new("solution is not finite"));
        }
        Ok(x.as_slice().to_vec())
    }
}
