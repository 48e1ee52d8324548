//! Inverse kinematics for single segment chains.
//!
//! This module contains:
//! - [`ChainSolver`] - common interface of the solvers
//! - [`CcdSolver`] - Cyclic Coordinate Descent with a twist sweep on stall
//! - [`FabrikSolver`] - Forward And Backward Reaching IK
//! - [`ConstraintChecker`] - elliptical cone and twist limit evaluation
//!
//! Both solvers fall back to stretching the chain straight at the target
//! when it is out of reach.

pub mod ccd;
pub mod chain;
pub mod constraints;
pub mod fabrik;
pub mod solver;

pub use ccd::CcdSolver;
pub use constraints::{ConeCorrection, ConstraintChecker, TwistCorrection};
pub use fabrik::FabrikSolver;
pub use solver::{ChainSolver, SolverSettings};
