//! Geometric types and the closed-form generator for twisted, tapered lattices.

use std::f64::consts::PI;

use nalgebra::Vector3;
use ndarray::Array3;
use tracing::debug;

use crate::errors::LatticeError;
use crate::params::StructuralParameters;

/// Position in three dimensional space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
    /// Distance along the global Z axis.
    pub z: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The global origin.
    #[must_use]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Distance from the global Z axis.
    #[must_use]
    pub fn radial_distance(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl From<Vector3<f64>> for Point {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Point> for Vector3<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use supercompressible::point;
///
/// let origin = point(0.0, 0.0, 0.0);
/// assert_eq!(origin.x, 0.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

/// Verdict of a preceding analysis stage on whether the geometry may be built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feasibility {
    /// No preceding stage exists (the linear buckling stage).
    Unchecked,
    /// A preceding stage evaluated the geometry.
    Checked {
        /// Job that produced the verdict.
        job: String,
        /// Whether the geometry can be coiled.
        coilable: bool,
    },
}

/// Profile quantities shared by every joint of one storey ring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ring {
    /// Height of the ring.
    pub z: f64,
    /// Radius of the ring.
    pub radius: f64,
    /// Rotation of the ring about the Z axis, in radians.
    pub twist: f64,
}

/// Joint coordinates of a generated lattice.
///
/// Coordinates are indexed by `(storey, longeron, axis)`; storey `0` is the
/// bottom ring and storey `n_storeys` the top ring.
#[derive(Clone, Debug, PartialEq)]
pub struct JointLattice {
    /// Joint coordinates with shape `(n_storeys + 1, n_longerons, 3)`.
    coordinates: Array3<f64>,
    /// Per-storey profile, one entry per ring.
    rings: Vec<Ring>,
}

impl JointLattice {
    /// Wrap coordinates produced elsewhere, deriving the ring profiles from them.
    ///
    /// Returns `None` unless the array has shape `(rings, longerons, 3)` with at
    /// least one ring and one longeron.
    #[must_use]
    pub fn from_coordinates(coordinates: Array3<f64>) -> Option<Self> {
        let shape = coordinates.shape();
        if shape[0] == 0 || shape[1] == 0 || shape[2] != 3 {
            return None;
        }
        let rings = coordinates
            .outer_iter()
            .map(|ring| {
                let n = ring.shape()[0] as f64;
                let radius = ring
                    .outer_iter()
                    .map(|joint| joint[0].hypot(joint[1]))
                    .sum::<f64>()
                    / n;
                Ring {
                    z: ring[[0, 2]],
                    radius,
                    twist: ring[[0, 1]].atan2(ring[[0, 0]]),
                }
            })
            .collect();
        Some(Self { coordinates, rings })
    }

    /// Number of longerons.
    #[must_use]
    pub fn n_longerons(&self) -> usize {
        self.coordinates.shape()[1]
    }

    /// Number of storeys (one less than the number of rings).
    #[must_use]
    pub fn n_storeys(&self) -> usize {
        self.coordinates.shape()[0] - 1
    }

    /// Raw coordinate array.
    #[must_use]
    pub fn coordinates(&self) -> &Array3<f64> {
        &self.coordinates
    }

    /// Position of a joint, or `None` when either index is out of range.
    #[must_use]
    pub fn joint(&self, storey: usize, longeron: usize) -> Option<Point> {
        if storey > self.n_storeys() || longeron >= self.n_longerons() {
            return None;
        }
        Some(Point::new(
            self.coordinates[[storey, longeron, 0]],
            self.coordinates[[storey, longeron, 1]],
            self.coordinates[[storey, longeron, 2]],
        ))
    }

    /// Joints of one longeron from bottom to top.
    #[must_use]
    pub fn longeron(&self, longeron: usize) -> Vec<Point> {
        (0..=self.n_storeys())
            .filter_map(|storey| self.joint(storey, longeron))
            .collect()
    }

    /// Profile of a storey ring.
    #[must_use]
    pub fn ring(&self, storey: usize) -> Option<&Ring> {
        self.rings.get(storey)
    }

    /// Profiles of all rings from bottom to top.
    #[must_use]
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }
}

/// Twist of the ring at height `z`.
///
/// The twist ramps linearly from zero to `twist_angle` over the transition
/// height and holds constant above it.
#[must_use]
pub fn twist_at(params: &StructuralParameters, z: f64) -> f64 {
    params.twist_angle * (z / params.transition_height()).min(1.0)
}

/// Ratio between the ring radius at height `z` and the bottom radius.
#[must_use]
pub fn radius_factor_at(params: &StructuralParameters, z: f64) -> f64 {
    1.0 - z.min(params.transition_height()) / params.mast_height() * params.cone_slope()
}

/// Generate the joint lattice for a set of structural parameters.
///
/// The result is a pure function of `params`: both analysis stages rebuild the
/// exact same coordinates, which the imperfection seeding relies on.
///
/// # Errors
///
/// Returns [`LatticeError::PreconditionFailure`] when a preceding stage declared
/// the geometry infeasible and [`LatticeError::InvalidParameters`] when `params`
/// fails validation.
///
/// # Examples
/// ```
/// use supercompressible::{generate, Feasibility, StructuralParameters};
///
/// let params = StructuralParameters::default();
/// let lattice = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
/// assert_eq!(lattice.n_longerons(), 3);
/// assert_eq!(lattice.ring(0).map(|ring| ring.radius), Some(50.0));
/// ```
pub fn generate(
    params: &StructuralParameters,
    feasibility: &Feasibility,
) -> Result<JointLattice, LatticeError> {
    if let Feasibility::Checked {
        job,
        coilable: false,
    } = feasibility
    {
        return Err(LatticeError::PreconditionFailure { job: job.clone() });
    }
    params.validate()?;

    let n_rings = params.n_storeys + 1;
    let n_longerons = params.n_longerons;
    let mast_radius = params.mast_radius();
    let angular_step = 2.0 * PI / n_longerons as f64;

    let mut coordinates = Array3::<f64>::zeros((n_rings, n_longerons, 3));
    let mut rings = Vec::with_capacity(n_rings);
    for storey in 0..n_rings {
        let z = params.pitch * storey as f64;
        let twist = twist_at(params, z);
        let factor = radius_factor_at(params, z);
        for longeron in 0..n_longerons {
            let angle = angular_step * longeron as f64 + twist;
            coordinates[[storey, longeron, 0]] = mast_radius * angle.cos() * factor;
            coordinates[[storey, longeron, 1]] = mast_radius * angle.sin() * factor;
            coordinates[[storey, longeron, 2]] = z;
        }
        rings.push(Ring {
            z,
            radius: mast_radius * factor,
            twist,
        });
    }

    debug!(
        n_longerons,
        n_storeys = params.n_storeys,
        "generated joint lattice"
    );
    Ok(JointLattice { coordinates, rings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn twisted() -> StructuralParameters {
        StructuralParameters {
            n_longerons: 5,
            n_storeys: 8,
            twist_angle: 1.2,
            transition_length_ratio: 0.5,
            ..StructuralParameters::default()
        }
    }

    #[test]
    fn point_to_vector_roundtrip() {
        let origin = Point::new(1.0, 2.0, 3.0);
        let vector: Vector3<f64> = origin.into();
        assert_eq!(vector, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(Point::from(vector), origin);
    }

    #[test]
    fn generation_is_deterministic() {
        let params = twisted();
        let first = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
        let second = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
        assert_eq!(first, second);
    }

    #[test]
    fn twist_ramps_then_holds() {
        let params = twisted();
        let lattice = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
        let rings = lattice.rings();

        assert_eq!(rings[0].twist, 0.0);
        let transition = params.transition_height();
        for pair in rings.windows(2) {
            if pair[1].z <= transition {
                assert!(pair[1].twist > pair[0].twist);
            }
        }
        for ring in rings.iter().filter(|ring| ring.z >= transition) {
            assert_eq!(ring.twist, params.twist_angle);
        }
    }

    #[test]
    fn radius_shrinks_until_transition() {
        let params = twisted();
        let lattice = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
        let rings = lattice.rings();
        let transition = params.transition_height();

        assert_eq!(rings[0].radius, params.mast_radius());
        for pair in rings.windows(2) {
            assert!(pair[1].z >= pair[0].z);
            if pair[1].z <= transition {
                assert!(pair[1].radius < pair[0].radius);
            } else {
                assert_eq!(pair[1].radius, pair[0].radius);
            }
        }
    }

    #[test]
    fn joints_lie_on_their_ring() {
        let params = twisted();
        let lattice = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
        for (storey, ring) in lattice.rings().iter().enumerate() {
            for longeron in 0..params.n_longerons {
                let joint = lattice.joint(storey, longeron).expect("joint in range");
                assert_relative_eq!(joint.radial_distance(), ring.radius, epsilon = 1.0e-9);
                assert_eq!(joint.z, ring.z);
            }
        }
        assert!(lattice.joint(params.n_storeys + 1, 0).is_none());
        assert!(lattice.joint(0, params.n_longerons).is_none());
    }

    #[test]
    fn wraps_external_coordinates() {
        let params = twisted();
        let generated = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
        let wrapped = JointLattice::from_coordinates(generated.coordinates().clone())
            .expect("well-formed shape");
        assert_eq!(wrapped.coordinates(), generated.coordinates());
        assert_eq!(wrapped.n_storeys(), params.n_storeys);
        assert_relative_eq!(wrapped.rings()[0].radius, params.mast_radius(), epsilon = 1.0e-9);
        assert!(JointLattice::from_coordinates(Array3::zeros((2, 3, 2))).is_none());
    }

    #[test]
    fn infeasible_geometry_is_refused() {
        let feasibility = Feasibility::Checked {
            job: "Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE".to_string(),
            coilable: false,
        };
        let error = generate(&StructuralParameters::default(), &feasibility)
            .expect_err("non-coilable geometry rejected");
        assert_eq!(
            error,
            LatticeError::PreconditionFailure {
                job: "Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE".to_string()
            }
        );
    }
}
