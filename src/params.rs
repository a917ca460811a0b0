//! Structural parameters that fully determine a supercompressible lattice.

use serde::{Deserialize, Serialize};

use crate::errors::ParameterError;

/// Poisson ratio assigned to the beam section itself.
///
/// The material carries its own ratio derived from the moduli; the section
/// value only feeds the engine's transverse shear stiffness.
pub const SECTION_POISSON_RATIO: f64 = 0.31;

/// Divisor applied to the smaller of radius and pitch to obtain the mesh seed.
pub const MESH_SEED_DIVISOR: f64 = 300.0;

/// Immutable description of a twisted, tapered lattice.
///
/// Missing fields fall back to the reference design when deserialising, so a
/// JSON file only needs to list the values it changes.
///
/// # Examples
///
/// ```
/// use supercompressible::StructuralParameters;
///
/// let params = StructuralParameters::from_json_str(r#"{ "n_storeys": 4 }"#)
///     .expect("valid parameters");
/// assert_eq!(params.n_storeys, 4);
/// assert_eq!(params.n_longerons, 3);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralParameters {
    /// Number of longerons running the height of the mast.
    pub n_longerons: usize,
    /// Number of storeys between the bottom and top rings.
    pub n_storeys: usize,
    /// Diameter of the bottom ring.
    pub bottom_diameter: f64,
    /// Diameter of the top ring.
    pub top_diameter: f64,
    /// Height of a single storey.
    pub pitch: f64,
    /// Total twist between bottom and transition height, in radians.
    pub twist_angle: f64,
    /// Fraction of the mast height over which taper and twist develop.
    pub transition_length_ratio: f64,
    /// Young's modulus of the longeron material.
    pub young_modulus: f64,
    /// Shear modulus of the longeron material.
    pub shear_modulus: f64,
    /// Diameter of the circular longeron cross-section.
    pub longeron_diameter: f64,
    /// Imperfection amplitude as an absolute displacement.
    pub imperfection_fraction: f64,
}

impl Default for StructuralParameters {
    fn default() -> Self {
        Self {
            n_longerons: 3,
            n_storeys: 1,
            bottom_diameter: 100.0,
            top_diameter: 82.42,
            pitch: 115.223,
            twist_angle: 0.0,
            transition_length_ratio: 1.0,
            young_modulus: 3.5e3,
            shear_modulus: 1.38631e3,
            longeron_diameter: 10.0,
            imperfection_fraction: 7.85114e-2,
        }
    }
}

impl StructuralParameters {
    /// Parse parameters from JSON, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when `json` is not a valid parameter object.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check every parameter against its admissible range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParameterError`] encountered.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.n_longerons < 3 {
            return Err(ParameterError::TooFewLongerons(self.n_longerons));
        }
        if self.n_storeys == 0 {
            return Err(ParameterError::NoStoreys);
        }
        let positive = [
            ("bottom_diameter", self.bottom_diameter),
            ("top_diameter", self.top_diameter),
            ("pitch", self.pitch),
            ("young_modulus", self.young_modulus),
            ("shear_modulus", self.shear_modulus),
            ("longeron_diameter", self.longeron_diameter),
        ];
        for (name, value) in positive {
            // NaN fails this comparison too
            if !(value > 0.0 && value.is_finite()) {
                return Err(ParameterError::NonPositive { name, value });
            }
        }
        let ratio = self.transition_length_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ParameterError::TransitionRatioOutOfRange(ratio));
        }
        if !(self.imperfection_fraction >= 0.0 && self.imperfection_fraction.is_finite()) {
            return Err(ParameterError::NegativeImperfection(
                self.imperfection_fraction,
            ));
        }
        if !self.twist_angle.is_finite() {
            return Err(ParameterError::NonFiniteTwist(self.twist_angle));
        }
        Ok(())
    }

    /// Radius of the bottom ring.
    #[must_use]
    pub fn mast_radius(&self) -> f64 {
        self.bottom_diameter / 2.0
    }

    /// Total height of the mast.
    #[must_use]
    pub fn mast_height(&self) -> f64 {
        self.n_storeys as f64 * self.pitch
    }

    /// Height at which taper and twist stop developing.
    #[must_use]
    pub fn transition_height(&self) -> f64 {
        self.transition_length_ratio * self.mast_height()
    }

    /// Relative reduction of the diameter from bottom to top.
    #[must_use]
    pub fn cone_slope(&self) -> f64 {
        (self.bottom_diameter - self.top_diameter) / self.bottom_diameter
    }

    /// Poisson ratio of an isotropic material with the configured moduli.
    #[must_use]
    pub fn poisson_ratio(&self) -> f64 {
        self.young_modulus / (2.0 * self.shear_modulus) - 1.0
    }

    /// Radius of the circular longeron profile.
    #[must_use]
    pub fn profile_radius(&self) -> f64 {
        self.longeron_diameter / 2.0
    }

    /// Global mesh seed size, proportional to the structure's smallest dimension.
    #[must_use]
    pub fn mesh_size(&self) -> f64 {
        self.mast_radius().min(self.pitch) / MESH_SEED_DIVISOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reference_design_is_valid() {
        let params = StructuralParameters::default();
        assert_eq!(params.validate(), Ok(()));
        assert_relative_eq!(params.mast_radius(), 50.0);
        assert_relative_eq!(params.mast_height(), 115.223);
        assert_relative_eq!(params.cone_slope(), 0.1758, epsilon = 1.0e-12);
        assert_relative_eq!(params.mesh_size(), 50.0 / 300.0);
    }

    #[test]
    fn poisson_ratio_follows_moduli() {
        let params = StructuralParameters {
            young_modulus: 200.0,
            shear_modulus: 80.0,
            ..StructuralParameters::default()
        };
        assert_relative_eq!(params.poisson_ratio(), 0.25);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let flat = StructuralParameters {
            pitch: 0.0,
            ..StructuralParameters::default()
        };
        assert_eq!(
            flat.validate(),
            Err(ParameterError::NonPositive {
                name: "pitch",
                value: 0.0
            })
        );

        let ratio = StructuralParameters {
            transition_length_ratio: 1.5,
            ..StructuralParameters::default()
        };
        assert_eq!(
            ratio.validate(),
            Err(ParameterError::TransitionRatioOutOfRange(1.5))
        );

        let storeys = StructuralParameters {
            n_storeys: 0,
            ..StructuralParameters::default()
        };
        assert_eq!(storeys.validate(), Err(ParameterError::NoStoreys));

        let imperfection = StructuralParameters {
            imperfection_fraction: -0.1,
            ..StructuralParameters::default()
        };
        assert_eq!(
            imperfection.validate(),
            Err(ParameterError::NegativeImperfection(-0.1))
        );
    }

    #[test]
    fn json_overrides_only_listed_fields() {
        let params =
            StructuralParameters::from_json_str(r#"{ "pitch": 50.0, "twist_angle": 0.5 }"#)
                .expect("valid json");
        assert_relative_eq!(params.pitch, 50.0);
        assert_relative_eq!(params.twist_angle, 0.5);
        assert_relative_eq!(params.bottom_diameter, 100.0);
    }
}
