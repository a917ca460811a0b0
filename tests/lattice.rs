#![warn(clippy::pedantic)]

use approx::assert_relative_eq;
use supercompressible::{
    assemble, generate, Feasibility, LatticeError, ParameterError, StepKind, StructuralParameters,
};

fn reference_design() -> StructuralParameters {
    StructuralParameters {
        n_longerons: 3,
        n_storeys: 1,
        bottom_diameter: 100.0,
        top_diameter: 82.42,
        pitch: 115.223,
        twist_angle: 0.0,
        transition_length_ratio: 1.0,
        ..StructuralParameters::default()
    }
}

#[test]
fn reference_design_matches_closed_form_profile() {
    let params = reference_design();
    let lattice = generate(&params, &Feasibility::Unchecked).expect("valid lattice");

    for longeron in 0..3 {
        let base = lattice.joint(0, longeron).expect("bottom joint");
        let top = lattice.joint(1, longeron).expect("top joint");
        assert_relative_eq!(base.radial_distance(), 50.0, epsilon = 1.0e-9);
        assert_relative_eq!(top.radial_distance(), 41.21, epsilon = 1.0e-9);
        assert_relative_eq!(top.z, 115.223);
        assert_eq!(base.z, 0.0);
    }

    let first = lattice.joint(0, 0).expect("bottom joint");
    assert_relative_eq!(first.x, 50.0);
    assert_relative_eq!(first.y, 0.0);
}

#[test]
fn untwisted_longerons_stay_in_their_plane() {
    let params = reference_design();
    let lattice = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
    for longeron in 0..3 {
        let points = lattice.longeron(longeron);
        let base_angle = points[0].y.atan2(points[0].x);
        let top_angle = points[1].y.atan2(points[1].x);
        assert_relative_eq!(base_angle, top_angle, epsilon = 1.0e-12);
    }
}

#[test]
fn both_stages_see_identical_geometry() {
    let params = StructuralParameters {
        n_storeys: 6,
        twist_angle: 0.8,
        transition_length_ratio: 0.75,
        ..reference_design()
    };
    let buckle = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
    let riks = generate(
        &params,
        &Feasibility::Checked {
            job: StepKind::LinearBuckle.job_name().to_string(),
            coilable: true,
        },
    )
    .expect("coilable lattice");
    assert_eq!(buckle, riks);

    let buckle_model = assemble(&buckle, &params, StepKind::LinearBuckle).expect("assembled");
    let riks_model = assemble(&riks, &params, StepKind::RiksContinuation).expect("assembled");
    assert_eq!(buckle_model.model.mesh().nodes, riks_model.model.mesh().nodes);
}

#[test]
fn invalid_parameters_are_reported() {
    let params = StructuralParameters {
        n_longerons: 2,
        ..reference_design()
    };
    let error = generate(&params, &Feasibility::Unchecked).expect_err("too few longerons");
    assert_eq!(
        error,
        LatticeError::InvalidParameters(ParameterError::TooFewLongerons(2))
    );
}
