//! Declarative finite-element model of a supercompressible lattice.
//!
//! A [`ModelAssembly`] lists everything the external engine needs to build
//! the analysis: wire geometry, sets, material and beam section, local frames,
//! couplings, boundary conditions, contact and the analysis step. It carries
//! no engine state, so the same assembly can be rendered into an input deck
//! or handed to any other solver backend.

use std::collections::HashMap;
use std::ops::Range;

use nalgebra::Vector3;
use petgraph::graph::{Graph, NodeIndex};
use tracing::info;

use crate::deck::{render, InputDeck};
use crate::errors::AssemblyError;
use crate::geometry::{JointLattice, Point};
use crate::params::{StructuralParameters, SECTION_POISSON_RATIO};

/// Name of the deformable part holding every longeron.
pub const LONGERONS_PART: &str = "LONGERONS";
/// Name of the analytic rigid surface part and of its surface.
pub const SURFACE_PART: &str = "ANALYTICAL_SURF";
/// Set holding every longeron element.
pub const ALL_LONGERONS_SET: &str = "ALL_LONGERONS";
/// Circumferential surface wrapped around every longeron.
pub const ALL_LONGERONS_SURFACE: &str = "ALL_LONGERONS_SURF";
/// Reference point tied to the bottom ring and the rigid surface.
pub const BOTTOM_REF_POINT: &str = "ZBOTTOM_REF_POINT";
/// Reference point tied to the top ring, where the load is applied.
pub const TOP_REF_POINT: &str = "ZTOP_REF_POINT";

/// Vertical displacement applied at the top during eigenvalue extraction.
const BUCKLE_PERTURBATION: f64 = -1.0;

/// Kind of analysis the model is assembled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Linear eigenvalue buckling analysis.
    LinearBuckle,
    /// Displacement-controlled arc-length continuation.
    RiksContinuation,
}

impl StepKind {
    /// Name of the engine model.
    #[must_use]
    pub fn model_name(self) -> &'static str {
        match self {
            StepKind::LinearBuckle => "SUPERCOMPRESSIBLE_LIN_BUCKLE",
            StepKind::RiksContinuation => "SUPERCOMPRESSIBLE_RIKS",
        }
    }

    /// Name of the engine job, which also names its input and results files.
    #[must_use]
    pub fn job_name(self) -> &'static str {
        match self {
            StepKind::LinearBuckle => "Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE",
            StepKind::RiksContinuation => "Simul_SUPERCOMPRESSIBLE_RIKS",
        }
    }
}

/// Joint of the wire geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WireJoint {
    /// Storey index of the joint.
    pub storey: usize,
    /// Longeron index of the joint.
    pub longeron: usize,
    /// Position of the joint.
    pub position: Point,
}

/// Straight wire between two consecutive joints of a longeron.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WireSegment {
    /// Longeron the segment belongs to.
    pub longeron: usize,
    /// Length of the segment.
    pub length: f64,
    /// Number of beam elements along the segment.
    pub divisions: usize,
}

/// One longeron: its joints in storey order and its section orientation.
#[derive(Clone, Debug, PartialEq)]
pub struct Longeron {
    /// Name of the element set holding the longeron.
    pub name: String,
    /// Joints from bottom to top.
    pub joints: Vec<NodeIndex>,
    /// First local axis of the beam section.
    pub section_n1: Vector3<f64>,
}

/// Named set of joints.
#[derive(Clone, Debug, PartialEq)]
pub struct JointSet {
    /// Set name.
    pub name: String,
    /// Member joints.
    pub joints: Vec<NodeIndex>,
}

/// Global mesh seeding controls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshSeed {
    /// Target element length.
    pub size: f64,
    /// Maximum deviation factor for curved edges.
    pub deviation_factor: f64,
    /// Minimum element size relative to `size`.
    pub min_size_factor: f64,
    /// Element code assigned to every longeron element.
    pub element_code: &'static str,
}

impl MeshSeed {
    /// Seed derived from the structure's dimensions.
    #[must_use]
    pub fn from_params(params: &StructuralParameters) -> Self {
        Self {
            size: params.mesh_size(),
            deviation_factor: 0.04,
            min_size_factor: 0.001,
            element_code: "B31",
        }
    }

    /// Number of elements placed along a straight edge of `length`.
    #[must_use]
    pub fn divisions(&self, length: f64) -> usize {
        // the small tolerance keeps exact multiples from gaining an element
        let count = (length / self.size * (1.0 - 1.0e-12)).ceil();
        if count.is_finite() && count >= 1.0 {
            count as usize
        } else {
            1
        }
    }
}

/// Isotropic elastic material.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Young's modulus.
    pub young_modulus: f64,
    /// Poisson ratio.
    pub poisson_ratio: f64,
}

/// Circular beam section assigned to every longeron.
#[derive(Clone, Debug, PartialEq)]
pub struct BeamSection {
    /// Section name.
    pub name: String,
    /// Profile name.
    pub profile: String,
    /// Material name.
    pub material: String,
    /// Radius of the circular profile.
    pub radius: f64,
    /// Poisson ratio used for transverse shear.
    pub poisson_ratio: f64,
}

/// Analytic rigid surface extruded from a line.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidSurface {
    /// Part and surface name.
    pub name: String,
    /// Half length of the sketched line.
    pub half_length: f64,
    /// Extrusion depth.
    pub depth: f64,
    /// Axis of the instance rotation.
    pub rotation_axis: Vector3<f64>,
    /// Rotation angle in degrees.
    pub rotation_degrees: f64,
}

/// Reference point used as the control point of constraints.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferencePoint {
    /// Name of the set holding the point.
    pub name: String,
    /// Position of the point.
    pub position: Point,
}

/// Cartesian frame defined by three points.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalFrame {
    /// Datum name.
    pub name: String,
    /// Origin of the frame.
    pub origin: Point,
    /// Point on the first local axis.
    pub axis_point: Point,
    /// Point in the first local plane.
    pub plane_point: Point,
}

/// Kinematic coupling between a joint and a reference point.
#[derive(Clone, Debug, PartialEq)]
pub struct Coupling {
    /// Constraint name.
    pub name: String,
    /// Controlling reference point set.
    pub reference_point: String,
    /// Constrained joint set.
    pub joint_set: String,
    /// Local frame in which the degrees of freedom are expressed.
    pub frame: String,
    /// Constrained flags for `u1, u2, u3, ur1, ur2, ur3`.
    pub constrained: [bool; 6],
}

impl Coupling {
    /// One-based degrees of freedom that are constrained.
    pub fn constrained_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.constrained
            .iter()
            .enumerate()
            .filter(|(_, constrained)| **constrained)
            .map(|(dof, _)| dof + 1)
    }
}

/// Boundary condition on a reference point.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundaryCondition {
    /// All six degrees of freedom fixed.
    Fixed {
        /// Boundary condition name.
        name: String,
        /// Restrained set.
        region: String,
    },
    /// Prescribed displacement along one degree of freedom.
    Displacement {
        /// Boundary condition name.
        name: String,
        /// Loaded set.
        region: String,
        /// One-based degree of freedom.
        dof: usize,
        /// Prescribed value.
        value: f64,
    },
}

/// Surface-to-surface contact with hard normal behaviour.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactInteraction {
    /// Interaction name.
    pub name: String,
    /// Interaction property name.
    pub property: String,
    /// Master surface as `instance.surface`.
    pub master: String,
    /// Slave surface as `instance.surface`.
    pub slave: String,
    /// Contact area used for the property's geometric data.
    pub contact_area: f64,
    /// Whether the surfaces may separate after closing.
    pub allow_separation: bool,
}

/// Analysis step.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisStep {
    /// Eigenvalue buckling extraction.
    Buckle {
        /// Step name.
        name: String,
        /// Number of eigenmodes requested.
        eigenvalues: usize,
    },
    /// Static arc-length continuation with geometric nonlinearity.
    Riks {
        /// Step name.
        name: String,
        /// Maximum number of increments.
        max_increments: usize,
        /// Initial arc length increment.
        initial_arc_increment: f64,
        /// Maximum arc length increment.
        max_arc_increment: f64,
    },
}

impl AnalysisStep {
    /// Step name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            AnalysisStep::Buckle { name, .. } | AnalysisStep::Riks { name, .. } => name,
        }
    }
}

/// Output written by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputRequest {
    /// History output, optionally restricted to a region.
    History {
        /// Request name.
        name: String,
        /// Region, whole model when `None`.
        region: Option<String>,
        /// Requested variables.
        variables: Vec<&'static str>,
    },
    /// Nodal results written to the results file for later imperfection seeding.
    NodeFile {
        /// Requested variables.
        variables: Vec<&'static str>,
    },
}

/// Node and element numbering of the meshed longerons.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    /// Node coordinates; node `i` has the one-based label `i + 1`.
    pub nodes: Vec<Point>,
    /// Element connectivity as one-based node labels; element `i` has label `i + 1`.
    pub elements: Vec<[usize; 2]>,
    /// Node label of every joint.
    pub joint_nodes: HashMap<NodeIndex, usize>,
    /// Zero-based element range of each longeron.
    pub longeron_elements: Vec<Range<usize>>,
}

/// Complete declarative description of one analysis model.
#[derive(Clone, Debug)]
pub struct ModelAssembly {
    /// Kind of analysis.
    pub step_kind: StepKind,
    /// Wire geometry: joints connected by straight segments.
    pub wires: Graph<WireJoint, WireSegment>,
    /// Longerons in angular order.
    pub longerons: Vec<Longeron>,
    /// Named joint sets.
    pub joint_sets: Vec<JointSet>,
    /// Longeron material.
    pub material: Material,
    /// Longeron section.
    pub section: BeamSection,
    /// Mesh seeding.
    pub mesh_seed: MeshSeed,
    /// Rigid contact surface.
    pub surface: RigidSurface,
    /// Bottom and top reference points.
    pub reference_points: [ReferencePoint; 2],
    /// Rigid body tie between the bottom reference point and the surface.
    pub rigid_body: String,
    /// Local frame of each longeron.
    pub frames: Vec<LocalFrame>,
    /// Couplings between ring joints and reference points.
    pub couplings: Vec<Coupling>,
    /// Boundary conditions applied in the analysis step.
    pub boundary_conditions: Vec<BoundaryCondition>,
    /// Contact between the longerons and the rigid surface.
    pub contact: ContactInteraction,
    /// Analysis step.
    pub step: AnalysisStep,
    /// Output requests.
    pub outputs: Vec<OutputRequest>,
}

impl ModelAssembly {
    /// Name of the engine model.
    #[must_use]
    pub fn model_name(&self) -> &'static str {
        self.step_kind.model_name()
    }

    /// Name of the engine job.
    #[must_use]
    pub fn job_name(&self) -> &'static str {
        self.step_kind.job_name()
    }

    /// Look up a joint set by name.
    #[must_use]
    pub fn joint_set(&self, name: &str) -> Option<&JointSet> {
        self.joint_sets.iter().find(|set| set.name == name)
    }

    /// Total number of beam elements the seed produces.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.wires.edge_weights().map(|segment| segment.divisions).sum()
    }

    /// Mesh every longeron with the configured seed.
    ///
    /// Joints keep their exact coordinates; interior nodes are spaced evenly
    /// along each segment.
    #[must_use]
    pub fn mesh(&self) -> Mesh {
        let mut nodes = Vec::new();
        let mut elements = Vec::new();
        let mut joint_nodes = HashMap::new();
        let mut longeron_elements = Vec::with_capacity(self.longerons.len());

        for longeron in &self.longerons {
            let first_element = elements.len();
            let Some(&base) = longeron.joints.first() else {
                longeron_elements.push(first_element..first_element);
                continue;
            };
            nodes.push(self.wires[base].position);
            let mut previous = nodes.len();
            joint_nodes.insert(base, previous);

            for pair in longeron.joints.windows(2) {
                let (start, end) = (pair[0], pair[1]);
                let divisions = self
                    .wires
                    .find_edge(start, end)
                    .map_or(1, |edge| self.wires[edge].divisions);
                let a = self.wires[start].position.to_vector();
                let b = self.wires[end].position.to_vector();
                for step in 1..=divisions {
                    let position = if step == divisions {
                        self.wires[end].position
                    } else {
                        Point::from(a + (b - a) * (step as f64 / divisions as f64))
                    };
                    nodes.push(position);
                    let label = nodes.len();
                    elements.push([previous, label]);
                    previous = label;
                }
                joint_nodes.insert(end, previous);
            }
            longeron_elements.push(first_element..elements.len());
        }

        Mesh {
            nodes,
            elements,
            joint_nodes,
            longeron_elements,
        }
    }

    /// Render the keyword input deck for this model.
    #[must_use]
    pub fn to_input_deck(&self) -> InputDeck {
        render(self)
    }
}

/// Output of [`assemble`]: the model and, for continuation runs, its input deck.
#[derive(Clone, Debug)]
pub struct ModelArtifact {
    /// Declarative model handed to the engine.
    pub model: ModelAssembly,
    /// Textual analysis input, present for [`StepKind::RiksContinuation`].
    pub input_deck: Option<InputDeck>,
}

/// Name of the joint set at a given storey and longeron.
#[must_use]
pub fn joint_set_name(storey: usize, longeron: usize) -> String {
    format!("JOINT-{storey}-{longeron}")
}

/// Name of the element set of a longeron.
#[must_use]
pub fn longeron_set_name(longeron: usize) -> String {
    format!("LONGERON-{longeron}")
}

/// Build the declarative model of `lattice` for the requested analysis.
///
/// # Errors
///
/// Returns [`AssemblyError::GeometryInconsistency`] when a longeron's base joint
/// coincides with the origin or its local frame collapses, since neither the
/// beam section nor the coupling could then be oriented.
pub fn assemble(
    lattice: &JointLattice,
    params: &StructuralParameters,
    step_kind: StepKind,
) -> Result<ModelArtifact, AssemblyError> {
    let n_longerons = lattice.n_longerons();
    let n_storeys = lattice.n_storeys();
    let mesh_seed = MeshSeed::from_params(params);

    // wire geometry
    let mut wires: Graph<WireJoint, WireSegment> = Graph::new();
    let mut longerons = Vec::with_capacity(n_longerons);
    let mut joint_sets = Vec::new();
    let mut rings: Vec<Vec<NodeIndex>> = vec![Vec::with_capacity(n_longerons); n_storeys + 1];
    for longeron in 0..n_longerons {
        let points = lattice.longeron(longeron);
        let mut joints: Vec<NodeIndex> = Vec::with_capacity(points.len());
        for (storey, position) in points.iter().enumerate() {
            let joint = wires.add_node(WireJoint {
                storey,
                longeron,
                position: *position,
            });
            if let Some(&previous) = joints.last() {
                let length =
                    (position.to_vector() - wires[previous].position.to_vector()).norm();
                wires.add_edge(
                    previous,
                    joint,
                    WireSegment {
                        longeron,
                        length,
                        divisions: mesh_seed.divisions(length),
                    },
                );
            }
            joint_sets.push(JointSet {
                name: joint_set_name(storey, longeron),
                joints: vec![joint],
            });
            rings[storey].push(joint);
            joints.push(joint);
        }

        let section_n1 = points
            .first()
            .map_or_else(Vector3::zeros, |base| base.to_vector());
        if section_n1.norm() == 0.0 {
            return Err(AssemblyError::GeometryInconsistency {
                longeron,
                reason: "base joint coincides with the origin",
            });
        }
        longerons.push(Longeron {
            name: longeron_set_name(longeron),
            joints,
            section_n1,
        });
    }
    joint_sets.push(JointSet {
        name: "BOTTOM_JOINTS".to_string(),
        joints: rings[0].clone(),
    });
    joint_sets.push(JointSet {
        name: "TOP_JOINTS".to_string(),
        joints: rings[n_storeys].clone(),
    });
    joint_sets.push(JointSet {
        name: "ALL_JOINTS".to_string(),
        joints: rings.concat(),
    });

    let mast_radius = params.mast_radius();
    let surface = RigidSurface {
        name: SURFACE_PART.to_string(),
        half_length: 1.1 * mast_radius,
        depth: 2.2 * mast_radius,
        rotation_axis: Vector3::y(),
        rotation_degrees: 90.0,
    };
    let reference_points = [
        ReferencePoint {
            name: BOTTOM_REF_POINT.to_string(),
            position: Point::new(0.0, 0.0, -1.1 * mast_radius),
        },
        ReferencePoint {
            name: TOP_REF_POINT.to_string(),
            position: Point::new(0.0, 0.0, params.mast_height() + 1.1 * mast_radius),
        },
    ];

    // local frames: x towards the origin, xy-plane through the previous base joint
    let mut frames = Vec::with_capacity(n_longerons);
    for longeron in 0..n_longerons {
        let previous = (longeron + n_longerons - 1) % n_longerons;
        let (Some(origin), Some(plane_point)) =
            (lattice.joint(0, longeron), lattice.joint(0, previous))
        else {
            continue;
        };
        let axis = Point::origin().to_vector() - origin.to_vector();
        let in_plane = plane_point.to_vector() - origin.to_vector();
        if axis.cross(&in_plane).norm() == 0.0 {
            return Err(AssemblyError::GeometryInconsistency {
                longeron,
                reason: "local frame points are collinear",
            });
        }
        frames.push(LocalFrame {
            name: format!("LOCAL_DATUM_{longeron}"),
            origin,
            axis_point: Point::origin(),
            plane_point,
        });
    }

    let mut couplings = Vec::with_capacity(2 * n_longerons);
    for (longeron, frame) in frames.iter().enumerate() {
        for (reference_point, storey) in reference_points.iter().zip([0, n_storeys]) {
            couplings.push(Coupling {
                name: format!(
                    "CONSTRAINT-{}-{storey}-{longeron}",
                    reference_point.name
                ),
                reference_point: reference_point.name.clone(),
                joint_set: joint_set_name(storey, longeron),
                frame: frame.name.clone(),
                constrained: [true, true, true, false, true, true],
            });
        }
    }

    let (step, top_displacement, outputs) = match step_kind {
        StepKind::LinearBuckle => (
            AnalysisStep::Buckle {
                name: "BUCKLE_STEP".to_string(),
                eigenvalues: 1,
            },
            BUCKLE_PERTURBATION,
            vec![OutputRequest::NodeFile {
                variables: vec!["U"],
            }],
        ),
        StepKind::RiksContinuation => (
            AnalysisStep::Riks {
                name: "RIKS_STEP".to_string(),
                max_increments: 400,
                initial_arc_increment: 5.0e-2,
                max_arc_increment: 0.5,
            },
            -params.pitch,
            vec![
                OutputRequest::History {
                    name: "ENERGIES".to_string(),
                    region: None,
                    variables: vec!["ALLEN"],
                },
                OutputRequest::History {
                    name: "RP_TOP".to_string(),
                    region: Some(TOP_REF_POINT.to_string()),
                    variables: vec!["U", "RF"],
                },
            ],
        ),
    };
    let boundary_conditions = vec![
        BoundaryCondition::Fixed {
            name: "BC_FIX".to_string(),
            region: BOTTOM_REF_POINT.to_string(),
        },
        BoundaryCondition::Displacement {
            name: "DISPLACEMENT".to_string(),
            region: TOP_REF_POINT.to_string(),
            dof: 3,
            value: top_displacement,
        },
    ];

    let model = ModelAssembly {
        step_kind,
        wires,
        longerons,
        joint_sets,
        material: Material {
            name: "LONGERON_MATERIAL".to_string(),
            young_modulus: params.young_modulus,
            poisson_ratio: params.poisson_ratio(),
        },
        section: BeamSection {
            name: "LONGERONS_SECTION".to_string(),
            profile: "LONGERONS_PROFILE".to_string(),
            material: "LONGERON_MATERIAL".to_string(),
            radius: params.profile_radius(),
            poisson_ratio: SECTION_POISSON_RATIO,
        },
        mesh_seed,
        surface,
        reference_points,
        rigid_body: "CONSTRAINT-RIGID_BODY-BOTTOM".to_string(),
        frames,
        couplings,
        boundary_conditions,
        contact: ContactInteraction {
            name: "IMP_TARG".to_string(),
            property: "IMP_TARG".to_string(),
            master: format!("{SURFACE_PART}.{SURFACE_PART}"),
            slave: format!("{LONGERONS_PART}.{ALL_LONGERONS_SURFACE}"),
            contact_area: 1.0,
            allow_separation: false,
        },
        step,
        outputs,
    };

    info!(
        model = model.model_name(),
        elements = model.element_count(),
        "assembled lattice model"
    );
    let input_deck = match step_kind {
        StepKind::LinearBuckle => None,
        StepKind::RiksContinuation => Some(model.to_input_deck()),
    };
    Ok(ModelArtifact { model, input_deck })
}
