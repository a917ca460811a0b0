//! Keyword input deck rendered from a [`ModelAssembly`].
//!
//! The deck is line oriented. Model data always contains the literal
//! [`INTERACTIONS_ANCHOR`] line followed by one comment line, which is where
//! imperfection directives are spliced in for the continuation stage.

use std::fs;
use std::io;
use std::path::Path;

use crate::model::{
    AnalysisStep, BoundaryCondition, ModelAssembly, OutputRequest, ALL_LONGERONS_SET,
    ALL_LONGERONS_SURFACE, LONGERONS_PART,
};

/// Comment line opening the interactions section of the model data.
pub const INTERACTIONS_ANCHOR: &str = "** INTERACTIONS";

/// Maximum number of labels written on one data line.
const LABELS_PER_LINE: usize = 16;

/// Line-oriented analysis input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputDeck {
    /// Lines without terminators.
    lines: Vec<String>,
    /// Whether the last line carries a terminator.
    terminated: bool,
}

impl InputDeck {
    /// Wrap existing lines; every line, the last included, is terminated.
    #[must_use]
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            terminated: true,
        }
    }

    /// Split text on `'\n'`; [`InputDeck::to_text`] restores it byte for byte.
    ///
    /// A final `'\n'` terminates the last line rather than opening an empty one.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let (body, terminated) = match text.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (text, false),
        };
        Self {
            lines: body.split('\n').map(str::to_string).collect(),
            terminated,
        }
    }

    /// Read a deck from disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the file cannot be read.
    pub fn read(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(|text| Self::from_text(&text))
    }

    /// Lines of the deck.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Mutable access to the lines; the terminator of the last line is kept.
    pub fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    /// Consume the deck, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Join the lines with `'\n'`.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.terminated {
            text.push('\n');
        }
        text
    }

    /// Write the deck to disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the file cannot be written.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_text())
    }
}

/// Format a real number the way keyword decks expect, always with a decimal point.
fn real(value: f64) -> String {
    let text = format!("{value}");
    if text.contains(['.', 'e', 'E', 'N', 'i']) {
        text
    } else {
        format!("{text}.")
    }
}

/// Accumulates deck lines.
struct DeckWriter {
    /// Lines written so far.
    lines: Vec<String>,
}

impl DeckWriter {
    fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Section banner made of three comment lines.
    fn banner(&mut self, title: &str) {
        self.line("**");
        self.line(format!("** {title}"));
        self.line("**");
    }

    /// Labels split over lines of at most [`LABELS_PER_LINE`] entries.
    fn labels(&mut self, labels: &[usize]) {
        for chunk in labels.chunks(LABELS_PER_LINE) {
            let row: Vec<String> = chunk.iter().map(ToString::to_string).collect();
            self.line(format!("{},", row.join(", ")));
        }
    }
}

/// Render `model` as a keyword input deck.
#[must_use]
pub fn render(model: &ModelAssembly) -> InputDeck {
    let mut deck = DeckWriter { lines: Vec::new() };
    let mesh = model.mesh();

    deck.line("*Heading");
    deck.line(format!(
        "** Job name: {} Model name: {}",
        model.job_name(),
        model.model_name()
    ));
    deck.line("*Preprint, echo=NO, model=NO, history=NO, contact=NO");

    // longerons part
    deck.banner("PARTS");
    deck.line(format!("*Part, name={LONGERONS_PART}"));
    deck.line("*Node");
    for (index, node) in mesh.nodes.iter().enumerate() {
        deck.line(format!(
            "{}, {}, {}, {}",
            index + 1,
            real(node.x),
            real(node.y),
            real(node.z)
        ));
    }
    deck.line(format!("*Element, type={}", model.mesh_seed.element_code));
    for (index, [start, end]) in mesh.elements.iter().enumerate() {
        deck.line(format!("{}, {start}, {end}", index + 1));
    }
    for set in &model.joint_sets {
        let mut labels: Vec<usize> = set
            .joints
            .iter()
            .filter_map(|joint| mesh.joint_nodes.get(joint).copied())
            .collect();
        labels.sort_unstable();
        deck.line(format!("*Nset, nset={}", set.name));
        deck.labels(&labels);
    }
    for (longeron, range) in model.longerons.iter().zip(&mesh.longeron_elements) {
        deck.line(format!("*Elset, elset={}, generate", longeron.name));
        deck.line(format!("{}, {}, 1", range.start + 1, range.end));
    }
    deck.line(format!("*Elset, elset={ALL_LONGERONS_SET}, generate"));
    deck.line(format!("1, {}, 1", mesh.elements.len()));
    deck.line(format!(
        "*Surface, type=ELEMENT, name={ALL_LONGERONS_SURFACE}"
    ));
    deck.line(format!("{ALL_LONGERONS_SET},"));
    let section = &model.section;
    for longeron in &model.longerons {
        deck.line(format!(
            "** Section: {}  Profile: {}",
            section.name, section.profile
        ));
        deck.line(format!(
            "*Beam Section, elset={}, material={}, poisson={}, temperature=GRADIENTS, section=CIRC",
            longeron.name,
            section.material,
            real(section.poisson_ratio)
        ));
        deck.line(real(section.radius));
        let n1 = longeron.section_n1;
        deck.line(format!("{}, {}, {}", real(n1.x), real(n1.y), real(n1.z)));
    }
    deck.line("*End Part");
    deck.line("**");
    let surface = &model.surface;
    deck.line(format!("*Part, name={}", surface.name));
    deck.line("*End Part");

    // assembly
    deck.banner("ASSEMBLY");
    deck.line("*Assembly, name=Assembly");
    deck.line("**");
    deck.line(format!(
        "*Instance, name={LONGERONS_PART}, part={LONGERONS_PART}"
    ));
    deck.line("*End Instance");
    deck.line("**");
    deck.line(format!(
        "*Instance, name={}, part={}",
        surface.name, surface.name
    ));
    deck.line("0., 0., 0.");
    let axis = surface.rotation_axis;
    deck.line(format!(
        "0., 0., 0., {}, {}, {}, {}",
        real(axis.x),
        real(axis.y),
        real(axis.z),
        real(surface.rotation_degrees)
    ));
    deck.line(format!("** Extrusion depth: {}", real(surface.depth)));
    deck.line(format!("*Surface, type=CYLINDER, name={}", surface.name));
    deck.line(format!("START, 0., {}", real(-surface.half_length)));
    deck.line(format!("LINE, 0., {}", real(surface.half_length)));
    deck.line("*End Instance");
    deck.line("**");
    for (index, reference_point) in model.reference_points.iter().enumerate() {
        let position = reference_point.position;
        deck.line("*Node");
        deck.line(format!(
            "{}, {}, {}, {}",
            index + 1,
            real(position.x),
            real(position.y),
            real(position.z)
        ));
        deck.line(format!("*Nset, nset={}", reference_point.name));
        deck.line(format!("{},", index + 1));
    }
    for frame in &model.frames {
        let (a, b, c) = (frame.axis_point, frame.plane_point, frame.origin);
        deck.line(format!("*Orientation, name={}", frame.name));
        deck.line(format!(
            "{}, {}, {}, {}, {}, {}, {}, {}, {}",
            real(a.x),
            real(a.y),
            real(a.z),
            real(b.x),
            real(b.y),
            real(b.z),
            real(c.x),
            real(c.y),
            real(c.z)
        ));
        deck.line("1, 0.");
    }
    for coupling in &model.couplings {
        let surface_name = format!("{}_CNS_", coupling.name);
        deck.line(format!(
            "*Surface, type=NODE, name={surface_name}, internal"
        ));
        deck.line(format!("{LONGERONS_PART}.{}, 1.", coupling.joint_set));
        deck.line(format!("** Constraint: {}", coupling.name));
        deck.line(format!(
            "*Coupling, constraint name={}, ref node={}, surface={surface_name}, orientation={}",
            coupling.name, coupling.reference_point, coupling.frame
        ));
        deck.line("*Kinematic");
        for dof in coupling.constrained_dofs() {
            deck.line(format!("{dof}, {dof}"));
        }
    }
    deck.line(format!("** Constraint: {}", model.rigid_body));
    deck.line(format!(
        "*Rigid Body, ref node={}, analytical surface={}.{}",
        model.reference_points[0].name, surface.name, surface.name
    ));
    deck.line("*End Assembly");

    // materials and contact
    let material = &model.material;
    deck.banner("MATERIALS");
    deck.line(format!("*Material, name={}", material.name));
    deck.line("*Elastic");
    deck.line(format!(
        "{}, {}",
        real(material.young_modulus),
        real(material.poisson_ratio)
    ));
    let contact = &model.contact;
    deck.banner("INTERACTION PROPERTIES");
    deck.line(format!("*Surface Interaction, name={}", contact.property));
    deck.line(format!("{},", real(contact.contact_area)));
    if contact.allow_separation {
        deck.line("*Surface Behavior, pressure-overclosure=HARD");
    } else {
        deck.line("*Surface Behavior, no separation, pressure-overclosure=HARD");
    }
    deck.banner(&INTERACTIONS_ANCHOR[3..]);
    deck.line(format!("** Interaction: {}", contact.name));
    deck.line(format!(
        "*Contact Pair, interaction={}, type=SURFACE TO SURFACE",
        contact.property
    ));
    deck.line(format!("{}, {}", contact.slave, contact.master));

    // step
    deck.line("** ----------------------------------------------------------------");
    deck.banner(&format!("STEP: {}", model.step.name()));
    match &model.step {
        AnalysisStep::Buckle { name, eigenvalues } => {
            deck.line(format!("*Step, name={name}, nlgeom=NO, perturbation"));
            deck.line("*Buckle");
            deck.line(format!("{eigenvalues}, , {}, 300", 2 * eigenvalues + 8));
        }
        AnalysisStep::Riks {
            name,
            max_increments,
            initial_arc_increment,
            max_arc_increment,
        } => {
            deck.line(format!(
                "*Step, name={name}, nlgeom=YES, inc={max_increments}"
            ));
            deck.line("*Static, riks");
            deck.line(format!(
                "{}, 1., , {}",
                real(*initial_arc_increment),
                real(*max_arc_increment)
            ));
        }
    }
    deck.banner("BOUNDARY CONDITIONS");
    for condition in &model.boundary_conditions {
        match condition {
            BoundaryCondition::Fixed { name, region } => {
                deck.line(format!("** Name: {name} Type: Displacement/Rotation"));
                deck.line("*Boundary");
                deck.line(format!("{region}, 1, 6"));
            }
            BoundaryCondition::Displacement {
                name,
                region,
                dof,
                value,
            } => {
                deck.line(format!("** Name: {name} Type: Displacement/Rotation"));
                deck.line("*Boundary");
                deck.line(format!("{region}, {dof}, {dof}, {}", real(*value)));
            }
        }
    }
    deck.banner("OUTPUT REQUESTS");
    deck.line("*Restart, write, frequency=0");
    deck.line("*Output, field, variable=PRESELECT");
    for request in &model.outputs {
        match request {
            OutputRequest::History {
                name,
                region,
                variables,
            } => {
                deck.line(format!("** HISTORY OUTPUT: {name}"));
                deck.line("*Output, history");
                match region {
                    Some(region) => deck.line(format!("*Node Output, nset={region}")),
                    None => deck.line("*Energy Output"),
                }
                deck.line(variables.join(", "));
            }
            OutputRequest::NodeFile { variables } => {
                deck.line("*Node File");
                deck.line(format!("{},", variables.join(", ")));
            }
        }
    }
    deck.line("*End Step");

    InputDeck::from_lines(deck.lines)
}
