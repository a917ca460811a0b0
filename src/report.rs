use std::fmt::Write;

use supercompressible::{JointLattice, PreparedJob, ResultRecord, StructuralParameters};

/// Render a textual summary of a generated lattice.
///
/// The report lists the derived profile first and then every ring, so the
/// numbers can be checked by hand against the closed-form geometry.
#[must_use]
pub fn render_lattice(params: &StructuralParameters, lattice: &JointLattice) -> String {
    let mut output = String::new();

    writeln!(
        &mut output,
        "Lattice: {} longerons, {} storeys, height = {:.3}",
        lattice.n_longerons(),
        lattice.n_storeys(),
        params.mast_height()
    )
    .expect("writing to string cannot fail");

    writeln!(
        &mut output,
        "Profile: base radius = {:.3}, cone slope = {:.4}, transition height = {:.3}",
        params.mast_radius(),
        params.cone_slope(),
        params.transition_height()
    )
    .expect("writing to string cannot fail");

    for (storey, ring) in lattice.rings().iter().enumerate() {
        writeln!(
            &mut output,
            "  ring {storey:>3}: z = {:>10.3}, radius = {:>8.3}, twist = {:+.4} rad",
            ring.z, ring.radius, ring.twist
        )
        .expect("writing to string cannot fail");
    }

    output
}

/// Render the outcome of writing a stage's input deck.
#[must_use]
pub fn render_job(job: &PreparedJob) -> String {
    let mut output = String::new();

    writeln!(
        &mut output,
        "Job {} written to {}",
        job.job_name,
        job.input_path.display()
    )
    .expect("writing to string cannot fail");

    if let Some(directive) = &job.imperfection {
        writeln!(
            &mut output,
            "Imperfection: mode {} of {}, amplitude factor = {:.6e}",
            directive.mode_id, directive.source_job_id, directive.amplitude_factor
        )
        .expect("writing to string cannot fail");
    }

    output
}

/// Render the results a previous stage left behind.
#[must_use]
pub fn render_record(record: &ResultRecord) -> String {
    let mut output = String::new();

    writeln!(
        &mut output,
        "Results of {}: {}",
        record.job_id,
        if record.feasible { "coilable" } else { "not coilable" }
    )
    .expect("writing to string cannot fail");

    if let Some(displacement) = record.displacement(record.eigen_mode_id) {
        writeln!(
            &mut output,
            "Mode {}: max displacement = {:.6e}",
            record.eigen_mode_id, displacement
        )
        .expect("writing to string cannot fail");
    }

    match record.peak_load() {
        Some(load) => writeln!(&mut output, "Peak reaction load = {load:.6e}")
            .expect("writing to string cannot fail"),
        None => output.push_str("Peak reaction load: not recorded\n"),
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use supercompressible::{generate, Feasibility, ImperfectionDirective};

    #[test]
    fn lattice_report_lists_every_ring() {
        let params = StructuralParameters {
            n_storeys: 3,
            ..StructuralParameters::default()
        };
        let lattice = generate(&params, &Feasibility::Unchecked).expect("valid lattice");
        let report = render_lattice(&params, &lattice);

        assert!(report.starts_with("Lattice: 3 longerons, 3 storeys"));
        assert_eq!(report.lines().filter(|line| line.contains("ring")).count(), 4);
        assert!(report.contains("radius =   50.000"));
    }

    #[test]
    fn record_report_lists_peak_load() {
        let record = ResultRecord {
            job_id: "Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE".to_string(),
            feasible: true,
            displacement_history: vec![0.0, 2.0],
            loads: vec![0.0, -3.0, 1.5],
            eigen_mode_id: 1,
        };
        let report = render_record(&record);
        assert!(report.starts_with("Results of Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE: coilable"));
        assert!(report.contains("Mode 1: max displacement = 2.000000e0"));
        assert!(report.contains("Peak reaction load = 3.000000e0"));

        let bare = ResultRecord {
            loads: Vec::new(),
            ..record
        };
        assert!(render_record(&bare).contains("not recorded"));
    }

    #[test]
    fn job_report_mentions_imperfection() {
        let job = PreparedJob {
            job_name: "Simul_SUPERCOMPRESSIBLE_RIKS".to_string(),
            input_path: PathBuf::from("Simul_SUPERCOMPRESSIBLE_RIKS.inp"),
            imperfection: Some(ImperfectionDirective {
                source_job_id: "Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE".to_string(),
                mode_id: 1,
                amplitude_factor: 0.5,
            }),
        };
        let report = render_job(&job);
        assert!(report.contains("Job Simul_SUPERCOMPRESSIBLE_RIKS written to"));
        assert!(report.contains("mode 1 of Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE"));
        assert!(report.contains("5.000000e-1"));
    }
}
