// tests/kinematics.rs
//
// Measurement pipeline on hand-built trajectories (no dynamics involved).
// Run with: cargo test --test kinematics

use soliton_chain::chain::ChainField;
use soliton_chain::initial_states::seed_reversed_domain;
use soliton_chain::kinematics::{
    CORE_THRESHOLD, FitWindow, Missing, MobilityWeighting, VelocityFit, extract_velocity,
    fit_mobility, measure_velocity, track_core,
};
use soliton_chain::trajectory::Trajectory;

/// Reversed domain of `width` sites whose left edge moves as x0 + v t.
/// Sample times are chosen so the edge sits on integer sites.
fn moving_step(n: usize, width: usize, x0: usize, v: f64, times: &[f64]) -> Trajectory {
    let frames = times
        .iter()
        .map(|&t| {
            let start = (x0 as f64 + v * t).round() as usize;
            let mut m = ChainField::new(n);
            seed_reversed_domain(&mut m, start, width);
            m
        })
        .collect();
    Trajectory::new(times.to_vec(), frames).unwrap()
}

#[test]
fn moving_step_velocity_is_recovered_exactly() {
    let times: Vec<f64> = (0..100).map(|k| 2.0 * k as f64).collect();
    let traj = moving_step(200, 5, 10, 0.5, &times);

    let track = track_core(&traj, CORE_THRESHOLD).unwrap();
    assert_eq!(track.len(), times.len());
    // left edge 10 at t = 0, width 5 -> centre 12
    assert_eq!(track.positions[0], 12.0);

    let fit = measure_velocity(&traj, &FitWindow::default()).unwrap();
    assert!((fit.velocity - 0.5).abs() < 1e-10, "v = {}", fit.velocity);
    assert!((fit.intercept - 12.0).abs() < 1e-8, "b = {}", fit.intercept);
    assert!(fit.velocity_stderr.unwrap() < 1e-10);
    // t in (30, 150) on a grid of 2: 32, 34, ..., 148
    assert_eq!(fit.samples, 59);
}

#[test]
fn leftward_motion_gives_negative_velocity() {
    let times: Vec<f64> = (0..100).map(|k| 2.0 * k as f64).collect();
    let traj = moving_step(200, 3, 150, -0.5, &times);
    let fit = measure_velocity(&traj, &FitWindow::default()).unwrap();
    assert!((fit.velocity + 0.5).abs() < 1e-10, "v = {}", fit.velocity);
}

#[test]
fn soliton_dying_before_window_gives_no_velocity() {
    // Core present only for t < 30
    let times: Vec<f64> = (0..100).map(|k| k as f64).collect();
    let frames = times
        .iter()
        .map(|&t| {
            let mut m = ChainField::new(50);
            if t < 30.0 {
                seed_reversed_domain(&mut m, 20, 4);
            }
            m
        })
        .collect();
    let traj = Trajectory::new(times, frames).unwrap();

    let track = track_core(&traj, CORE_THRESHOLD).unwrap();
    assert_eq!(track.len(), 30);
    assert_eq!(
        extract_velocity(&track, &FitWindow::default()),
        Err(Missing::InsufficientFitData { found: 0 })
    );
}

#[test]
fn single_in_window_sample_gives_no_velocity() {
    let times = vec![10.0, 100.0, 160.0];
    let traj = moving_step(40, 2, 5, 0.0, &times);
    assert_eq!(
        measure_velocity(&traj, &FitWindow::default()),
        Err(Missing::InsufficientFitData { found: 1 })
    );

    let wide = FitWindow {
        t_start: 0.0,
        t_end: 200.0,
    };
    let fit = measure_velocity(&traj, &wide).unwrap();
    assert_eq!(fit.velocity, 0.0);
}

#[test]
fn mobility_fit_recovers_linear_law() {
    let h = [-0.02, -0.01, 0.0, 0.01, 0.02];
    let v: Vec<Result<VelocityFit, Missing>> = h
        .iter()
        .map(|&hi| {
            Ok(VelocityFit {
                velocity: 3.0 * hi - 0.5,
                velocity_stderr: Some(1e-3),
                intercept: 0.0,
                samples: 50,
            })
        })
        .collect();

    for weighting in [MobilityWeighting::Unweighted, MobilityWeighting::VelocityStderr] {
        let fit = fit_mobility(&h, &v, weighting).unwrap();
        assert!((fit.mobility - 3.0).abs() < 1e-9, "mu = {}", fit.mobility);
        assert!(
            (fit.intrinsic_velocity + 0.5).abs() < 1e-12,
            "v_int = {}",
            fit.intrinsic_velocity
        );
        assert_eq!(fit.points, 5);
    }
}

#[test]
fn mobility_without_enough_velocities_is_missing() {
    let h = [0.0, 0.01, 0.02];
    let v = vec![
        Err(Missing::NoSolitonDetected),
        Err(Missing::InsufficientFitData { found: 1 }),
        Ok(VelocityFit {
            velocity: 0.1,
            velocity_stderr: None,
            intercept: 0.0,
            samples: 2,
        }),
    ];
    assert_eq!(
        fit_mobility(&h, &v, MobilityWeighting::Unweighted),
        Err(Missing::InsufficientVelocityData { found: 1 })
    );
}

#[test]
fn persisted_trajectory_measures_the_same() {
    let times: Vec<f64> = (0..100).map(|k| 2.0 * k as f64).collect();
    let traj = moving_step(120, 4, 20, 0.5, &times);

    let path = std::env::temp_dir()
        .join(format!("soliton_chain_kin_{}", std::process::id()))
        .join("trajectory.json");
    traj.write_json(&path).unwrap();
    let back = Trajectory::read_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(back.n_sites(), 120);
    assert_eq!(back, traj);
    assert_eq!(
        measure_velocity(&back, &FitWindow::default()),
        measure_velocity(&traj, &FitWindow::default())
    );
}
