//! End-of-step transition rules exercised on small hand-built populations.

mod common;

use common::{cell, population_of, ZeroRng};
use oncosim::{CellPopulation, TransitionEngine};
use oncosim_common::{AttachmentConfig, KillerConfig, MutationState, ProliferativeType, Vec2};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn engine(attachment: AttachmentConfig, killer: KillerConfig) -> TransitionEngine {
    TransitionEngine::new(&attachment, &killer, 4.9, Vec2::new(4.6, 4.6)).unwrap()
}

fn contact_only() -> TransitionEngine {
    engine(AttachmentConfig::default(), KillerConfig::default())
}

#[test]
fn zero_attachment_probability_never_attaches() {
    let attachment = AttachmentConfig {
        enabled: true,
        attachment_probability: 0.0,
        ..AttachmentConfig::default()
    };
    let engine = engine(attachment, KillerConfig { enabled: false, ..KillerConfig::default() });

    let cells = (0..30)
        .map(|i| {
            let state = MutationState::ALL[i % MutationState::ALL.len()];
            let state = if state == MutationState::Attached { MutationState::WildType } else { state };
            (cell(state, ProliferativeType::Transit), Vec2::new(i as f64 * 0.3 - 4.0, -2.0))
        })
        .collect();
    let mut population = population_of(cells);

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..20 {
        engine.update_cell_states(&mut population, &mut rng);
    }
    assert_eq!(population.count(MutationState::Attached), 0);

    // Even a draw of exactly zero is not below 0 * dt.
    engine.update_cell_states(&mut population, &mut ZeroRng);
    assert_eq!(population.count(MutationState::Attached), 0);
}

#[test]
fn annular_kill_is_strict_and_spares_stem_cells() {
    let radii = [0.0, 3.0, 5.15, 5.16, 5.5, 5.99, 6.0];
    let mut cells = Vec::new();
    for (i, &r) in radii.iter().enumerate() {
        // On the axes so the measured radius is exactly r.
        let location = match i % 4 {
            0 => Vec2::new(r, 0.0),
            1 => Vec2::new(0.0, r),
            2 => Vec2::new(-r, 0.0),
            _ => Vec2::new(0.0, -r),
        };
        cells.push((cell(MutationState::TCell, ProliferativeType::Differentiated), location));
        cells.push((cell(MutationState::Other, ProliferativeType::Stem), location));
    }
    let mut population = population_of(cells);
    let num = population.num_cells();
    // No cell is of the contact kinds, so only the radial rules fire.
    let engine = engine(
        AttachmentConfig::default(),
        KillerConfig {
            target_kind: MutationState::WildType,
            opposing_kind: MutationState::WildType,
            ..KillerConfig::default()
        },
    );

    let mut rng = StdRng::seed_from_u64(5);
    let summary = engine.update_cell_states(&mut population, &mut rng);

    for index in (0..num).step_by(2) {
        let r = radii[index / 2];
        let expected = 5.15 < r && r < 6.0;
        assert_eq!(population.cell(index).is_dead(), expected, "differentiated cell at r = {}", r);
        assert!(!population.cell(index + 1).is_dead(), "stem cell at r = {}", r);
    }
    assert_eq!(summary.annulus_kills, 3);
}

#[test]
fn escaped_transit_t_cells_land_on_domain_circle() {
    let cells = (0..40)
        .map(|i| {
            let theta = i as f64 * 0.157;
            let r = 6.01 + i as f64 * 0.05;
            (cell(MutationState::TCell, ProliferativeType::Transit), Vec2::new(r * theta.cos(), r * theta.sin()))
        })
        .collect();
    let mut population = population_of(cells);

    let mut rng = StdRng::seed_from_u64(2024);
    let summary = contact_only().update_cell_states(&mut population, &mut rng);

    assert_eq!(summary.teleported, 40);
    for index in 0..population.num_cells() {
        assert!((population.location(index).length() - 4.9).abs() < 1e-12);
        assert_eq!(population.cell(index).proliferative_type(), ProliferativeType::Differentiated);
        assert!(!population.cell(index).is_dead());
    }
}

#[test]
fn tumour_contact_labels_unlabelled_t_cell() {
    let mut population = population_of(vec![
        (cell(MutationState::TCell, ProliferativeType::Differentiated), Vec2::new(0.0, 0.0)),
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(0.9, 0.0)),
    ]);

    let mut rng = StdRng::seed_from_u64(1);
    let summary = contact_only().update_cell_states(&mut population, &mut rng);

    assert_eq!(summary.labelled, 1);
    assert!(population.cell(0).is_labelled());
    assert!(!population.cell(0).is_dead());
    assert!(!population.cell(1).is_dead());
}

#[test]
fn forced_draw_kills_labelled_t_cell_and_tumour() {
    let mut population = population_of(vec![
        (cell(MutationState::TCell, ProliferativeType::Differentiated).labelled(), Vec2::new(0.0, 0.0)),
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(0.9, 0.0)),
    ]);

    let summary = contact_only().update_cell_states(&mut population, &mut ZeroRng);

    assert_eq!(summary.contact_kills, 1);
    assert!(population.cell(0).is_dead());
    assert!(population.cell(1).is_dead());
}

#[test]
fn tumour_labels_lowest_index_neighbour_first() {
    let mut population = population_of(vec![
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(0.0, 0.0)),
        (cell(MutationState::TCell, ProliferativeType::Differentiated), Vec2::new(1.0, 0.0)),
        (cell(MutationState::TCell, ProliferativeType::Differentiated), Vec2::new(-1.0, 0.0)),
    ]);

    let mut rng = StdRng::seed_from_u64(1);
    contact_only().update_cell_states(&mut population, &mut rng);

    assert!(population.cell(1).is_labelled());
    assert!(!population.cell(2).is_labelled());
}

#[test]
fn cells_marked_dead_before_the_pass_are_skipped() {
    let mut population = population_of(vec![
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(0.0, 0.0)),
        (cell(MutationState::TCell, ProliferativeType::Differentiated), Vec2::new(0.9, 0.0)),
    ]);
    population.cell_mut(0).kill();

    let mut rng = StdRng::seed_from_u64(1);
    let summary = contact_only().update_cell_states(&mut population, &mut rng);

    assert_eq!(summary.labelled, 0);
    assert!(!population.cell(1).is_labelled());
}

#[test]
fn second_tumour_still_kills_t_cell_killed_earlier_in_the_pass() {
    let mut population = population_of(vec![
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(-0.9, 0.0)),
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(0.9, 0.0)),
        (cell(MutationState::TCell, ProliferativeType::Differentiated).labelled(), Vec2::new(0.0, 0.0)),
    ]);

    let summary = contact_only().update_cell_states(&mut population, &mut ZeroRng);

    assert_eq!(summary.contact_kills, 2);
    assert!(population.cell(0).is_dead());
    assert!(population.cell(1).is_dead());
    assert!(population.cell(2).is_dead());
}

#[test]
fn tumour_killed_in_annulus_still_holds_the_label() {
    let engine = engine(
        AttachmentConfig::default(),
        KillerConfig { kill_probability: 0.0, ..KillerConfig::default() },
    );
    let mut population = population_of(vec![
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(5.5, 0.0)),
        (cell(MutationState::TCell, ProliferativeType::Differentiated).labelled(), Vec2::new(4.7, 0.0)),
    ]);

    let mut rng = StdRng::seed_from_u64(2);
    let summary = engine.update_cell_states(&mut population, &mut rng);

    assert_eq!(summary.annulus_kills, 1);
    assert_eq!(summary.unlabelled, 0);
    assert!(population.cell(0).is_dead());
    assert!(population.cell(1).is_labelled());
    assert!(!population.cell(1).is_dead());
}

#[test]
fn duration_log_has_one_line_per_update() {
    let dir = tempfile::tempdir().unwrap();
    let attachment = AttachmentConfig {
        enabled: true,
        attachment_probability: 1.0e6,
        detachment_probability: 1.0e6,
        attachment_height: 10.0,
        output_attachment_durations: true,
    };
    let mut engine = engine(attachment, KillerConfig { enabled: false, ..KillerConfig::default() });
    let mut population = population_of(vec![(cell(MutationState::WildType, ProliferativeType::Transit), Vec2::zero())]);

    let mut rng = StdRng::seed_from_u64(8);
    let first = engine.setup_solve(&mut population, &mut rng, dir.path()).unwrap();
    assert_eq!(first.attached, 1);
    population.advance_time();
    let second = engine.update_at_end_of_time_step(&mut population, &mut rng).unwrap();
    assert_eq!(second.detached, 1);
    engine.update_at_end_of_solve().unwrap();

    let text = std::fs::read_to_string(dir.path().join(oncosim::transition::DURATIONS_FILENAME)).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "");
    let duration: f64 = lines[1].parse().unwrap();
    assert!((duration - 0.01).abs() < 1e-12);
}
