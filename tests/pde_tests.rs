//! Density averaging over a coarse mesh and the piecewise source term.

mod common;

use common::{cell, population_of};
use oncosim::{AveragedSourcePde, CellPopulation, CoarseMesh, TriangularMesh};
use oncosim_common::{MutationState, PdeConfig, ProliferativeType, Vec2};
use std::collections::HashMap;

fn one_triangle() -> TriangularMesh {
    TriangularMesh::new(
        vec![Vec2::new(-10.0, -10.0), Vec2::new(10.0, -10.0), Vec2::new(0.0, 10.0)],
        vec![[0, 1, 2]],
    )
    .unwrap()
}

fn mixed_population() -> oncosim::NodePopulation {
    let t = || cell(MutationState::TCell, ProliferativeType::Differentiated);
    let tumour = || cell(MutationState::Tumor, ProliferativeType::Transit);
    let mut apoptotic_t = t().labelled();
    apoptotic_t.set_apoptotic(true);
    let mut apoptotic_tumour = tumour();
    apoptotic_tumour.set_apoptotic(true);
    let mut dead_t = t().labelled();
    dead_t.kill();

    population_of(vec![
        (t().labelled(), Vec2::new(0.0, 0.0)),
        (t().labelled(), Vec2::new(1.0, 0.0)),
        (t().labelled(), Vec2::new(2.0, 0.0)),
        (t(), Vec2::new(0.0, 1.0)),
        (apoptotic_t, Vec2::new(0.0, 2.0)),
        (dead_t, Vec2::new(0.0, 3.0)),
        (tumour(), Vec2::new(-1.0, 0.0)),
        (tumour().labelled(), Vec2::new(-2.0, 0.0)),
        (apoptotic_tumour, Vec2::new(-3.0, 0.0)),
        (cell(MutationState::WildType, ProliferativeType::Transit), Vec2::new(0.0, -1.0)),
    ])
}

#[test]
fn single_element_densities_are_counts_over_volume() {
    let mesh = one_triangle();
    let volume = mesh.element_volume(0);
    assert_eq!(volume, 200.0);

    let population = mixed_population();
    let mut pde = AveragedSourcePde::from_config(&PdeConfig::default());
    pde.setup_source_terms(&population, &mesh, None).unwrap();

    assert_eq!(pde.primary_density(0), 3.0 / volume);
    assert_eq!(pde.secondary_density(0), 2.0 / volume);
    assert_eq!(pde.uptake_rate_for_element(0), pde.primary_density(0));
}

#[test]
fn explicit_element_map_overrides_point_location() {
    let mesh = TriangularMesh::rectangle(Vec2::new(-5.0, -5.0), 10.0, 10.0, 5.0).unwrap();
    let population = population_of(vec![
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(-4.0, -4.5)),
        (cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(4.0, 4.5)),
    ]);
    let map: HashMap<usize, usize> = [(0, 3), (1, 3)].into_iter().collect();

    let mut pde = AveragedSourcePde::from_config(&PdeConfig::default());
    pde.setup_source_terms(&population, &mesh, Some(&map)).unwrap();

    assert_eq!(pde.secondary_density(3), 2.0 / mesh.element_volume(3));
    let others: f64 = (0..mesh.num_elements()).filter(|&e| e != 3).map(|e| pde.secondary_density(e)).sum();
    assert_eq!(others, 0.0);

    let partial: HashMap<usize, usize> = [(0, 3)].into_iter().collect();
    assert!(pde.setup_source_terms(&population, &mesh, Some(&partial)).is_err());
}

#[test]
fn densities_are_rebuilt_from_scratch() {
    let mesh = one_triangle();
    let mut population = mixed_population();
    let mut pde = AveragedSourcePde::from_config(&PdeConfig::default());
    pde.setup_source_terms(&population, &mesh, None).unwrap();
    pde.setup_source_terms(&population, &mesh, None).unwrap();
    assert_eq!(pde.secondary_density(0), 2.0 / 200.0);

    population.cell_mut(6).kill();
    pde.setup_source_terms(&population, &mesh, None).unwrap();
    assert_eq!(pde.secondary_density(0), 1.0 / 200.0);
}

#[test]
fn cell_outside_mesh_is_an_error() {
    let mesh = one_triangle();
    let population = population_of(vec![(cell(MutationState::Tumor, ProliferativeType::Transit), Vec2::new(50.0, 0.0))]);
    let mut pde = AveragedSourcePde::from_config(&PdeConfig::default());
    let err = pde.setup_source_terms(&population, &mesh, None).unwrap_err();
    assert!(err.to_string().contains("outside the coarse mesh"));
    assert!(!pde.is_set_up());
}

#[test]
fn source_term_jumps_by_the_cloaking_penalty_at_threshold() {
    let mesh = one_triangle();
    let population = mixed_population();
    let config = PdeConfig {
        uptake_coefficient: 4.0,
        decay_coefficient: 0.3,
        ..PdeConfig::default()
    };
    let mut pde = AveragedSourcePde::from_config(&config);
    pde.setup_source_terms(&population, &mesh, None).unwrap();

    let x = Vec2::zero();
    let t = 4.0 * pde.primary_density(0);
    let s = 4.0 * pde.secondary_density(0);
    let u = 0.01;

    let at_threshold = pde.compute_source_term(x, u, 0);
    let upper_formula = t - (0.3 + 10.0 * s) * u;
    assert!((at_threshold - (t - 0.3 * u)).abs() < 1e-15);
    assert!(((at_threshold - upper_formula) - 10.0 * s * u).abs() < 1e-15);
    assert!(10.0 * s * u > 0.0);

    let just_above = pde.compute_source_term(x, u + 1e-12, 0);
    assert!((just_above - upper_formula).abs() < 1e-9);
    assert_eq!(pde.compute_source_term(x, 0.0, 0), t);
    assert_eq!(pde.compute_source_term(x, -0.5, 0), t);
}
