use super::{Force, GeneralisedLinearSpring, SpringLaw};
use crate::geometry::{displacement, rest_length};
use crate::population::CellPopulation;
use oncosim_common::{MutationState, ProliferativeType};
use rand::RngCore;

/// Pairwise springs selected by the states of the two cells.
///
/// - differentiated T cell / differentiated T cell: repulsion only;
/// - labelled cell / tumour cell: full spring;
/// - tumour cell / tumour cell: full spring.
///
/// The clauses are checked independently and every match adds its own
/// contribution, so a pair can be pushed more than once.
pub struct InteractionSpringForce<L: SpringLaw = GeneralisedLinearSpring> {
    law: L,
    repelling_kind: MutationState,
    tumour_kind: MutationState,
}

impl<L: SpringLaw> InteractionSpringForce<L> {
    pub fn new(law: L) -> Self {
        InteractionSpringForce {
            law,
            repelling_kind: MutationState::TCell,
            tumour_kind: MutationState::Tumor,
        }
    }

    pub fn with_kinds(mut self, repelling_kind: MutationState, tumour_kind: MutationState) -> Self {
        self.repelling_kind = repelling_kind;
        self.tumour_kind = tumour_kind;
        self
    }

    /// Number of clauses matched by the pair; each contributes one base force.
    pub fn matching_clauses(&self, population: &dyn CellPopulation, a: usize, b: usize) -> u32 {
        let cell_a = population.cell(a);
        let cell_b = population.cell(b);
        let mut matches = 0;

        if cell_a.is(self.repelling_kind)
            && cell_b.is(self.repelling_kind)
            && cell_a.proliferative_type() == ProliferativeType::Differentiated
            && cell_b.proliferative_type() == ProliferativeType::Differentiated
        {
            let separation = displacement(population.location(a), population.location(b)).length();
            if separation < rest_length(population.radius(a), population.radius(b)) {
                matches += 1;
            }
        }

        if (cell_a.is_labelled() && cell_b.is(self.tumour_kind)) || (cell_b.is_labelled() && cell_a.is(self.tumour_kind)) {
            matches += 1;
        }

        if cell_a.is(self.tumour_kind) && cell_b.is(self.tumour_kind) {
            matches += 1;
        }

        matches
    }
}

impl<L: SpringLaw> Force for InteractionSpringForce<L> {
    /// # Panics
    ///
    /// Panics if a computed force has a NaN component (e.g. coincident nodes).
    fn add_force_contribution(&self, population: &mut dyn CellPopulation, _rng: &mut dyn RngCore) {
        for (a, b) in population.node_pairs() {
            let matches = self.matching_clauses(population, a, b);
            if matches == 0 {
                continue;
            }
            let force = self.law.force_between_nodes(population, a, b);
            assert!(
                force.is_nan_free(),
                "NaN force between nodes {} and {} at {:?} and {:?}",
                a,
                b,
                population.location(a),
                population.location(b)
            );
            for _ in 0..matches {
                population.add_applied_force(a, force);
                population.add_applied_force(b, -force);
            }
        }
    }

    fn name(&self) -> &'static str {
        "InteractionSpringForce"
    }
}

impl Default for InteractionSpringForce {
    fn default() -> Self {
        Self::new(GeneralisedLinearSpring::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::cycle::CellCycleModel;
    use crate::population::NodePopulation;
    use oncosim_common::{CellCycleConfig, Vec2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cell(state: MutationState, kind: ProliferativeType) -> Cell {
        Cell::new(state, kind, CellCycleModel::from_config(&CellCycleConfig::default(), 0.0))
    }

    fn pair(a: Cell, b: Cell, separation: f64) -> NodePopulation {
        let mut population = NodePopulation::new(1.5, 0.01);
        population.add_cell(a, Vec2::zero(), 0.5);
        population.add_cell(b, Vec2::new(separation, 0.0), 0.5);
        population.update();
        population
    }

    fn resolver() -> InteractionSpringForce {
        InteractionSpringForce::default()
    }

    fn apply(population: &mut NodePopulation) {
        let mut rng = StdRng::seed_from_u64(0);
        resolver().add_force_contribution(population, &mut rng);
    }

    #[test]
    fn differentiated_t_cells_only_repel() {
        let t = || cell(MutationState::TCell, ProliferativeType::Differentiated);
        let mut close = pair(t(), t(), 0.8);
        apply(&mut close);
        assert!(close.nodes()[0].applied_force.x < 0.0);
        assert_eq!(close.nodes()[1].applied_force, -close.nodes()[0].applied_force);

        let mut apart = pair(t(), t(), 1.2);
        apply(&mut apart);
        assert_eq!(apart.nodes()[0].applied_force, Vec2::zero());
    }

    #[test]
    fn labelled_cell_is_pulled_towards_tumour() {
        let labelled = cell(MutationState::TCell, ProliferativeType::Transit).labelled();
        let tumour = cell(MutationState::Tumor, ProliferativeType::Transit);
        let mut population = pair(tumour, labelled, 1.2);
        apply(&mut population);
        assert!(population.nodes()[0].applied_force.x > 0.0);
        assert!(population.nodes()[1].applied_force.x < 0.0);
    }

    #[test]
    fn unlabelled_non_tumour_pairs_feel_nothing() {
        let mut population = pair(
            cell(MutationState::TCell, ProliferativeType::Transit),
            cell(MutationState::WildType, ProliferativeType::Transit),
            0.8,
        );
        apply(&mut population);
        assert_eq!(population.nodes()[0].applied_force, Vec2::zero());
    }

    #[test]
    fn overlapping_clauses_are_summed() {
        let labelled_tumour = || cell(MutationState::Tumor, ProliferativeType::Transit).labelled();
        let mut population = pair(labelled_tumour(), labelled_tumour(), 0.8);
        assert_eq!(resolver().matching_clauses(&population, 0, 1), 2);

        let single = GeneralisedLinearSpring::default().force(Vec2::zero(), 0.5, Vec2::new(0.8, 0.0), 0.5);
        apply(&mut population);
        assert!((population.nodes()[0].applied_force.x - 2.0 * single.x).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "NaN force")]
    fn coincident_tumour_cells_abort() {
        let tumour = || cell(MutationState::Tumor, ProliferativeType::Transit);
        let mut population = pair(tumour(), tumour(), 0.0);
        apply(&mut population);
    }
}
