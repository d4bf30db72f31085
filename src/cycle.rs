use oncosim_common::{CellCycleConfig, MutationState, ProliferativeType};
use rand::Rng;

/// S phase duration (hours) for every non-spawning cell.
pub const S_DURATION: f64 = 5.0;
/// G2 phase duration (hours).
pub const G2_DURATION: f64 = 4.0;
/// M phase duration (hours).
pub const M_DURATION: f64 = 1.0;
/// Width of the uniform window added to the transit G1 of proliferating cells.
const PROLIFERATING_G1_SPREAD: f64 = 5.0;

/// Generational cell-cycle model with a fixed-rate spawning stem cell.
///
/// Stem cells of the spawner kind cycle every `spawn_rate` hours, split evenly
/// over the four phases. Their transit and differentiated progeny never divide.
/// Transit cells of the proliferating kind draw their G1 from
/// `U[transit_g1, transit_g1 + 5)`. All other kinds fall back to the usual
/// stem/transit G1 durations.
#[derive(Debug, Clone, PartialEq)]
pub struct CellCycleModel {
    birth_time: f64,
    g1_duration: f64,
    s_duration: f64,
    g2_duration: f64,
    m_duration: f64,
    stem_g1_duration: f64,
    transit_g1_duration: f64,
    spawn_rate: f64,
    spawner_kind: MutationState,
    proliferating_kind: MutationState,
    generation: u32,
    max_transit_generations: u32,
}

impl CellCycleModel {
    pub fn from_config(config: &CellCycleConfig, birth_time: f64) -> Self {
        CellCycleModel {
            birth_time,
            g1_duration: f64::INFINITY,
            s_duration: S_DURATION,
            g2_duration: G2_DURATION,
            m_duration: M_DURATION,
            stem_g1_duration: config.stem_g1_duration,
            transit_g1_duration: config.transit_g1_duration,
            spawn_rate: config.spawn_rate,
            spawner_kind: config.spawner_kind,
            proliferating_kind: config.proliferating_kind,
            generation: 0,
            max_transit_generations: config.max_transit_generations,
        }
    }

    pub fn birth_time(&self) -> f64 {
        self.birth_time
    }

    pub fn set_birth_time(&mut self, birth_time: f64) {
        self.birth_time = birth_time;
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn g1_duration(&self) -> f64 {
        self.g1_duration
    }

    pub fn set_spawn_rate(&mut self, spawn_rate: f64) {
        self.spawn_rate = spawn_rate;
    }

    /// Sum of all phase durations; infinite for cells that never divide.
    pub fn cycle_duration(&self) -> f64 {
        self.g1_duration + self.s_duration + self.g2_duration + self.m_duration
    }

    /// Typical pre-simulation age window used to stagger initial birth times.
    pub fn initial_age_window(&self) -> f64 {
        self.stem_g1_duration + S_DURATION + G2_DURATION
    }

    /// Draws the G1 duration for a cell of the given kind and type.
    ///
    /// # Panics
    ///
    /// Panics if a cell of the proliferating kind is stem or differentiated;
    /// such cells are never created by this model.
    pub fn set_g1_duration<R: Rng + ?Sized>(
        &mut self,
        mutation: MutationState,
        proliferative_type: ProliferativeType,
        rng: &mut R,
    ) {
        if mutation == self.spawner_kind {
            match proliferative_type {
                ProliferativeType::Stem => {
                    let phase = self.spawn_rate / 4.0;
                    self.g1_duration = phase;
                    self.s_duration = phase;
                    self.g2_duration = phase;
                    self.m_duration = phase;
                }
                ProliferativeType::Transit | ProliferativeType::Differentiated => {
                    self.g1_duration = f64::INFINITY;
                }
            }
        } else if mutation == self.proliferating_kind {
            match proliferative_type {
                ProliferativeType::Transit => {
                    self.g1_duration = self.transit_g1_duration + PROLIFERATING_G1_SPREAD * rng.random::<f64>();
                }
                other => panic!("{} cells of kind {} are not reachable in this cell-cycle model", other, mutation),
            }
        } else {
            self.g1_duration = match proliferative_type {
                ProliferativeType::Stem => self.stem_g1_duration,
                ProliferativeType::Transit => self.transit_g1_duration,
                ProliferativeType::Differentiated => f64::INFINITY,
            };
        }
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.birth_time
    }

    pub fn ready_to_divide(&self, now: f64) -> bool {
        self.age(now) >= self.cycle_duration()
    }

    /// Prepares the parent for a new cycle and returns its (possibly changed) type.
    pub fn reset_for_division<R: Rng + ?Sized>(
        &mut self,
        now: f64,
        mutation: MutationState,
        proliferative_type: ProliferativeType,
        rng: &mut R,
    ) -> ProliferativeType {
        self.generation = self.generation.saturating_add(1);
        let mut new_type = proliferative_type;
        if self.generation > self.max_transit_generations {
            new_type = ProliferativeType::Differentiated;
        }
        if new_type == ProliferativeType::Stem {
            self.generation = 0;
        }
        self.birth_time = now;
        self.set_g1_duration(mutation, new_type, rng);
        new_type
    }

    /// Exact parameter copy for the daughter cell.
    pub fn create_daughter(&self) -> Self {
        self.clone()
    }

    /// Daughter-specific reinitialisation. Returns the daughter's type.
    pub fn initialise_daughter<R: Rng + ?Sized>(
        &mut self,
        mutation: MutationState,
        parent_type: ProliferativeType,
        rng: &mut R,
    ) -> ProliferativeType {
        // A stem parent reset its own generation to zero.
        if self.generation == 0 {
            self.generation = 1;
        }
        let mut daughter_type = parent_type;
        if self.generation > self.max_transit_generations {
            daughter_type = ProliferativeType::Differentiated;
        }
        if daughter_type == ProliferativeType::Stem {
            daughter_type = ProliferativeType::Transit;
        }
        self.set_g1_duration(mutation, daughter_type, rng);
        daughter_type
    }
}
