//! End-of-step state transitions: attachment, radial teleport and kill,
//! stem re-centring, and label/kill by neighbouring tumour cells.

use crate::cell::ATTACH_TIME;
use crate::geometry::radial_distance;
use crate::killer::RadialBoundaryKiller;
use crate::population::CellPopulation;
use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use oncosim_common::{AttachmentConfig, KillerConfig, MutationState, SimulationConfig, Vec2};
use rand::distr::Uniform;
use rand::Rng;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DURATIONS_FILENAME: &str = "attachment_durations.dat";

/// Plain-text log of attachment durations, one line of tab-separated values per step.
#[derive(Debug)]
pub struct DurationLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl DurationLog {
    pub fn create<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let dir = output_dir.as_ref();
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
        let path = dir.join(DURATIONS_FILENAME);
        let file = File::create(&path).with_context(|| format!("Failed to create '{}'", path.display()))?;
        Ok(DurationLog { path, writer: BufWriter::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_step(&mut self, durations: &[f64]) -> Result<()> {
        let line = durations.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\t");
        writeln!(self.writer, "{}", line).with_context(|| format!("Failed to write to '{}'", self.path.display()))
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush '{}'", self.path.display()))
    }
}

/// Counts of what one pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransitionSummary {
    pub attached: usize,
    pub detached: usize,
    pub teleported: usize,
    pub recentred: usize,
    pub annulus_kills: usize,
    pub labelled: usize,
    pub contact_kills: usize,
    pub unlabelled: usize,
    /// Attachment durations completed this step.
    pub durations: Vec<f64>,
}

#[derive(Debug, Clone)]
struct AttachmentRules {
    attachment_probability: f64,
    detachment_probability: f64,
    attachment_height: f64,
    track_durations: bool,
}

#[derive(Debug, Clone)]
struct ContactRules {
    radial: RadialBoundaryKiller,
    target_kind: MutationState,
    opposing_kind: MutationState,
    kill_probability: f64,
    anchor: Vec2,
}

/// Ordered per-cell transitions run once at the end of every timestep.
///
/// Each live cell is visited once in location-index order and the rules are
/// applied in sequence, so a later rule sees the state left by an earlier one.
/// Cells already marked for death when reached are skipped.
#[derive(Debug)]
pub struct TransitionEngine {
    attachment: Option<AttachmentRules>,
    contact: Option<ContactRules>,
    unit: Uniform<f64>,
    log: Option<DurationLog>,
}

impl TransitionEngine {
    /// Builds the engine; rule groups whose config section is disabled are skipped.
    pub fn new(attachment: &AttachmentConfig, killer: &KillerConfig, domain_radius: f64, anchor: Vec2) -> Result<Self> {
        let attachment = attachment.enabled.then(|| AttachmentRules {
            attachment_probability: attachment.attachment_probability,
            detachment_probability: attachment.detachment_probability,
            attachment_height: attachment.attachment_height,
            track_durations: attachment.output_attachment_durations,
        });
        let contact = if killer.enabled {
            Some(ContactRules {
                radial: RadialBoundaryKiller::from_config(killer, domain_radius)?,
                target_kind: killer.target_kind,
                opposing_kind: killer.opposing_kind,
                kill_probability: killer.kill_probability,
                anchor,
            })
        } else {
            None
        };
        Ok(TransitionEngine {
            attachment,
            contact,
            unit: Uniform::new(0.0, 1.0)?,
            log: None,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        Self::new(&config.attachment, &config.killer, config.domain.domain_radius, config.anchor())
    }

    pub fn tracks_durations(&self) -> bool {
        self.attachment.as_ref().is_some_and(|a| a.track_durations)
    }

    /// Opens the duration log if tracking is on, then runs one pass.
    pub fn setup_solve<R: Rng + ?Sized, P: AsRef<Path>>(
        &mut self,
        population: &mut dyn CellPopulation,
        rng: &mut R,
        output_dir: P,
    ) -> Result<TransitionSummary> {
        if self.tracks_durations() {
            let log = DurationLog::create(output_dir)?;
            info!("Writing attachment durations to {}", log.path().display());
            self.log = Some(log);
        }
        self.update_at_end_of_time_step(population, rng)
    }

    /// Runs the transition pass and appends this step's durations to the log.
    pub fn update_at_end_of_time_step<R: Rng + ?Sized>(
        &mut self,
        population: &mut dyn CellPopulation,
        rng: &mut R,
    ) -> Result<TransitionSummary> {
        let summary = self.update_cell_states(population, rng);
        if let Some(log) = self.log.as_mut() {
            log.write_step(&summary.durations)?;
        }
        debug!(
            "Transitions at t = {:.3}: +{} attached, -{} detached, {} teleported, {} annulus kills, {} labelled, {} contact kills, {} unlabelled.",
            population.time(),
            summary.attached,
            summary.detached,
            summary.teleported,
            summary.annulus_kills,
            summary.labelled,
            summary.contact_kills,
            summary.unlabelled
        );
        Ok(summary)
    }

    /// Flushes and closes the duration log.
    pub fn update_at_end_of_solve(&mut self) -> Result<()> {
        if let Some(log) = self.log.take() {
            log.finish()?;
        }
        Ok(())
    }

    /// One pass of every enabled rule over the population.
    pub fn update_cell_states<R: Rng + ?Sized>(
        &self,
        population: &mut dyn CellPopulation,
        rng: &mut R,
    ) -> TransitionSummary {
        population.update();
        let now = population.time();
        let dt = population.dt();
        let mut summary = TransitionSummary::default();

        for index in 0..population.num_cells() {
            if population.cell(index).is_dead() {
                continue;
            }
            if let Some(rules) = &self.attachment {
                self.apply_attachment(rules, population, index, now, dt, rng, &mut summary);
            }
            if let Some(rules) = &self.contact {
                self.apply_contact(rules, population, index, rng, &mut summary);
            }
        }
        summary
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_attachment<R: Rng + ?Sized>(
        &self,
        rules: &AttachmentRules,
        population: &mut dyn CellPopulation,
        index: usize,
        now: f64,
        dt: f64,
        rng: &mut R,
        summary: &mut TransitionSummary,
    ) {
        let y = population.location(index).y;
        let cell = population.cell_mut(index);
        if !cell.is(MutationState::Attached) {
            let draw = rng.sample(self.unit);
            if draw < rules.attachment_probability * dt && y < rules.attachment_height {
                cell.set_mutation_state(MutationState::Attached);
                if rules.track_durations {
                    cell.data_mut().set_item(ATTACH_TIME, now);
                }
                summary.attached += 1;
            }
        } else {
            let draw = rng.sample(self.unit);
            if draw < rules.detachment_probability * dt {
                cell.set_mutation_state(MutationState::WildType);
                if rules.track_durations {
                    match cell.data().item(ATTACH_TIME) {
                        Some(attached_at) => summary.durations.push(now - attached_at),
                        None => warn!("Cell {} detached at t = {:.3} without a recorded attach time.", index, now),
                    }
                    cell.data_mut().set_item(ATTACH_TIME, 0.0);
                }
                summary.detached += 1;
            }
        }
    }

    fn apply_contact<R: Rng + ?Sized>(
        &self,
        rules: &ContactRules,
        population: &mut dyn CellPopulation,
        index: usize,
        rng: &mut R,
        summary: &mut TransitionSummary,
    ) {
        let r = radial_distance(population.location(index));

        if rules.radial.teleport_if_escaped(population, index, r, rng) {
            summary.teleported += 1;
        } else if population.cell(index).is_stem() {
            population.set_location(index, rules.anchor);
            summary.recentred += 1;
        }

        if rules.radial.kill_if_in_annulus(population, index, r) {
            summary.annulus_kills += 1;
        }

        if population.cell(index).is(rules.opposing_kind) {
            self.label_or_kill_neighbour(rules, population, index, rng, summary);
        }

        let cell = population.cell(index);
        if cell.is(rules.target_kind) && cell.is_labelled() {
            let touching_opposing = population
                .neighbouring_indices(index)
                .into_iter()
                .any(|n| population.cell(n).is(rules.opposing_kind));
            if !touching_opposing {
                population.cell_mut(index).remove_label();
                summary.unlabelled += 1;
            }
        }
    }

    /// The first unlabelled target neighbour gets labelled; a labelled one is
    /// killed together with this cell with probability `kill_probability`.
    ///
    /// Neighbours marked for death earlier in the pass are still scanned.
    fn label_or_kill_neighbour<R: Rng + ?Sized>(
        &self,
        rules: &ContactRules,
        population: &mut dyn CellPopulation,
        index: usize,
        rng: &mut R,
        summary: &mut TransitionSummary,
    ) {
        for neighbour in population.neighbouring_indices(index) {
            let other = population.cell(neighbour);
            if !other.is(rules.target_kind) {
                continue;
            }
            if !other.is_labelled() {
                population.cell_mut(neighbour).add_label();
                summary.labelled += 1;
                trace!("Cell {} labelled by tumour cell {}.", neighbour, index);
                return;
            }
            if rng.sample(self.unit) < rules.kill_probability {
                population.cell_mut(neighbour).kill();
                population.cell_mut(index).kill();
                summary.contact_kills += 1;
                trace!("Cells {} and {} killed on contact.", neighbour, index);
                return;
            }
        }
    }
}
