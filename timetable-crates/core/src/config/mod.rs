//! The JSON document a timetabling run is described by.
//!
//! [`ScheduleConfig`] mirrors the document one-to-one; [`ScheduleConfig::into_domain`] resolves
//! every name and slot reference and produces the typed [`Domain`].
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::AllowedOverlap;
use crate::domain::Batch;
use crate::domain::BatchId;
use crate::domain::BuildingId;
use crate::domain::Domain;
use crate::domain::FixedPlacement;
use crate::domain::Penalty;
use crate::domain::PreferenceWeights;
use crate::domain::Session;
use crate::domain::SlotGrid;
use crate::domain::SlotId;
use crate::domain::SlotKind;
use crate::domain::SlotRestriction;
use crate::domain::SubjectId;
use crate::domain::TeacherDaySpan;
use crate::domain::TeacherId;
use crate::domain::TimeSlot;
use crate::ConfigError;

/// A slot, named either by its position in the day or by its label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotRef {
    Index(usize),
    Label(String),
}

impl SlotRef {
    fn resolve(&self, grid: &SlotGrid, context: impl FnOnce() -> String) -> Result<SlotId, ConfigError> {
        let resolved = match self {
            SlotRef::Index(index) => Some(SlotId(*index)).filter(|slot| grid.get(*slot).is_some()),
            SlotRef::Label(label) => grid.find_by_label(label),
        };
        resolved.ok_or_else(|| ConfigError::UnknownSlot {
            context: context(),
            slot: match self {
                SlotRef::Index(index) => index.to_string(),
                SlotRef::Label(label) => label.clone(),
            },
        })
    }
}

/// The teacher of a subject: one for both sessions, or one per session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacultyConfig {
    Single(TeacherId),
    Pair([TeacherId; 2]),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub label: String,
    #[serde(default)]
    pub kind: SlotKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelConfig {
    pub from: BuildingId,
    pub to: BuildingId,
    pub penalty: Penalty,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub id: BatchId,
    pub building: BuildingId,
    /// The slots the batch may use; all teachable slots of the grid when absent.
    #[serde(default)]
    pub slots: Option<Vec<SlotRef>>,
    #[serde(default)]
    pub excluded_slots: Vec<SlotRef>,
    /// The subjects the batch takes; every subject when absent.
    #[serde(default)]
    pub subjects: Option<Vec<SubjectId>>,
    #[serde(default)]
    pub faculty: BTreeMap<SubjectId, FacultyConfig>,
    #[serde(default)]
    pub double_weight_slots: Vec<SlotRef>,
    #[serde(default)]
    pub single_trip: Vec<SubjectId>,
    #[serde(default)]
    pub fully_fixed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedConfig {
    pub batch: BatchId,
    pub slot: SlotRef,
    pub subject: SubjectId,
    pub teacher: TeacherId,
    /// 0 for the first session, 1 for the second.
    pub session: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapConfig {
    pub teacher: TeacherId,
    pub slot: SlotRef,
    pub buildings: BTreeSet<BuildingId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionConfig {
    pub batch: BatchId,
    pub slot: SlotRef,
    pub subjects: BTreeSet<SubjectId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySpanConfig {
    pub teacher: TeacherId,
    pub early: SlotRef,
    pub late: SlotRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub slots: Vec<SlotConfig>,
    pub buildings: Vec<BuildingId>,
    #[serde(default)]
    pub travel: Vec<TravelConfig>,
    pub subjects: Vec<SubjectId>,
    pub batches: Vec<BatchConfig>,
    #[serde(default)]
    pub fixed: Vec<FixedConfig>,
    #[serde(default)]
    pub allowed_overlaps: Vec<OverlapConfig>,
    #[serde(default)]
    pub slot_restrictions: Vec<RestrictionConfig>,
    #[serde(default)]
    pub day_spans: Vec<DaySpanConfig>,
    #[serde(default)]
    pub weights: PreferenceWeights,
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
}

impl ScheduleConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Read configuration from {}", path.display());
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Resolve every reference and build the typed problem description.
    ///
    /// Fails on the first dangling slot or session reference. Name references are resolved
    /// by [`Domain::validate`], which this calls before returning.
    pub fn into_domain(self) -> Result<Domain, ConfigError> {
        let grid = SlotGrid::new(
            self.slots
                .into_iter()
                .map(|slot| TimeSlot::new(slot.label, slot.kind))
                .collect(),
        );
        let mut domain = Domain::new(grid);
        domain.buildings = self.buildings;
        domain.subjects = self.subjects;
        domain.weights = self.weights;
        if let Some(seconds) = self.time_limit_secs {
            domain.time_limit = Duration::from_secs(seconds);
        }

        for entry in self.travel {
            domain.travel.set(entry.from, entry.to, entry.penalty);
        }

        for config in self.batches {
            let batch = resolve_batch(&domain, &config)?;
            for (subject, faculty) in config.faculty {
                let teachers = match faculty {
                    FacultyConfig::Single(teacher) => [teacher.clone(), teacher],
                    FacultyConfig::Pair(teachers) => teachers,
                };
                for (session, teacher) in Session::ALL.into_iter().zip(teachers) {
                    let _ = domain
                        .faculty
                        .assign(batch.id.clone(), subject.clone(), session, teacher);
                }
            }
            domain.batches.push(batch);
        }

        for fixed in self.fixed {
            let slot = fixed.slot.resolve(&domain.slots, || {
                format!("fixed placement of {} for batch {}", fixed.subject, fixed.batch)
            })?;
            let session =
                Session::from_index(fixed.session).ok_or_else(|| ConfigError::InvalidSession {
                    batch: fixed.batch.clone(),
                    subject: fixed.subject.clone(),
                    session: fixed.session,
                })?;
            domain.fixed_placements.push(FixedPlacement {
                batch: fixed.batch,
                slot,
                subject: fixed.subject,
                teacher: fixed.teacher,
                session,
            });
        }

        for overlap in self.allowed_overlaps {
            let slot = overlap.slot.resolve(&domain.slots, || {
                format!("allowed overlap of {}", overlap.teacher)
            })?;
            domain.allowed_overlaps.push(AllowedOverlap {
                teacher: overlap.teacher,
                slot,
                buildings: overlap.buildings,
            });
        }

        for restriction in self.slot_restrictions {
            let slot = restriction.slot.resolve(&domain.slots, || {
                format!("slot restriction of batch {}", restriction.batch)
            })?;
            domain.slot_restrictions.push(SlotRestriction {
                batch: restriction.batch,
                slot,
                subjects: restriction.subjects,
            });
        }

        for span in self.day_spans {
            let context = || format!("day span of {}", span.teacher);
            let early = span.early.resolve(&domain.slots, context)?;
            let late = span.late.resolve(&domain.slots, context)?;
            domain.day_spans.push(TeacherDaySpan {
                teacher: span.teacher,
                early,
                late,
            });
        }

        domain.validate()?;
        Ok(domain)
    }
}

fn resolve_batch(domain: &Domain, config: &BatchConfig) -> Result<Batch, ConfigError> {
    let context = || format!("batch {}", config.id);
    let resolve_all = |refs: &[SlotRef]| {
        refs.iter()
            .map(|slot| slot.resolve(&domain.slots, context))
            .collect::<Result<BTreeSet<_>, _>>()
    };

    let excluded = resolve_all(&config.excluded_slots)?;
    let slots = match &config.slots {
        Some(slots) => resolve_all(slots)?,
        None => domain
            .slots
            .iter()
            .filter(|(_, slot)| slot.kind.is_teachable())
            .map(|(slot, _)| slot)
            .collect(),
    };

    let mut batch = Batch::new(
        config.id.clone(),
        config.building.clone(),
        slots.difference(&excluded).copied(),
        config
            .subjects
            .clone()
            .unwrap_or_else(|| domain.subjects.clone()),
    );
    batch.double_weight_slots = resolve_all(&config.double_weight_slots)?;
    batch.single_trip_subjects = config.single_trip.iter().cloned().collect();
    batch.fully_fixed = config.fully_fixed;
    Ok(batch)
}
