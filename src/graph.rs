//! Metric dependency graph
//!
//! A static table declares, for every [`Metric`], the metrics it is computed
//! from, how to compute it and how many decimals subscribers see. The
//! reverse edges ("depended by") are derived once when the graph is built and
//! drive propagation in the handler. The table is acyclic by construction;
//! [`DependencyGraph::topological_order`] lets tests prove it.

use std::collections::VecDeque;
use std::fmt;

use crate::config::Profile;
use crate::formulas::{self, BodyScoreInput};
use crate::metric::{Metric, MetricValue};
use crate::store::MetricsView;

/// Computes a metric from the profile and the metrics already available.
///
/// Returns `None` when the value cannot be computed yet.
pub type Calculate = fn(&Profile, &MetricsView<'_>) -> Option<MetricValue>;

/// Static description of one metric
#[derive(Clone)]
pub struct MetricInfo {
    /// The metric described
    pub metric: Metric,
    /// Metrics that must all be available before computing
    pub depends_on: &'static [Metric],
    /// Formula, `None` for metrics fed from outside
    pub calculate: Option<Calculate>,
    /// Decimals shown to subscribers
    pub decimals: Option<u32>,
    depended_by: Vec<Metric>,
}

impl MetricInfo {
    /// Metrics that list this one as a dependency
    pub fn depended_by(&self) -> &[Metric] {
        &self.depended_by
    }
}

impl fmt::Debug for MetricInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricInfo")
            .field("metric", &self.metric)
            .field("depends_on", &self.depends_on)
            .field("calculated", &self.calculate.is_some())
            .field("decimals", &self.decimals)
            .field("depended_by", &self.depended_by)
            .finish()
    }
}

struct Definition {
    metric: Metric,
    depends_on: &'static [Metric],
    calculate: Option<Calculate>,
    decimals: Option<u32>,
}

const fn input(metric: Metric, decimals: Option<u32>) -> Definition {
    Definition {
        metric,
        depends_on: &[],
        calculate: None,
        decimals,
    }
}

const fn derived(
    metric: Metric,
    depends_on: &'static [Metric],
    calculate: Calculate,
    decimals: Option<u32>,
) -> Definition {
    Definition {
        metric,
        depends_on,
        calculate: Some(calculate),
        decimals,
    }
}

use Metric::*;

const DEFINITIONS: [Definition; Metric::COUNT] = [
    input(Status, None),
    input(Age, Some(0)),
    input(Weight, Some(2)),
    input(Impedance, Some(0)),
    // weight only
    derived(Bmi, &[Weight], calc_bmi, Some(1)),
    derived(Bmr, &[Age, Weight], calc_bmr, Some(0)),
    derived(VisceralFat, &[Age, Weight], calc_visceral_fat, Some(0)),
    // weight and impedance
    derived(Lbm, &[Age, Weight, Impedance], calc_lbm, Some(1)),
    derived(FatPercentage, &[Age, Weight, Lbm], calc_fat_percentage, Some(1)),
    derived(WaterPercentage, &[FatPercentage], calc_water_percentage, Some(1)),
    derived(BoneMass, &[Lbm], calc_bone_mass, Some(2)),
    derived(
        MuscleMass,
        &[Weight, FatPercentage, BoneMass],
        calc_muscle_mass,
        Some(2),
    ),
    derived(MetabolicAge, &[Weight, Age, Impedance], calc_metabolic_age, Some(0)),
    derived(
        ProteinPercentage,
        &[Weight, MuscleMass, WaterPercentage],
        calc_protein_percentage,
        Some(1),
    ),
    derived(
        FatMassToIdealWeight,
        &[Weight, FatPercentage, Age],
        calc_fat_mass_to_ideal_weight,
        Some(2),
    ),
    derived(BodyType, &[MuscleMass, FatPercentage, Age], calc_body_type, None),
    derived(
        BodyScore,
        &[
            Bmi,
            FatPercentage,
            Age,
            MuscleMass,
            WaterPercentage,
            Weight,
            BoneMass,
            Bmr,
            VisceralFat,
            ProteinPercentage,
        ],
        calc_body_score,
        Some(0),
    ),
    input(LastMeasurementTime, None),
];

fn calc_bmi(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    Some(formulas::bmi(profile.height(), weight).into())
}

fn calc_bmr(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    let age = metrics.number(Age)?;
    Some(formulas::bmr(profile.gender(), profile.height(), weight, age).into())
}

fn calc_visceral_fat(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    let age = metrics.number(Age)?;
    Some(formulas::visceral_fat(profile.gender(), profile.height(), weight, age).into())
}

fn calc_lbm(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    let impedance = metrics.number(Impedance)?;
    let age = metrics.number(Age)?;
    Some(formulas::lbm(profile.height(), weight, impedance, age).into())
}

fn calc_fat_percentage(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    let age = metrics.number(Age)?;
    let lbm = metrics.number(Lbm)?;
    Some(formulas::fat_percentage(profile.gender(), profile.height(), weight, age, lbm).into())
}

fn calc_water_percentage(_: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let fat = metrics.number(FatPercentage)?;
    Some(formulas::water_percentage(fat).into())
}

fn calc_bone_mass(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let lbm = metrics.number(Lbm)?;
    Some(formulas::bone_mass(profile.gender(), lbm).into())
}

fn calc_muscle_mass(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    let fat = metrics.number(FatPercentage)?;
    let bone = metrics.number(BoneMass)?;
    Some(formulas::muscle_mass(profile.gender(), weight, fat, bone).into())
}

fn calc_metabolic_age(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    let age = metrics.number(Age)?;
    let impedance = metrics.number(Impedance)?;
    Some(
        formulas::metabolic_age(profile.gender(), profile.height(), weight, age, impedance)
            .into(),
    )
}

fn calc_protein_percentage(_: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    let muscle = metrics.number(MuscleMass)?;
    let water = metrics.number(WaterPercentage)?;
    Some(formulas::protein_percentage(weight, muscle, water).into())
}

fn calc_fat_mass_to_ideal_weight(
    profile: &Profile,
    metrics: &MetricsView<'_>,
) -> Option<MetricValue> {
    let weight = metrics.number(Weight)?;
    let fat = metrics.number(FatPercentage)?;
    let age = metrics.age()?;
    Some(formulas::fat_mass_to_ideal_weight(profile.scale(), age, weight, fat).into())
}

fn calc_body_type(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let muscle = metrics.number(MuscleMass)?;
    let fat = metrics.number(FatPercentage)?;
    let age = metrics.age()?;
    Some(formulas::body_type(profile.scale(), age, fat, muscle).as_str().into())
}

fn calc_body_score(profile: &Profile, metrics: &MetricsView<'_>) -> Option<MetricValue> {
    let input = BodyScoreInput {
        age: metrics.age()?,
        weight: metrics.number(Weight)?,
        bmi: metrics.number(Bmi)?,
        fat_percentage: metrics.number(FatPercentage)?,
        muscle_mass: metrics.number(MuscleMass)?,
        water_percentage: metrics.number(WaterPercentage)?,
        bone_mass: metrics.number(BoneMass)?,
        bmr: metrics.number(Bmr)?,
        visceral_fat: metrics.number(VisceralFat)?,
        protein_percentage: metrics.number(ProteinPercentage)?,
    };
    Some(formulas::body_score(profile.scale(), &input).into())
}

/// Immutable metric graph with reverse edges
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    infos: Vec<MetricInfo>,
}

impl DependencyGraph {
    /// Build the graph from the static table
    pub fn new() -> Self {
        let mut infos: Vec<MetricInfo> = DEFINITIONS
            .iter()
            .map(|definition| MetricInfo {
                metric: definition.metric,
                depends_on: definition.depends_on,
                calculate: definition.calculate,
                decimals: definition.decimals,
                depended_by: Vec::new(),
            })
            .collect();
        infos.sort_by_key(|info| info.metric);

        for definition in DEFINITIONS.iter() {
            for dependency in definition.depends_on {
                infos[dependency.index()]
                    .depended_by
                    .push(definition.metric);
            }
        }

        Self { infos }
    }

    /// Static information about a metric
    pub fn info(&self, metric: Metric) -> &MetricInfo {
        &self.infos[metric.index()]
    }

    pub fn depends_on(&self, metric: Metric) -> &'static [Metric] {
        self.info(metric).depends_on
    }

    pub fn depended_by(&self, metric: Metric) -> &[Metric] {
        self.info(metric).depended_by()
    }

    pub fn decimals(&self, metric: Metric) -> Option<u32> {
        self.info(metric).decimals
    }

    /// All metric infos in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &MetricInfo> {
        self.infos.iter()
    }

    /// Metrics without dependencies
    pub fn roots(&self) -> Vec<Metric> {
        self.infos
            .iter()
            .filter(|info| info.depends_on.is_empty())
            .map(|info| info.metric)
            .collect()
    }

    /// Every metric reachable through reverse edges from `metric`
    pub fn transitive_dependents(&self, metric: Metric) -> Vec<Metric> {
        let mut seen = [false; Metric::COUNT];
        let mut queue: VecDeque<Metric> = self.depended_by(metric).iter().copied().collect();
        let mut result = Vec::new();

        while let Some(next) = queue.pop_front() {
            if seen[next.index()] {
                continue;
            }
            seen[next.index()] = true;
            result.push(next);
            queue.extend(self.depended_by(next).iter().copied());
        }

        result.sort();
        result
    }

    /// Metrics ordered so that dependencies come first, `None` on a cycle
    pub fn topological_order(&self) -> Option<Vec<Metric>> {
        let mut in_degree: Vec<usize> = self.infos.iter().map(|i| i.depends_on.len()).collect();
        let mut ready: VecDeque<Metric> = self.roots().into_iter().collect();
        let mut order = Vec::with_capacity(Metric::COUNT);

        while let Some(metric) = ready.pop_front() {
            order.push(metric);
            for dependent in self.depended_by(metric) {
                in_degree[dependent.index()] -= 1;
                if in_degree[dependent.index()] == 0 {
                    ready.push_back(*dependent);
                }
            }
        }

        (order.len() == Metric::COUNT).then_some(order)
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
