//! Whole-graph calculations, registered by name.
//!
//! A [`Calculation`] receives the visible structure of a view as a plain petgraph graph whose
//! node weights are document names and whose edge weights are predicate lists.

use once_cell::sync::Lazy;
use petgraph::{algo, graph::NodeIndex, Direction};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use crate::error::ExoError;

pub type CalcGraph = petgraph::Graph<String, Vec<String>>;

/// Registry holding the built-in calculations.
pub static CALCULATIONS: Lazy<CalculationRegistry> = Lazy::new(CalculationRegistry::with_builtins);

const DEFAULT_DAMPING: f64 = 0.85;
const DEFAULT_ITERATIONS: usize = 100;

/// Arguments accepted by the built-in calculations. Each calculation reads the fields it
/// needs and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcArgs {
    /// pagerank damping factor, within `[0, 1]`
    pub damping: Option<f64>,
    /// pagerank iteration count
    pub iterations: Option<usize>,
    /// shortest_path start vertex
    pub source: Option<String>,
    /// shortest_path goal vertex
    pub target: Option<String>,
}

/// One configured calculation: `true` runs it with default arguments, a table supplies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipe {
    Enabled(bool),
    Args(CalcArgs),
}

/// Calculations to run per predicate mask, as configured under `[recipes.predicates.<p>]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipes {
    pub predicates: BTreeMap<String, BTreeMap<String, Recipe>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degree {
    pub in_degree: usize,
    pub out_degree: usize,
}

impl Degree {
    pub fn total(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalcOutput {
    /// A score per vertex name
    Scores { scores: BTreeMap<String, f64> },
    /// A route between two vertices, `None` when unreachable
    Path {
        cost: Option<f64>,
        vertices: Vec<String>,
    },
    Degrees { degrees: BTreeMap<String, Degree> },
}

pub trait Calculation: Send + Sync {
    fn name(&self) -> &'static str;

    fn calculate(&self, graph: &CalcGraph, args: &CalcArgs) -> Result<CalcOutput, ExoError>;
}

/// Calculations keyed by name. Built explicitly: nothing registers itself.
#[derive(Clone, Default)]
pub struct CalculationRegistry {
    calculations: BTreeMap<&'static str, Arc<dyn Calculation>>,
}

impl std::fmt::Debug for CalculationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.calculations.keys()).finish()
    }
}

impl CalculationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = CalculationRegistry::new();
        let builtins: [Arc<dyn Calculation>; 3] =
            [Arc::new(PageRank), Arc::new(ShortestPath), Arc::new(DegreeCount)];
        for calculation in builtins {
            registry
                .calculations
                .insert(calculation.name(), calculation);
        }
        registry
    }

    /// Add `calculation`. A name can only be registered once.
    pub fn register(&mut self, calculation: Arc<dyn Calculation>) -> Result<(), ExoError> {
        let name = calculation.name();
        if self.calculations.contains_key(name) {
            return Err(ExoError::Invariant(format!(
                "calculation '{name}' is already registered"
            )));
        }
        self.calculations.insert(name, calculation);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn Calculation>, ExoError> {
        self.calculations
            .get(name)
            .ok_or_else(|| ExoError::not_found("calculation", name))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.calculations.keys().copied().collect()
    }
}

fn node_by_name(graph: &CalcGraph, name: &str) -> Result<NodeIndex, ExoError> {
    graph
        .node_indices()
        .find(|i| graph[*i] == name)
        .ok_or_else(|| ExoError::not_found("vertex", name))
}

/// Centrality ranking by petgraph's page rank.
#[derive(Debug, Default, Clone)]
pub struct PageRank;

impl Calculation for PageRank {
    fn name(&self) -> &'static str {
        "pagerank"
    }

    fn calculate(&self, graph: &CalcGraph, args: &CalcArgs) -> Result<CalcOutput, ExoError> {
        let damping = args.damping.unwrap_or(DEFAULT_DAMPING);
        if !(0.0..=1.0).contains(&damping) {
            return Err(ExoError::Config(format!(
                "pagerank damping must lie within [0, 1], got {damping}"
            )));
        }
        if graph.node_count() == 0 {
            return Ok(CalcOutput::Scores {
                scores: BTreeMap::new(),
            });
        }
        let ranks = algo::page_rank(
            graph,
            damping,
            args.iterations.unwrap_or(DEFAULT_ITERATIONS),
        );
        Ok(CalcOutput::Scores {
            scores: graph
                .node_indices()
                .map(|i| (graph[i].clone(), ranks[i.index()]))
                .collect(),
        })
    }
}

/// Fewest-edges route between `source` and `target`.
#[derive(Debug, Default, Clone)]
pub struct ShortestPath;

impl Calculation for ShortestPath {
    fn name(&self) -> &'static str {
        "shortest_path"
    }

    fn calculate(&self, graph: &CalcGraph, args: &CalcArgs) -> Result<CalcOutput, ExoError> {
        let (Some(source), Some(target)) = (&args.source, &args.target) else {
            return Err(ExoError::Config(
                "shortest_path needs both 'source' and 'target'".to_string(),
            ));
        };
        let start = node_by_name(graph, source)?;
        let goal = node_by_name(graph, target)?;
        let route = algo::astar(graph, start, |n| n == goal, |_| 1.0, |_| 0.0);
        Ok(match route {
            Some((cost, path)) => CalcOutput::Path {
                cost: Some(cost),
                vertices: path.into_iter().map(|i| graph[i].clone()).collect(),
            },
            None => CalcOutput::Path {
                cost: None,
                vertices: Vec::new(),
            },
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct DegreeCount;

impl Calculation for DegreeCount {
    fn name(&self) -> &'static str {
        "degree"
    }

    fn calculate(&self, graph: &CalcGraph, _args: &CalcArgs) -> Result<CalcOutput, ExoError> {
        Ok(CalcOutput::Degrees {
            degrees: graph
                .node_indices()
                .map(|i| {
                    (
                        graph[i].clone(),
                        Degree {
                            in_degree: graph.edges_directed(i, Direction::Incoming).count(),
                            out_degree: graph.edges_directed(i, Direction::Outgoing).count(),
                        },
                    )
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> CalcGraph {
        let mut graph = CalcGraph::new();
        let a = graph.add_node("a".to_string());
        let b = graph.add_node("b".to_string());
        let c = graph.add_node("c".to_string());
        graph.add_edge(a, b, vec!["ref".to_string()]);
        graph.add_edge(b, c, vec!["ref".to_string()]);
        graph.add_edge(a, c, vec!["in".to_string()]);
        graph
    }

    #[test]
    fn duplicate_registration_is_an_invariant_error() {
        let mut registry = CalculationRegistry::with_builtins();
        assert!(matches!(
            registry.register(Arc::new(PageRank)),
            Err(ExoError::Invariant(_))
        ));
        assert_eq!(registry.names(), vec!["degree", "pagerank", "shortest_path"]);
    }

    #[test]
    fn unknown_calculation_is_not_found() {
        let err = CALCULATIONS.get("betweenness").err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn pagerank_favors_sinks() {
        let CalcOutput::Scores { scores } = PageRank.calculate(&chain(), &CalcArgs::default()).unwrap()
        else {
            panic!("expected scores");
        };
        assert!(scores["c"] > scores["a"]);
    }

    #[test]
    fn pagerank_rejects_bad_damping() {
        let args = CalcArgs {
            damping: Some(1.5),
            ..Default::default()
        };
        assert!(PageRank.calculate(&chain(), &args).is_err());
    }

    #[test]
    fn shortest_path_prefers_direct_edge() {
        let args = CalcArgs {
            source: Some("a".to_string()),
            target: Some("c".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ShortestPath.calculate(&chain(), &args).unwrap(),
            CalcOutput::Path {
                cost: Some(1.0),
                vertices: vec!["a".to_string(), "c".to_string()],
            }
        );
        let missing = CalcArgs {
            source: Some("a".to_string()),
            ..Default::default()
        };
        assert!(ShortestPath.calculate(&chain(), &missing).is_err());
    }

    #[test]
    fn degrees_count_both_directions() {
        let CalcOutput::Degrees { degrees } = DegreeCount.calculate(&chain(), &CalcArgs::default()).unwrap()
        else {
            panic!("expected degrees");
        };
        assert_eq!(degrees["b"].total(), 2);
        assert_eq!(degrees["a"].out_degree, 2);
        assert_eq!(degrees["c"].in_degree, 2);
    }

    #[test]
    fn recipes_deserialize_from_toml() {
        let recipes: Recipes = toml::from_str(
            r#"
            [predicates.in]
            pagerank = true
            degree = false

            [predicates.ref.shortest_path]
            source = "a"
            target = "c"
            "#,
        )
        .unwrap();
        assert_eq!(recipes.predicates["in"]["pagerank"], Recipe::Enabled(true));
        assert_eq!(
            recipes.predicates["ref"]["shortest_path"],
            Recipe::Args(CalcArgs {
                source: Some("a".to_string()),
                target: Some("c".to_string()),
                ..Default::default()
            })
        );
    }
}
