//! Dependency graph and parallel walker
//!
//! The graph is an explicit adjacency map keyed by FQDN; there are no
//! back-pointers into the resource set. Walks run visits through a
//! bounded tokio task pool: vertices whose remaining-counter reaches
//! zero become ready, ready vertices are scheduled in stable name order,
//! and a completed visit unblocks its successors. A failed visit (or a
//! cancellation signal) stops scheduling while in-flight visits run to
//! completion.

use std::collections::{BTreeSet, HashMap};

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use drydock_core::ResourceSet;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

/// Options for one walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Upper bound on concurrently running visits. The effective pool is
    /// the smaller of this and the number of initially ready vertices.
    pub max_parallel: usize,
    /// Stop scheduling new visits after the first error. Destroy with
    /// `force` turns this off.
    pub halt_on_error: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_parallel: 8,
            halt_on_error: true,
        }
    }
}

/// Outcome of a walk: every visited vertex in completion order, the
/// errors collected, and whether the walk was cancelled.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub visited: Vec<String>,
    pub errors: Vec<EngineError>,
    pub cancelled: bool,
}

impl WalkReport {
    /// Collapse the report into the error apply/destroy returns: the
    /// first provider error wins, then cancellation.
    pub fn into_first_error(mut self) -> Result<()> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        if self.cancelled {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }
}

/// Directed acyclic graph over resource FQDNs.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    /// Vertices in sorted order, one per FQDN.
    nodes: Vec<String>,
    /// Vertex -> the vertices it depends on.
    dependencies: HashMap<String, Vec<String>>,
    /// Vertex -> the vertices depending on it.
    dependents: HashMap<String, Vec<String>>,
}

impl ResourceGraph {
    /// Construct the graph for a resource set. Rejects references to
    /// undeclared resources and dependency cycles.
    pub fn build(set: &ResourceSet) -> Result<Self> {
        let mut nodes: Vec<String> = set.iter().map(|r| r.fqdn()).collect();
        nodes.sort();

        let mut dependencies: HashMap<String, Vec<String>> =
            nodes.iter().map(|n| (n.clone(), Vec::new())).collect();
        let mut dependents: HashMap<String, Vec<String>> =
            nodes.iter().map(|n| (n.clone(), Vec::new())).collect();

        for resource in set.iter() {
            let fqdn = resource.fqdn();
            let mut seen = BTreeSet::new();

            for reference in &resource.depends_on {
                let target = set
                    .find_dependent_resource(reference)
                    .map_err(|e| EngineError::Config(format!("{fqdn}: {e}")))?
                    .fqdn();

                if target == fqdn {
                    return Err(EngineError::Cycle(format!("{fqdn} -> {fqdn}")));
                }

                // a reference listed twice is one edge
                if seen.insert(target.clone()) {
                    dependencies.get_mut(&fqdn).unwrap().push(target.clone());
                    dependents.get_mut(&target).unwrap().push(fqdn.clone());
                }
            }
        }

        let graph = Self {
            nodes,
            dependencies,
            dependents,
        };

        if let Some(path) = graph.find_cycle() {
            return Err(EngineError::Cycle(path.join(" -> ")));
        }

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of vertices with no dependencies; the natural fan-out of a
    /// forward walk.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| self.dependencies[*n].is_empty())
            .count()
    }

    /// Subgraph keeping only vertices the predicate accepts. Edges to or
    /// from dropped vertices are dropped with them.
    pub fn prune<P: Fn(&str) -> bool>(&self, pred: P) -> ResourceGraph {
        let kept: BTreeSet<String> = self
            .nodes
            .iter()
            .filter(|n| pred(n.as_str()))
            .cloned()
            .collect();

        let filter = |edges: &HashMap<String, Vec<String>>| -> HashMap<String, Vec<String>> {
            kept.iter()
                .map(|n| {
                    let retained: Vec<String> = edges[n]
                        .iter()
                        .filter(|t| kept.contains(*t))
                        .cloned()
                        .collect();
                    (n.clone(), retained)
                })
                .collect()
        };

        ResourceGraph {
            nodes: kept.iter().cloned().collect(),
            dependencies: filter(&self.dependencies),
            dependents: filter(&self.dependents),
        }
    }

    /// Visit every vertex, dependencies first. See [`Self::walk_reverse`]
    /// for the destroy direction.
    pub async fn walk_forward<F>(
        &self,
        options: WalkOptions,
        cancel: watch::Receiver<bool>,
        visit: F,
    ) -> WalkReport
    where
        F: Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync,
    {
        self.walk(Direction::Forward, options, cancel, visit).await
    }

    /// Visit every vertex, dependents first.
    pub async fn walk_reverse<F>(
        &self,
        options: WalkOptions,
        cancel: watch::Receiver<bool>,
        visit: F,
    ) -> WalkReport
    where
        F: Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync,
    {
        self.walk(Direction::Reverse, options, cancel, visit).await
    }

    async fn walk<F>(
        &self,
        direction: Direction,
        options: WalkOptions,
        cancel: watch::Receiver<bool>,
        visit: F,
    ) -> WalkReport
    where
        F: Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync,
    {
        let (blockers, unblocked) = match direction {
            Direction::Forward => (&self.dependencies, &self.dependents),
            Direction::Reverse => (&self.dependents, &self.dependencies),
        };

        let mut remaining: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), blockers[n].len()))
            .collect();

        let mut ready: BTreeSet<String> = self
            .nodes
            .iter()
            .filter(|n| remaining[n.as_str()] == 0)
            .cloned()
            .collect();

        let pool = options.max_parallel.max(1).min(ready.len().max(1));
        debug!(vertices = self.nodes.len(), pool, "starting graph walk");

        let mut tasks: JoinSet<(String, Result<()>)> = JoinSet::new();
        let mut report = WalkReport::default();
        let mut halted = false;

        loop {
            while !halted && tasks.len() < pool {
                if *cancel.borrow() {
                    report.cancelled = true;
                    halted = true;
                    break;
                }

                let Some(next) = ready.pop_first() else { break };
                let fut = visit(next.clone());
                tasks.spawn(async move { (next, fut.await) });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            match joined {
                Ok((fqdn, result)) => {
                    debug!(resource = %fqdn, ok = result.is_ok(), "visit finished");

                    if let Err(err) = result {
                        report.errors.push(err);
                        if options.halt_on_error {
                            halted = true;
                        }
                    }

                    for successor in &unblocked[&fqdn] {
                        let count = remaining.get_mut(successor.as_str()).unwrap();
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(successor.clone());
                        }
                    }

                    report.visited.push(fqdn);
                }
                Err(join_err) => {
                    warn!(error = %join_err, "visit task aborted");
                    report.errors.push(EngineError::Provider {
                        fqdn: "<unknown>".to_string(),
                        message: join_err.to_string(),
                    });
                    halted = true;
                }
            }
        }

        report
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        fn dfs(
            node: &str,
            deps: &HashMap<String, Vec<String>>,
            marks: &mut HashMap<String, Mark>,
            path: &mut Vec<String>,
        ) -> bool {
            marks.insert(node.to_string(), Mark::Grey);
            path.push(node.to_string());

            for next in &deps[node] {
                match marks[next.as_str()] {
                    Mark::Grey => {
                        path.push(next.clone());
                        return true;
                    }
                    Mark::White => {
                        if dfs(next, deps, marks, path) {
                            return true;
                        }
                    }
                    Mark::Black => {}
                }
            }

            marks.insert(node.to_string(), Mark::Black);
            path.pop();
            false
        }

        let mut marks: HashMap<String, Mark> =
            self.nodes.iter().map(|n| (n.clone(), Mark::White)).collect();

        for node in &self.nodes {
            if marks[node.as_str()] == Mark::White {
                let mut path = Vec::new();
                if dfs(node, &self.dependencies, &mut marks, &mut path) {
                    // trim the path to the cycle itself
                    let last = path.last().cloned().unwrap_or_default();
                    let start = path.iter().position(|n| *n == last).unwrap_or(0);
                    return Some(path[start..].to_vec());
                }
            }
        }

        None
    }
}
