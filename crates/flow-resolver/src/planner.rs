//! Dependency-ordered deployment planning.
//!
//! Contracts import each other by path; the planner turns those imports into
//! a graph over contract names, rejects cycles, and emits the contracts so
//! that every contract comes after everything it imports. Ties keep the order
//! in which contracts were added, so the same configuration always yields the
//! same plan.

use std::collections::HashMap;

use flow_types::{Address, Error, Result, Value};
use tracing::debug;

use crate::parser::Location;
use crate::resolver::{clean_path, import_path, is_path_location, AddressMap, ResolvedContract, Resolver};

/// One entry of a deployment plan, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedContract {
    pub name: String,
    pub source: String,
    pub target: Address,
    /// Source with every import rewritten to an address import.
    pub code: String,
    pub args: Vec<Value>,
    /// In-project contracts this one imports.
    pub dependencies: Vec<String>,
}

struct Node {
    contract: ResolvedContract,
    resolver: Resolver,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Collects contracts and their sources, then produces an ordered plan.
pub struct DeploymentPlanner {
    aliases: HashMap<String, Address>,
    nodes: Vec<Node>,
}

impl DeploymentPlanner {
    /// `aliases` maps source paths to addresses where those contracts already live.
    pub fn new(aliases: HashMap<String, Address>) -> Self {
        Self {
            aliases,
            nodes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parse and register a contract. Names must be unique within a plan.
    pub fn add(&mut self, contract: ResolvedContract, code: &[u8]) -> Result<()> {
        if self.nodes.iter().any(|n| n.contract.name == contract.name) {
            return Err(Error::AmbiguousDeployment(contract.name));
        }
        let resolver = Resolver::new(code, &contract.source)
            .map_err(|e| Error::parse(format!("contract {}", contract.name), e))?;
        self.nodes.push(Node { contract, resolver });
        Ok(())
    }

    /// Order the contracts and rewrite their imports.
    pub fn plan(self) -> Result<Vec<PlannedContract>> {
        let edges = self.dependency_edges()?;
        let order = self.sort(&edges)?;

        let contracts: Vec<ResolvedContract> =
            self.nodes.iter().map(|n| n.contract.clone()).collect();
        let addresses = AddressMap::new(&contracts, &self.aliases);

        let mut planned = Vec::with_capacity(order.len());
        for index in order {
            let node = &self.nodes[index];
            let code = node.resolver.resolve_with(&addresses)?;
            planned.push(PlannedContract {
                name: node.contract.name.clone(),
                source: node.contract.source.clone(),
                target: node.contract.target,
                code,
                args: node.contract.args.clone(),
                dependencies: edges[index]
                    .iter()
                    .map(|&dep| self.nodes[dep].contract.name.clone())
                    .collect(),
            });
        }

        debug!(
            order = ?planned.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "deployment plan"
        );
        Ok(planned)
    }

    /// For each node, the indices of the in-project contracts it imports.
    ///
    /// Imports satisfied by an alias are leaves and produce no edge.
    fn dependency_edges(&self) -> Result<Vec<Vec<usize>>> {
        let mut by_path = HashMap::new();
        let mut by_name = HashMap::new();
        for (index, node) in self.nodes.iter().enumerate() {
            by_path.insert(clean_path(&node.contract.source), index);
            by_name.insert(node.contract.name.as_str(), index);
        }
        let aliases = AddressMap::new(&[], &self.aliases);

        let mut edges = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut deps: Vec<usize> = Vec::new();
            for import in node.resolver.program().unresolved_imports() {
                let (found, missing) = match &import.location {
                    Location::String(location) if is_path_location(location) => {
                        let path = import_path(&node.contract.source, location);
                        (by_path.get(path.as_str()).copied(), aliases.lookup_path(&path).is_none())
                    }
                    Location::String(name) | Location::Identifier(name) => {
                        (by_name.get(name.as_str()).copied(), aliases.lookup_name(name).is_none())
                    }
                    Location::Address(_) => continue,
                };

                match found {
                    Some(dep) if !deps.contains(&dep) => deps.push(dep),
                    Some(_) => {}
                    None if missing => {
                        let location = match &import.location {
                            Location::String(s) | Location::Identifier(s) => s.clone(),
                            Location::Address(a) => a.hex_with_prefix(),
                        };
                        return Err(Error::UnresolvedImport(location));
                    }
                    None => {}
                }
            }
            edges.push(deps);
        }
        Ok(edges)
    }

    /// Depth-first topological sort with three-colour cycle detection.
    fn sort(&self, edges: &[Vec<usize>]) -> Result<Vec<usize>> {
        let mut marks = vec![Mark::White; self.nodes.len()];
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for start in 0..self.nodes.len() {
            if marks[start] == Mark::White {
                self.visit(start, edges, &mut marks, &mut stack, &mut order)?;
            }
        }
        Ok(order)
    }

    fn visit(
        &self,
        index: usize,
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<()> {
        marks[index] = Mark::Gray;
        stack.push(index);

        for &dep in &edges[index] {
            match marks[dep] {
                Mark::White => self.visit(dep, edges, marks, stack, order)?,
                Mark::Gray => {
                    let from = stack.iter().position(|&i| i == dep).unwrap_or(0);
                    let mut cycle: Vec<String> = stack[from..]
                        .iter()
                        .map(|&i| self.nodes[i].contract.name.clone())
                        .collect();
                    cycle.push(self.nodes[dep].contract.name.clone());
                    return Err(Error::ImportCycle(cycle));
                }
                Mark::Black => {}
            }
        }

        stack.pop();
        marks[index] = Mark::Black;
        order.push(index);
        Ok(())
    }
}
