//! Pipeline configuration and backend description.
//!
//! A [`PipelineConfig`] is built once and shared read-only by every stage. It
//! names the target basis, the optional coupling map, the instruction map with
//! the backend's native pulses, and the numerical tolerances.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use crisp_compile::{BasisGates, CouplingMap, EchoMode, PipelineConfig};
//! use crisp_pulse::InstructionMap;
//!
//! let map = Arc::new(InstructionMap::synthetic(3, &[(0, 1), (1, 2)]));
//! let config = PipelineConfig::new(BasisGates::ibm_cr(), map)
//!     .with_coupling_map(CouplingMap::linear(3))
//!     .with_echo_mode(EchoMode::Pulse);
//!
//! assert!(config.augmented_basis().contains("rzx"));
//! assert!(!config.basis_gates().contains("rzx"));
//! ```
//!
//! A backend can be loaded from YAML:
//!
//! ```
//! use crisp_compile::BackendConfig;
//!
//! let yaml = BackendConfig::synthetic("fake", 2, &[(0, 1)]).to_yaml().unwrap();
//! let backend = BackendConfig::from_yaml(&yaml).unwrap();
//! assert_eq!(backend.name, "fake");
//! let config = backend.pipeline_config().unwrap();
//! assert!(config.coupling_map().unwrap().is_connected(1, 0));
//! ```

use std::fmt;
use std::sync::Arc;

use crisp_pulse::InstructionMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Name of the native cross-resonance gate added to every target basis.
pub const RZX_GATE_NAME: &str = "rzx";

/// Synthesis basis recorded on consolidated blocks.
pub const DEFAULT_SYNTHESIS_BASIS: [&str; 4] = ["rz", "sx", "x", "rxx"];

/// Default reconstruction tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Default cutoff below which a Weyl coordinate counts as zero.
pub const DEFAULT_ATOL: f64 = 1e-12;

/// Target device coupling map.
///
/// Edges are undirected: the map only states which pairs may interact. The
/// native CR direction of a pair comes from the instruction map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMap {
    /// Connected qubit pairs.
    edges: Vec<(u32, u32)>,
    /// Number of physical qubits.
    num_qubits: u32,
    #[serde(skip)]
    adjacency: FxHashMap<u32, Vec<u32>>,
}

impl CouplingMap {
    /// Create a coupling map without edges.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            edges: vec![],
            num_qubits,
            adjacency: FxHashMap::default(),
        }
    }

    /// Build a map from an edge list. The qubit count is one past the
    /// largest index mentioned.
    pub fn from_edges(edges: &[(u32, u32)]) -> Self {
        let num_qubits = edges
            .iter()
            .map(|&(a, b)| a.max(b) + 1)
            .max()
            .unwrap_or(0);
        let mut map = Self::new(num_qubits);
        for &(a, b) in edges {
            map.add_edge(a, b);
        }
        map
    }

    /// Add an edge between two qubits.
    ///
    /// Duplicate edges, in either direction, are ignored.
    pub fn add_edge(&mut self, q1: u32, q2: u32) {
        if self.is_connected(q1, q2) {
            return;
        }
        self.edges.push((q1, q2));
        self.adjacency.entry(q1).or_default().push(q2);
        self.adjacency.entry(q2).or_default().push(q1);
        self.num_qubits = self.num_qubits.max(q1.max(q2) + 1);
    }

    /// Rebuild the adjacency list from the edge list. Needed after
    /// deserialization.
    pub fn rebuild_caches(&mut self) {
        self.adjacency.clear();
        for &(q1, q2) in &self.edges {
            self.adjacency.entry(q1).or_default().push(q2);
            self.adjacency.entry(q2).or_default().push(q1);
        }
    }

    /// Check if two qubits are directly connected.
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.adjacency
            .get(&q1)
            .is_some_and(|neighbors| neighbors.contains(&q2))
    }

    /// Get the number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the coupling edges.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Get neighbors of a qubit.
    pub fn neighbors(&self, qubit: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency
            .get(&qubit)
            .map(|v| v.iter().copied())
            .into_iter()
            .flatten()
    }

    /// Create a linear coupling map (0-1-2-3-...).
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(i, i + 1);
        }
        map
    }

    /// Create a fully connected coupling map.
    pub fn full(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                map.add_edge(i, j);
            }
        }
        map
    }
}

/// Basis gates for the target device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisGates {
    /// List of gate names in the basis.
    gates: Vec<String>,
}

impl BasisGates {
    /// Create a new basis gates set.
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut basis = Self { gates: vec![] };
        for gate in gates {
            basis.insert(gate);
        }
        basis
    }

    /// Check if a gate is in the basis.
    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|g| g == gate)
    }

    /// Get the basis gates.
    pub fn gates(&self) -> &[String] {
        &self.gates
    }

    /// Whether the basis names no gate at all.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Add a gate, keeping names unique.
    pub fn insert(&mut self, gate: impl Into<String>) {
        let gate = gate.into();
        if !self.contains(&gate) {
            self.gates.push(gate);
        }
    }

    /// Copy of the basis with `gate` added.
    #[must_use]
    pub fn with(&self, gate: &str) -> Self {
        let mut basis = self.clone();
        basis.insert(gate);
        basis
    }

    /// IBM cross-resonance basis (RZ + SX + X + CX).
    pub fn ibm_cr() -> Self {
        Self::new(["rz", "sx", "x", "cx"])
    }
}

impl fmt::Display for BasisGates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gates.join(", "))
    }
}

/// Where the echo that cancels the CR's local terms is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EchoMode {
    /// Two opposite-sign `rzx` gates around an `x` on the control; each
    /// `rzx` gets a single-segment schedule.
    #[default]
    Gate,
    /// One `rzx` per interaction term; its schedule carries the echo.
    Pulse,
}

/// Immutable configuration shared by all pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    basis_gates: BasisGates,
    coupling_map: Option<CouplingMap>,
    instruction_map: Arc<InstructionMap>,
    tolerance: f64,
    atol: f64,
    echo_mode: EchoMode,
    verify: bool,
    synthesis_basis: Vec<String>,
}

impl PipelineConfig {
    /// Configuration with default tolerances, gate echoes and final
    /// verification enabled.
    pub fn new(basis_gates: BasisGates, instruction_map: Arc<InstructionMap>) -> Self {
        Self {
            basis_gates,
            coupling_map: None,
            instruction_map,
            tolerance: DEFAULT_TOLERANCE,
            atol: DEFAULT_ATOL,
            echo_mode: EchoMode::default(),
            verify: true,
            synthesis_basis: DEFAULT_SYNTHESIS_BASIS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Set the coupling map.
    #[must_use]
    pub fn with_coupling_map(mut self, coupling_map: CouplingMap) -> Self {
        self.coupling_map = Some(coupling_map);
        self
    }

    /// Set the reconstruction tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the Weyl coordinate cutoff.
    #[must_use]
    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// Set the echo placement.
    #[must_use]
    pub fn with_echo_mode(mut self, echo_mode: EchoMode) -> Self {
        self.echo_mode = echo_mode;
        self
    }

    /// Enable or disable the final output check.
    #[must_use]
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Set the synthesis basis recorded on consolidated blocks.
    #[must_use]
    pub fn with_synthesis_basis(mut self, basis: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.synthesis_basis = basis.into_iter().map(Into::into).collect();
        self
    }

    /// The configured basis, without `rzx`.
    pub fn basis_gates(&self) -> &BasisGates {
        &self.basis_gates
    }

    /// The basis every output gate must belong to: the configured basis
    /// plus `rzx`.
    pub fn augmented_basis(&self) -> BasisGates {
        self.basis_gates.with(RZX_GATE_NAME)
    }

    /// The coupling map, if any.
    pub fn coupling_map(&self) -> Option<&CouplingMap> {
        self.coupling_map.as_ref()
    }

    /// The backend's native pulses.
    pub fn instruction_map(&self) -> &InstructionMap {
        &self.instruction_map
    }

    /// Reconstruction tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Weyl coordinate cutoff.
    pub fn atol(&self) -> f64 {
        self.atol
    }

    /// Echo placement.
    pub fn echo_mode(&self) -> EchoMode {
        self.echo_mode
    }

    /// Whether the final output check runs.
    pub fn verify(&self) -> bool {
        self.verify
    }

    /// Synthesis basis recorded on consolidated blocks.
    pub fn synthesis_basis(&self) -> &[String] {
        &self.synthesis_basis
    }

    /// Reject configurations no stage can work with.
    pub fn validate(&self) -> CompileResult<()> {
        if self.basis_gates.is_empty() {
            return Err(CompileError::InvalidConfig("basis gate set is empty".into()));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(CompileError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !self.atol.is_finite() || self.atol < 0.0 {
            return Err(CompileError::InvalidConfig(format!(
                "atol must be non-negative, got {}",
                self.atol
            )));
        }
        Ok(())
    }
}

/// A backend description as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name.
    pub name: String,
    /// Native gate names, without `rzx`.
    pub basis_gates: Vec<String>,
    /// Connected pairs. Absent means all pairs are allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupling_map: Option<Vec<(u32, u32)>>,
    /// Echo placement.
    #[serde(default)]
    pub echo_mode: EchoMode,
    /// Native pulse data.
    pub instruction_map: InstructionMap,
}

impl BackendConfig {
    /// Parse a backend from YAML.
    pub fn from_yaml(source: &str) -> CompileResult<Self> {
        let backend: Self = serde_yaml_ng::from_str(source)
            .map_err(|e| CompileError::InvalidConfig(format!("backend YAML: {e}")))?;
        backend.instruction_map.validate()?;
        Ok(backend)
    }

    /// Parse a backend from JSON.
    pub fn from_json(source: &str) -> CompileResult<Self> {
        let backend: Self = serde_json::from_str(source)
            .map_err(|e| CompileError::InvalidConfig(format!("backend JSON: {e}")))?;
        backend.instruction_map.validate()?;
        Ok(backend)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> CompileResult<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| CompileError::InvalidConfig(format!("backend YAML: {e}")))
    }

    /// A backend with the IBM CR basis and synthetic pulses on `pairs`.
    pub fn synthetic(name: impl Into<String>, num_qubits: u32, pairs: &[(u32, u32)]) -> Self {
        Self {
            name: name.into(),
            basis_gates: BasisGates::ibm_cr().gates().to_vec(),
            coupling_map: Some(pairs.to_vec()),
            echo_mode: EchoMode::default(),
            instruction_map: InstructionMap::synthetic(num_qubits, pairs),
        }
    }

    /// Build the pipeline configuration for this backend.
    pub fn pipeline_config(&self) -> CompileResult<PipelineConfig> {
        let mut config = PipelineConfig::new(
            BasisGates::new(self.basis_gates.iter().cloned()),
            Arc::new(self.instruction_map.clone()),
        )
        .with_echo_mode(self.echo_mode);
        if let Some(edges) = &self.coupling_map {
            config = config.with_coupling_map(CouplingMap::from_edges(edges));
        }
        config.validate()?;
        Ok(config)
    }
}
