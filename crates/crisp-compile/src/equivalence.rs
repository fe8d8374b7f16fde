//! Equivalence library: rewrite rules from a gate to a gate sequence.
//!
//! Every rule holds up to global phase. The library is searched outward from
//! a target basis: a gate is reachable at level `k + 1` when some rule for it
//! uses only gates reachable at levels `<= k`. The first such rule, in library
//! order, is the one chosen, so a [`TranslationPlan`] always picks a rewrite
//! of minimal depth.
//!
//! ```
//! use crisp_compile::equivalence::standard_library;
//! use crisp_compile::BasisGates;
//!
//! let plan = standard_library().plan(&BasisGates::new(["rz", "sx", "x", "cx"]));
//! assert_eq!(plan.rule_for("h").unwrap().gates(), vec!["rz", "sx"]);
//! assert!(plan.rule_for("rzx").is_none());
//! ```

use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::sync::LazyLock;

use crisp_ir::{Instruction, ParameterExpression, QubitId, StandardGate};
use rustc_hash::FxHashMap;

use crate::config::BasisGates;

type RuleBody = fn(&[ParameterExpression]) -> Vec<Instruction>;

/// One rewrite `gate(params) == body(params)` on local qubits `0..n`.
pub struct EquivalenceRule {
    gate: &'static str,
    num_params: usize,
    body: RuleBody,
}

impl std::fmt::Debug for EquivalenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquivalenceRule")
            .field("gate", &self.gate)
            .field("body", &self.gates())
            .finish()
    }
}

impl EquivalenceRule {
    /// Name of the gate this rule rewrites.
    pub fn gate(&self) -> &'static str {
        self.gate
    }

    /// Body for the given parameters, or `None` on a parameter count mismatch.
    pub fn expand(&self, params: &[ParameterExpression]) -> Option<Vec<Instruction>> {
        (params.len() == self.num_params).then(|| (self.body)(params))
    }

    /// Distinct gate names used by the body, sorted.
    pub fn gates(&self) -> Vec<String> {
        let zeros = vec![ParameterExpression::constant(0.0); self.num_params];
        (self.body)(&zeros)
            .iter()
            .map(|inst| inst.name().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// An ordered collection of [`EquivalenceRule`]s.
#[derive(Debug)]
pub struct EquivalenceLibrary {
    rules: Vec<EquivalenceRule>,
}

/// Rewrite choice for each gate reachable from a basis.
#[derive(Debug)]
pub struct TranslationPlan<'a> {
    library: &'a EquivalenceLibrary,
    chosen: FxHashMap<&'static str, (usize, usize)>,
}

impl<'a> TranslationPlan<'a> {
    /// Rule to apply to `gate`, or `None` if the gate cannot be reached.
    pub fn rule_for(&self, gate: &str) -> Option<&'a EquivalenceRule> {
        self.chosen
            .get(gate)
            .map(|&(index, _)| &self.library.rules[index])
    }

    /// Search level at which `gate` became reachable.
    pub fn level(&self, gate: &str) -> Option<usize> {
        self.chosen.get(gate).map(|&(_, level)| level)
    }

    /// Number of translatable non-basis gates.
    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    /// Whether no gate outside the basis is reachable.
    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }
}

impl EquivalenceLibrary {
    /// The built-in library; same as [`standard_library`].
    pub fn standard() -> &'static Self {
        standard_library()
    }

    /// Rules in library order.
    pub fn rules(&self) -> &[EquivalenceRule] {
        &self.rules
    }

    /// Rules rewriting `gate`, in library order.
    pub fn rules_for<'s>(&'s self, gate: &'s str) -> impl Iterator<Item = &'s EquivalenceRule> {
        self.rules.iter().filter(move |r| r.gate == gate)
    }

    /// Level-by-level search from `basis`.
    pub fn plan(&self, basis: &BasisGates) -> TranslationPlan<'_> {
        let bodies: Vec<Vec<String>> = self.rules.iter().map(EquivalenceRule::gates).collect();
        let mut known: BTreeSet<String> = basis.gates().iter().cloned().collect();
        let mut chosen: FxHashMap<&'static str, (usize, usize)> = FxHashMap::default();

        for level in 1.. {
            let mut found: Vec<(&'static str, usize)> = vec![];
            for (index, rule) in self.rules.iter().enumerate() {
                if known.contains(rule.gate) || found.iter().any(|(g, _)| *g == rule.gate) {
                    continue;
                }
                if bodies[index].iter().all(|g| known.contains(g)) {
                    found.push((rule.gate, index));
                }
            }
            if found.is_empty() {
                break;
            }
            for (gate, index) in found {
                known.insert(gate.to_string());
                chosen.insert(gate, (index, level));
            }
        }

        TranslationPlan {
            library: self,
            chosen,
        }
    }
}

/// The built-in library.
pub fn standard_library() -> &'static EquivalenceLibrary {
    static LIBRARY: LazyLock<EquivalenceLibrary> = LazyLock::new(|| EquivalenceLibrary {
        rules: standard_rules(),
    });
    &LIBRARY
}

fn g1(gate: StandardGate, q: u32) -> Instruction {
    Instruction::single_qubit_gate(gate, QubitId(q))
}

fn g2(gate: StandardGate, a: u32, b: u32) -> Instruction {
    Instruction::two_qubit_gate(gate, QubitId(a), QubitId(b))
}

fn g3(gate: StandardGate, a: u32, b: u32, c: u32) -> Instruction {
    Instruction::gate(gate, [QubitId(a), QubitId(b), QubitId(c)])
}

fn c(value: f64) -> ParameterExpression {
    ParameterExpression::constant(value)
}

fn rule(gate: &'static str, num_params: usize, body: RuleBody) -> EquivalenceRule {
    EquivalenceRule {
        gate,
        num_params,
        body,
    }
}

fn rz(angle: f64) -> StandardGate {
    StandardGate::Rz(c(angle))
}

#[allow(clippy::too_many_lines)]
fn standard_rules() -> Vec<EquivalenceRule> {
    use StandardGate as G;
    vec![
        rule("id", 0, |_| vec![]),
        rule("h", 0, |_| {
            vec![g1(rz(PI / 2.0), 0), g1(G::SX, 0), g1(rz(PI / 2.0), 0)]
        }),
        rule("y", 0, |_| vec![g1(rz(PI), 0), g1(G::X, 0)]),
        rule("z", 0, |_| vec![g1(rz(PI), 0)]),
        rule("s", 0, |_| vec![g1(rz(PI / 2.0), 0)]),
        rule("sdg", 0, |_| vec![g1(rz(-PI / 2.0), 0)]),
        rule("t", 0, |_| vec![g1(rz(PI / 4.0), 0)]),
        rule("tdg", 0, |_| vec![g1(rz(-PI / 4.0), 0)]),
        rule("sxdg", 0, |_| {
            vec![g1(rz(PI), 0), g1(G::SX, 0), g1(rz(PI), 0)]
        }),
        rule("sx", 0, |_| {
            vec![g1(G::U(c(PI / 2.0), c(-PI / 2.0), c(PI / 2.0)), 0)]
        }),
        rule("rx", 1, |p| {
            vec![g1(G::H, 0), g1(G::Rz(p[0].clone()), 0), g1(G::H, 0)]
        }),
        rule("rx", 1, |p| {
            vec![g1(G::U(p[0].clone(), c(-PI / 2.0), c(PI / 2.0)), 0)]
        }),
        rule("ry", 1, |p| {
            vec![g1(G::Sdg, 0), g1(G::Rx(p[0].clone()), 0), g1(G::S, 0)]
        }),
        rule("ry", 1, |p| vec![g1(G::U(p[0].clone(), c(0.0), c(0.0)), 0)]),
        rule("p", 1, |p| vec![g1(G::Rz(p[0].clone()), 0)]),
        rule("rz", 1, |p| vec![g1(G::U(c(0.0), c(0.0), p[0].clone()), 0)]),
        rule("u", 3, |p| {
            let (theta, phi, lambda) = (p[0].clone(), p[1].clone(), p[2].clone());
            vec![
                g1(G::Rz(lambda), 0),
                g1(G::SX, 0),
                g1(G::Rz(theta + PI), 0),
                g1(G::SX, 0),
                g1(G::Rz(phi + PI), 0),
            ]
        }),
        rule("u", 3, |p| {
            vec![
                g1(G::Rz(p[2].clone()), 0),
                g1(G::Ry(p[0].clone()), 0),
                g1(G::Rz(p[1].clone()), 0),
            ]
        }),
        rule("h", 0, |_| vec![g1(G::U(c(PI / 2.0), c(0.0), c(PI)), 0)]),
        rule("x", 0, |_| vec![g1(G::U(c(PI), c(0.0), c(PI)), 0)]),
        rule("x", 0, |_| vec![g1(G::SX, 0), g1(G::SX, 0)]),
        rule("cz", 0, |_| vec![g1(G::H, 1), g2(G::CX, 0, 1), g1(G::H, 1)]),
        rule("cx", 0, |_| vec![g1(G::H, 1), g2(G::CZ, 0, 1), g1(G::H, 1)]),
        rule("cx", 0, |_| {
            vec![
                g1(G::Ry(c(PI / 2.0)), 0),
                g2(G::RXX(c(PI / 2.0)), 0, 1),
                g1(G::Rx(c(-PI / 2.0)), 0),
                g1(G::Rx(c(-PI / 2.0)), 1),
                g1(G::Ry(c(-PI / 2.0)), 0),
            ]
        }),
        rule("cy", 0, |_| vec![g1(G::Sdg, 1), g2(G::CX, 0, 1), g1(G::S, 1)]),
        rule("ch", 0, |_| {
            vec![
                g1(G::S, 1),
                g1(G::H, 1),
                g1(G::T, 1),
                g2(G::CX, 0, 1),
                g1(G::Tdg, 1),
                g1(G::H, 1),
                g1(G::Sdg, 1),
            ]
        }),
        rule("swap", 0, |_| {
            vec![g2(G::CX, 0, 1), g2(G::CX, 1, 0), g2(G::CX, 0, 1)]
        }),
        rule("iswap", 0, |_| {
            vec![
                g1(G::S, 0),
                g1(G::S, 1),
                g1(G::H, 0),
                g2(G::CX, 0, 1),
                g2(G::CX, 1, 0),
                g1(G::H, 1),
            ]
        }),
        rule("crx", 1, |p| {
            vec![
                g1(G::S, 1),
                g1(G::Ry(p[0].clone() / 2.0), 1),
                g2(G::CX, 0, 1),
                g1(G::Ry(-(p[0].clone() / 2.0)), 1),
                g2(G::CX, 0, 1),
                g1(G::Sdg, 1),
            ]
        }),
        rule("cry", 1, |p| {
            vec![
                g1(G::Ry(p[0].clone() / 2.0), 1),
                g2(G::CX, 0, 1),
                g1(G::Ry(-(p[0].clone() / 2.0)), 1),
                g2(G::CX, 0, 1),
            ]
        }),
        rule("crz", 1, |p| {
            vec![
                g1(G::Rz(p[0].clone() / 2.0), 1),
                g2(G::CX, 0, 1),
                g1(G::Rz(-(p[0].clone() / 2.0)), 1),
                g2(G::CX, 0, 1),
            ]
        }),
        rule("cp", 1, |p| {
            vec![
                g1(G::P(p[0].clone() / 2.0), 0),
                g2(G::CX, 0, 1),
                g1(G::P(-(p[0].clone() / 2.0)), 1),
                g2(G::CX, 0, 1),
                g1(G::P(p[0].clone() / 2.0), 1),
            ]
        }),
        rule("rxx", 1, |p| {
            vec![
                g1(G::H, 0),
                g1(G::H, 1),
                g2(G::CX, 0, 1),
                g1(G::Rz(p[0].clone()), 1),
                g2(G::CX, 0, 1),
                g1(G::H, 0),
                g1(G::H, 1),
            ]
        }),
        rule("ryy", 1, |p| {
            vec![
                g1(G::Rx(c(PI / 2.0)), 0),
                g1(G::Rx(c(PI / 2.0)), 1),
                g2(G::CX, 0, 1),
                g1(G::Rz(p[0].clone()), 1),
                g2(G::CX, 0, 1),
                g1(G::Rx(c(-PI / 2.0)), 0),
                g1(G::Rx(c(-PI / 2.0)), 1),
            ]
        }),
        rule("rzz", 1, |p| {
            vec![
                g2(G::CX, 0, 1),
                g1(G::Rz(p[0].clone()), 1),
                g2(G::CX, 0, 1),
            ]
        }),
        rule("ccx", 0, |_| {
            vec![
                g1(G::H, 2),
                g2(G::CX, 1, 2),
                g1(G::Tdg, 2),
                g2(G::CX, 0, 2),
                g1(G::T, 2),
                g2(G::CX, 1, 2),
                g1(G::Tdg, 2),
                g2(G::CX, 0, 2),
                g1(G::T, 1),
                g1(G::T, 2),
                g1(G::H, 2),
                g2(G::CX, 0, 1),
                g1(G::T, 0),
                g1(G::Tdg, 1),
                g2(G::CX, 0, 1),
            ]
        }),
        rule("cswap", 0, |_| {
            vec![g2(G::CX, 2, 1), g3(G::CCX, 0, 1, 2), g2(G::CX, 2, 1)]
        }),
    ]
}
