use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coefficient::Coefficient;
use crate::parser::ParseError;
use crate::problem::{ParameterizedProblem, RowSense, UNBOUNDED};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Unknown metabolite: {0}")]
    UnknownMetabolite(String),
    #[error("Unknown reaction: {0}")]
    UnknownReaction(String),
    #[error("Duplicate metabolite: {0}")]
    DuplicateMetabolite(String),
    #[error("Duplicate reaction: {0}")]
    DuplicateReaction(String),
    #[error("Invalid sense `{0}`; expected E, L, or G")]
    InvalidSense(String),
    #[error("In {field} of `{id}`: {source}")]
    Expression {
        id: String,
        field: &'static str,
        source: ParseError,
    },
}

/// A growth-dependent field: either a plain number or an expression in
/// `mu`, e.g. `"10 - 5*mu"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MuValue {
    Number(f64),
    Formula(String),
}

impl MuValue {
    fn to_coefficient(&self, id: &str, field: &'static str) -> Result<Coefficient, DocumentError> {
        match self {
            MuValue::Number(v) => Ok(Coefficient::Constant(*v)),
            MuValue::Formula(source) => {
                Coefficient::parse(source).map_err(|source| DocumentError::Expression {
                    id: id.to_string(),
                    field,
                    source,
                })
            }
        }
    }
}

fn default_lower() -> MuValue {
    MuValue::Number(0.0)
}

fn default_upper() -> MuValue {
    MuValue::Number(UNBOUNDED)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaboliteDoc {
    pub id: String,
    #[serde(default)]
    pub rhs: f64,
    /// Row sense: `E` (default), `L`, or `G`
    #[serde(default)]
    pub sense: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionDoc {
    pub id: String,
    #[serde(default = "default_lower")]
    pub lower: MuValue,
    #[serde(default = "default_upper")]
    pub upper: MuValue,
    #[serde(default)]
    pub objective: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoefficientDoc {
    pub metabolite: String,
    pub reaction: String,
    pub value: MuValue,
}

/// On-disk problem description. Metabolite order fixes row order and
/// reaction order fixes column order, so a document maps to exactly one
/// assembled problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDocument {
    #[serde(default)]
    pub name: String,
    pub metabolites: Vec<MetaboliteDoc>,
    pub reactions: Vec<ReactionDoc>,
    pub coefficients: Vec<CoefficientDoc>,
}

impl ProblemDocument {
    pub fn to_problem(&self) -> Result<ParameterizedProblem, DocumentError> {
        let mut row_of = HashMap::new();
        for (i, met) in self.metabolites.iter().enumerate() {
            if row_of.insert(met.id.clone(), i).is_some() {
                return Err(DocumentError::DuplicateMetabolite(met.id.clone()));
            }
        }
        let mut col_of = HashMap::new();
        for (j, rxn) in self.reactions.iter().enumerate() {
            if col_of.insert(rxn.id.clone(), j).is_some() {
                return Err(DocumentError::DuplicateReaction(rxn.id.clone()));
            }
        }

        let rows = self.metabolites.iter().map(|m| m.id.clone()).collect();
        let columns = self.reactions.iter().map(|r| r.id.clone()).collect();
        let mut problem = ParameterizedProblem::new(rows, columns);

        for (i, met) in self.metabolites.iter().enumerate() {
            problem.set_rhs(i, met.rhs);
            if let Some(sense) = &met.sense {
                let sense = match sense.as_str() {
                    "E" | "=" => RowSense::Eq,
                    "L" | "<=" => RowSense::Le,
                    "G" | ">=" => RowSense::Ge,
                    other => return Err(DocumentError::InvalidSense(other.to_string())),
                };
                problem.set_sense(i, sense);
            }
        }

        let mut objective = vec![0.0; self.reactions.len()];
        for (j, rxn) in self.reactions.iter().enumerate() {
            let lower = rxn.lower.to_coefficient(&rxn.id, "lower")?;
            let upper = rxn.upper.to_coefficient(&rxn.id, "upper")?;
            problem.set_bounds(j, lower, upper);
            objective[j] = rxn.objective;
        }
        problem.set_objective(objective);

        for entry in &self.coefficients {
            let row = *row_of
                .get(&entry.metabolite)
                .ok_or_else(|| DocumentError::UnknownMetabolite(entry.metabolite.clone()))?;
            let col = *col_of
                .get(&entry.reaction)
                .ok_or_else(|| DocumentError::UnknownReaction(entry.reaction.clone()))?;
            let value = entry.value.to_coefficient(&entry.reaction, "coefficient")?;
            problem.set_coefficient(row, col, value);
        }

        Ok(problem.compiled())
    }
}
