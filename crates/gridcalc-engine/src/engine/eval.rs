//! Formula evaluation against a grid snapshot.
//!
//! A formula body (text after the leading `=`) is evaluated in four passes:
//!
//! 1. **Aggregates**: `SUM|AVG|COUNT(REF:REF)` calls become their result.
//! 2. **References**: each remaining `A1` token becomes the referenced value.
//!    Formula cells are evaluated against the same snapshot; literal cells
//!    are read as numbers, `0` when not numeric or absent.
//! 3. **Validation**: only digits, `.`, whitespace, parentheses and
//!    `+ - * /` may remain, otherwise the result is `#ERR`.
//! 4. **Arithmetic**: the remaining text goes to [`evaluate_arithmetic`].
//!
//! Referenced formulas are resolved depth-first on an explicit stack of
//! frames rather than by recursion, so chain length is bounded by memory and
//! not by the thread stack. The frames on the stack are the path of cells
//! currently being evaluated. A reference to a cell already on that path is a
//! cycle; what it produces is chosen by [`CyclePolicy`].
//!
//! Within one evaluation each cell is resolved once and its value reused,
//! unless a cycle was reached beneath it: such a value depends on the path it
//! was reached by, so it is recomputed whenever it is needed again.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::arith::evaluate_arithmetic;
use super::cell::Grid;
use super::cell_ref::{CellRef, cell_token_re};
use super::deps::parse_range;
use super::format::{CYCLE_SENTINEL, ERROR_SENTINEL, format_number, parse_number};
use crate::builtins::{apply_range_builtin, range_fn_re};

/// What a reference back onto the current evaluation path produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// The cyclic reference reads as `0` and evaluation carries on.
    #[default]
    Propagate,
    /// The whole evaluation yields `#CYCLE`.
    Flag,
}

/// One formula on the evaluation path, waiting for its references.
struct Frame {
    /// `None` for a formula that does not belong to any cell.
    cell: Option<CellRef>,
    /// Body with aggregate calls already replaced.
    expr: String,
    /// Distinct references in `expr`, in order of appearance.
    refs: Vec<CellRef>,
    next: usize,
    resolved: HashMap<CellRef, String>,
    /// A cycle was reached from this frame or any frame above it.
    cyclic: bool,
}

/// A referenced cell's value if known without evaluating, else its formula.
enum Lookup<'g> {
    Value(String),
    Formula(&'g str),
}

/// Evaluates formulas against one snapshot.
pub struct Evaluator<'g> {
    grid: &'g Grid,
    policy: CyclePolicy,
    cache: HashMap<CellRef, String>,
    cycle_hit: bool,
}

impl<'g> Evaluator<'g> {
    pub fn new(grid: &'g Grid, policy: CyclePolicy) -> Self {
        Evaluator {
            grid,
            policy,
            cache: HashMap::new(),
            cycle_hit: false,
        }
    }

    /// Evaluate a formula body that does not belong to any cell.
    pub fn evaluate(&mut self, formula: &str) -> String {
        let value = self.run(None, formula);
        self.finish(value)
    }

    /// Evaluate the formula body stored at `origin`. The origin counts as
    /// being on the path, so a formula that reads itself is a cycle.
    pub fn evaluate_cell(&mut self, origin: &CellRef, formula: &str) -> String {
        let value = self.run(Some(*origin), formula);
        self.finish(value)
    }

    fn finish(&self, value: String) -> String {
        if self.cycle_hit && self.policy == CyclePolicy::Flag {
            CYCLE_SENTINEL.to_string()
        } else {
            value
        }
    }

    fn run(&mut self, origin: Option<CellRef>, formula: &str) -> String {
        self.cycle_hit = false;
        self.cache.clear();

        let mut stack = vec![self.frame(origin, formula)];
        let mut on_path: HashSet<CellRef> = origin.into_iter().collect();
        loop {
            let Some(top) = stack.last_mut() else {
                return ERROR_SENTINEL.to_string();
            };

            if let Some(&cell_ref) = top.refs.get(top.next) {
                top.next += 1;
                if on_path.contains(&cell_ref) {
                    log::warn!("Circular reference to {} while evaluating", cell_ref);
                    self.cycle_hit = true;
                    top.cyclic = true;
                    top.resolved.insert(cell_ref, "0".to_string());
                    continue;
                }
                match self.lookup(&cell_ref) {
                    Lookup::Value(value) => {
                        top.resolved.insert(cell_ref, value);
                    }
                    Lookup::Formula(body) => {
                        let frame = self.frame(Some(cell_ref), body);
                        on_path.insert(cell_ref);
                        stack.push(frame);
                    }
                }
                continue;
            }

            let Some(done) = stack.pop() else {
                return ERROR_SENTINEL.to_string();
            };
            let value = self.substitute(&done);
            match stack.last_mut() {
                Some(parent) => {
                    if let Some(cell_ref) = done.cell {
                        on_path.remove(&cell_ref);
                        if !done.cyclic {
                            self.cache.insert(cell_ref, value.clone());
                        }
                        parent.resolved.insert(cell_ref, value);
                    }
                    parent.cyclic |= done.cyclic;
                }
                None => return value,
            }
        }
    }

    fn lookup(&self, cell_ref: &CellRef) -> Lookup<'g> {
        if let Some(value) = self.cache.get(cell_ref) {
            return Lookup::Value(value.clone());
        }
        let grid: &'g Grid = self.grid;
        let Some(cell) = grid.get(cell_ref) else {
            return Lookup::Value("0".to_string());
        };
        match cell.formula() {
            Some(body) => Lookup::Formula(body),
            None => Lookup::Value(
                parse_number(&cell.raw_value)
                    .map(format_number)
                    .unwrap_or_else(|| "0".to_string()),
            ),
        }
    }

    fn frame(&self, cell: Option<CellRef>, formula: &str) -> Frame {
        log::debug!("Evaluating formula: '{}'", formula);

        let grid = self.grid;
        let expr = range_fn_re()
            .replace_all(formula, |caps: &regex::Captures| {
                let values = range_values(grid, &caps[2]);
                apply_range_builtin(&caps[1], &values)
            })
            .into_owned();
        log::debug!("Formula after function replacement: '{}'", expr);

        let mut refs: Vec<CellRef> = Vec::new();
        for cell_ref in cell_token_re()
            .find_iter(&expr)
            .filter_map(|m| CellRef::from_str(m.as_str()))
        {
            if !refs.contains(&cell_ref) {
                refs.push(cell_ref);
            }
        }

        Frame {
            cell,
            expr,
            refs,
            next: 0,
            resolved: HashMap::new(),
            cyclic: false,
        }
    }

    /// Replace every reference in a finished frame and evaluate the result.
    fn substitute(&self, frame: &Frame) -> String {
        let expr = cell_token_re()
            .replace_all(&frame.expr, |caps: &regex::Captures| {
                CellRef::from_str(&caps[0])
                    .and_then(|cell_ref| frame.resolved.get(&cell_ref).cloned())
                    .unwrap_or_else(|| "0".to_string())
            })
            .into_owned();
        log::debug!("Final expression to evaluate: '{}'", expr);

        if let Some(bad) = expr.chars().find(|c| !is_arithmetic_char(*c)) {
            log::warn!("Expression '{}' contains invalid character '{}'", expr, bad);
            return ERROR_SENTINEL.to_string();
        }

        match evaluate_arithmetic(&expr) {
            Ok(n) => format_number(n),
            Err(e) => {
                log::warn!("Failed to evaluate expression '{}': {}", expr, e);
                ERROR_SENTINEL.to_string()
            }
        }
    }
}

/// Evaluate a formula body with the default cycle policy.
pub fn evaluate_formula(formula: &str, grid: &Grid) -> String {
    Evaluator::new(grid, CyclePolicy::default()).evaluate(formula)
}

/// Computed values of every cell in a range argument. Positions that hold no
/// cell read as the empty string, which no aggregate counts, so only present
/// cells are visited when the range is larger than the snapshot.
fn range_values<'a>(grid: &'a Grid, arg: &str) -> Vec<&'a str> {
    let Some(range) = parse_range(arg) else {
        log::warn!("Range '{}' did not match expected format", arg.trim());
        return Vec::new();
    };

    match range.cell_count() {
        Some(count) if count <= grid.len() => range
            .cells()
            .map(|cell_ref| grid.computed_value(&cell_ref))
            .collect(),
        _ => grid
            .sorted()
            .into_iter()
            .filter(|(cell_ref, _)| range.contains(cell_ref))
            .map(|(_, cell)| cell.computed_value.as_str())
            .collect(),
    }
}

fn is_arithmetic_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | '(' | ')' | '+' | '-' | '*' | '/')
}
