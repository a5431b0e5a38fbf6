//! In-process reference interpreter for the stage IR.
//!
//! Runs a [`Pipeline`] over an in-memory [`Dataset`] with the same row
//! semantics the document store applies to the lowered pipeline, so plan
//! behaviour can be checked against small fixtures without a server.

pub mod values;

use std::cell::RefCell;
use std::collections::HashMap;

use bson::{Bson, Document};
use chrono::Datelike;
use docbench_core::Collection;
use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::debug;

use crate::plan::*;
use values::{bracket_cmp, get_path, total_cmp, truthy, values_equal, Num};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("expression error: {0}")]
    Expression(String),
    #[error("invalid regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("unknown variable: $${0}")]
    UnknownVariable(String),
}

/// Documents for the eight collections of one database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    collections: HashMap<Collection, Vec<Document>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: Collection, docs: impl IntoIterator<Item = Document>) {
        self.collections.entry(collection).or_default().extend(docs);
    }

    pub fn with(mut self, collection: Collection, docs: impl IntoIterator<Item = Document>) -> Self {
        self.insert(collection, docs);
        self
    }

    pub fn collection(&self, collection: Collection) -> &[Document] {
        self.collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

type Vars = HashMap<String, Bson>;

/// Executes a plan against a dataset, returning the result rows.
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn execute(plan: &Pipeline, data: &Dataset) -> Result<Vec<Document>, ExecutorError> {
        let run = Run {
            data,
            regexes: RefCell::new(HashMap::new()),
        };
        let mut rows = data.collection(plan.entry).to_vec();
        debug!("Scan '{}': {} rows", plan.entry, rows.len());

        let vars = Vars::new();
        for (i, stage) in plan.stages.iter().enumerate() {
            rows = run.apply(stage, rows, &vars)?;
            debug!("Stage {} ({}): {} rows", i, stage.kind(), rows.len());
        }
        Ok(rows)
    }
}

struct Run<'a> {
    data: &'a Dataset,
    regexes: RefCell<HashMap<(String, bool), Regex>>,
}

fn with_field(row: &Document, name: &str, value: Bson) -> Document {
    let mut out = row.clone();
    out.insert(name, value);
    out
}

impl Run<'_> {
    fn run_stages(
        &self,
        stages: &[Stage],
        mut rows: Vec<Document>,
        vars: &Vars,
    ) -> Result<Vec<Document>, ExecutorError> {
        for stage in stages {
            rows = self.apply(stage, rows, vars)?;
        }
        Ok(rows)
    }

    fn apply(
        &self,
        stage: &Stage,
        rows: Vec<Document>,
        vars: &Vars,
    ) -> Result<Vec<Document>, ExecutorError> {
        match stage {
            Stage::Filter(p) => {
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    if self.matches(p, &row, vars)? {
                        out.push(row);
                    }
                }
                Ok(out)
            }
            Stage::Join(j) => Ok(self.join(j, rows)),
            Stage::Correlated(c) => self.correlated(c, rows, vars),
            Stage::Group(g) => self.group(g, rows, vars),
            Stage::Reshape(r) => rows.iter().map(|row| self.reshape(r, row, vars)).collect(),
            Stage::Sort(keys) => Ok(sort_rows(rows, keys)),
            Stage::Limit(n) => Ok(rows.into_iter().take(*n as usize).collect()),
            Stage::Branch(b) => self.branch(b, rows, vars),
        }
    }

    fn join(&self, j: &Join, rows: Vec<Document>) -> Vec<Document> {
        let targets = self.data.collection(j.from);
        let mut out = Vec::new();
        for row in &rows {
            let local = get_path(row, &j.local).unwrap_or(&Bson::Null);
            for target in targets {
                let foreign = get_path(target, &j.foreign).unwrap_or(&Bson::Null);
                if values_equal(local, foreign) {
                    out.push(with_field(row, &j.alias, Bson::Document(target.clone())));
                }
            }
        }
        out
    }

    fn correlated(
        &self,
        c: &CorrelatedJoin,
        rows: Vec<Document>,
        vars: &Vars,
    ) -> Result<Vec<Document>, ExecutorError> {
        let source = self.data.collection(c.sub.entry);
        let mut out = Vec::new();
        for row in rows {
            let mut inner_vars = vars.clone();
            for (name, value) in &c.bindings {
                inner_vars.insert(name.clone(), self.eval(value, &row, vars)?);
            }
            let candidates: Vec<Document> = match &c.on {
                Some(key) => {
                    let local = get_path(&row, &key.local).unwrap_or(&Bson::Null);
                    source
                        .iter()
                        .filter(|d| {
                            values_equal(local, get_path(d, &key.foreign).unwrap_or(&Bson::Null))
                        })
                        .cloned()
                        .collect()
                }
                None => source.to_vec(),
            };
            let results = self.run_stages(&c.sub.stages, candidates, &inner_vars)?;

            match c.bind {
                Bind::Flatten => {
                    for r in results {
                        out.push(with_field(&row, &c.alias, Bson::Document(r)));
                    }
                }
                Bind::Exists if !results.is_empty() => out.push(row),
                Bind::NotExists if results.is_empty() => out.push(row),
                Bind::Exists | Bind::NotExists => {}
                Bind::Count => {
                    let count = Num::Int(results.len() as i64).into_bson();
                    out.push(with_field(&row, &c.alias, count));
                }
            }
        }
        Ok(out)
    }

    fn group(
        &self,
        g: &Group,
        rows: Vec<Document>,
        vars: &Vars,
    ) -> Result<Vec<Document>, ExecutorError> {
        // first-seen order; keys compared with BSON equality
        let mut groups: Vec<(Bson, Vec<AccState>)> = Vec::new();
        for row in &rows {
            let key = match &g.key {
                GroupKey::Constant => Bson::Null,
                GroupKey::Expr(e) => self.eval(e, row, vars)?,
                GroupKey::Fields(fields) => {
                    let mut key = Document::new();
                    for (name, e) in fields {
                        key.insert(name.as_str(), self.eval(e, row, vars)?);
                    }
                    Bson::Document(key)
                }
            };
            let idx = match groups.iter().position(|(k, _)| values_equal(k, &key)) {
                Some(idx) => idx,
                None => {
                    let states = g
                        .accumulators
                        .iter()
                        .map(|(_, acc)| AccState::new(acc))
                        .collect();
                    groups.push((key, states));
                    groups.len() - 1
                }
            };
            for ((_, acc), state) in g.accumulators.iter().zip(groups[idx].1.iter_mut()) {
                self.accumulate(acc, state, row, vars)?;
            }
        }

        Ok(groups
            .into_iter()
            .map(|(key, states)| {
                let mut doc = Document::new();
                doc.insert("_id", key);
                for ((name, _), state) in g.accumulators.iter().zip(states) {
                    doc.insert(name.as_str(), state.finish());
                }
                doc
            })
            .collect())
    }

    fn accumulate(
        &self,
        acc: &Accumulator,
        state: &mut AccState,
        row: &Document,
        vars: &Vars,
    ) -> Result<(), ExecutorError> {
        match (acc, state) {
            (Accumulator::Sum(e), AccState::Sum(total)) => {
                if let Some(n) = Num::of(&self.eval(e, row, vars)?) {
                    *total = total.plus(n);
                }
            }
            (Accumulator::SumIf { when, value }, AccState::Sum(total)) => {
                if truthy(&self.eval(when, row, vars)?) {
                    if let Some(n) = Num::of(&self.eval(value, row, vars)?) {
                        *total = total.plus(n);
                    }
                }
            }
            (Accumulator::Count, AccState::Sum(total)) => *total = total.plus(Num::Int(1)),
            (Accumulator::Avg(e), AccState::Avg { sum, count }) => {
                if let Some(n) = Num::of(&self.eval(e, row, vars)?) {
                    *sum += n.as_f64();
                    *count += 1;
                }
            }
            (Accumulator::Min(e), AccState::Extreme(best)) => {
                let v = self.eval(e, row, vars)?;
                let better = best.as_ref().map_or(true, |b| total_cmp(&v, b).is_lt());
                if !matches!(v, Bson::Null) && better {
                    *best = Some(v);
                }
            }
            (Accumulator::Max(e), AccState::Extreme(best)) => {
                let v = self.eval(e, row, vars)?;
                let better = best.as_ref().map_or(true, |b| total_cmp(&v, b).is_gt());
                if !matches!(v, Bson::Null) && better {
                    *best = Some(v);
                }
            }
            (Accumulator::CollectSet(e), AccState::Set(items)) => {
                let v = self.eval(e, row, vars)?;
                if !items.iter().any(|i| values_equal(i, &v)) {
                    items.push(v);
                }
            }
            _ => {
                return Err(ExecutorError::Expression(
                    "accumulator state mismatch".to_string(),
                ))
            }
        }
        Ok(())
    }

    fn reshape(&self, r: &Reshape, row: &Document, vars: &Vars) -> Result<Document, ExecutorError> {
        let mut out = Document::new();
        for (name, e) in &r.fields {
            // a bare path that does not resolve leaves the field out
            if let Expr::Field(path) = e {
                if get_path(row, path).is_none() {
                    continue;
                }
            }
            out.insert(name.as_str(), self.eval(e, row, vars)?);
        }
        Ok(out)
    }

    fn branch(
        &self,
        b: &Branch,
        rows: Vec<Document>,
        vars: &Vars,
    ) -> Result<Vec<Document>, ExecutorError> {
        let mut combined = vec![Document::new()];
        for facet in &b.facets {
            let results = self.run_stages(&facet.stages, rows.clone(), vars)?;
            let mut next = Vec::with_capacity(combined.len() * results.len());
            for partial in &combined {
                for r in &results {
                    next.push(with_field(partial, &facet.name, Bson::Document(r.clone())));
                }
            }
            combined = next;
        }
        Ok(combined)
    }

    // ── Predicates ────────────────────────────────────────────

    fn regex(&self, pattern: &Pattern) -> Result<Regex, ExecutorError> {
        let key = (pattern.regex.clone(), pattern.case_insensitive);
        if let Some(re) = self.regexes.borrow().get(&key) {
            return Ok(re.clone());
        }
        let re = RegexBuilder::new(&pattern.regex)
            .case_insensitive(pattern.case_insensitive)
            .build()
            .map_err(|source| ExecutorError::Regex {
                pattern: pattern.regex.clone(),
                source,
            })?;
        self.regexes.borrow_mut().insert(key, re.clone());
        Ok(re)
    }

    fn is_match(&self, value: Option<&Bson>, pattern: &Pattern) -> Result<bool, ExecutorError> {
        match value {
            Some(Bson::String(s)) => Ok(self.regex(pattern)?.is_match(s)),
            _ => Ok(false),
        }
    }

    fn matches(&self, p: &Predicate, row: &Document, vars: &Vars) -> Result<bool, ExecutorError> {
        match p {
            Predicate::Compare { field, cmp, value } => {
                let actual = get_path(row, field);
                Ok(match cmp {
                    Cmp::Eq => field_equals(actual, value),
                    Cmp::Ne => !field_equals(actual, value),
                    ordered => actual
                        .and_then(|a| bracket_cmp(a, value))
                        .is_some_and(|ord| ordered.holds(ord)),
                })
            }
            Predicate::In { field, values } => {
                let actual = get_path(row, field);
                Ok(values.iter().any(|v| field_equals(actual, v)))
            }
            Predicate::Matches { field, pattern } => self.is_match(get_path(row, field), pattern),
            Predicate::NotMatches { field, pattern } => {
                Ok(!self.is_match(get_path(row, field), pattern)?)
            }
            Predicate::All(preds) => {
                for p in preds {
                    if !self.matches(p, row, vars)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(preds) => {
                for p in preds {
                    if self.matches(p, row, vars)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Expr(e) => Ok(truthy(&self.eval(e, row, vars)?)),
        }
    }

    // ── Expressions ───────────────────────────────────────────

    fn eval(&self, e: &Expr, row: &Document, vars: &Vars) -> Result<Bson, ExecutorError> {
        Ok(match e {
            Expr::Field(path) => get_path(row, path).cloned().unwrap_or(Bson::Null),
            Expr::Var(name) => vars
                .get(name)
                .cloned()
                .ok_or_else(|| ExecutorError::UnknownVariable(name.clone()))?,
            Expr::Literal(v) => v.clone(),
            Expr::Add(items) => self.fold_numbers("$add", items, row, vars, Num::plus)?,
            Expr::Multiply(items) => self.fold_numbers("$multiply", items, row, vars, Num::times)?,
            Expr::Subtract(a, b) => {
                let (a, b) = (self.eval(a, row, vars)?, self.eval(b, row, vars)?);
                match (&a, &b) {
                    (Bson::Null, _) | (_, Bson::Null) => Bson::Null,
                    (Bson::DateTime(x), Bson::DateTime(y)) => {
                        Bson::Int64(x.timestamp_millis() - y.timestamp_millis())
                    }
                    _ => match (Num::of(&a), Num::of(&b)) {
                        (Some(x), Some(y)) => x.minus(y).into_bson(),
                        _ => return Err(non_numeric("$subtract", &a, &b)),
                    },
                }
            }
            Expr::Divide(a, b) => {
                let (a, b) = (self.eval(a, row, vars)?, self.eval(b, row, vars)?);
                match (&a, &b) {
                    (Bson::Null, _) | (_, Bson::Null) => Bson::Null,
                    _ => match (Num::of(&a), Num::of(&b)) {
                        (Some(_), Some(y)) if y.as_f64() == 0.0 => {
                            return Err(ExecutorError::Expression("can't $divide by zero".into()))
                        }
                        (Some(x), Some(y)) => Bson::Double(x.as_f64() / y.as_f64()),
                        _ => return Err(non_numeric("$divide", &a, &b)),
                    },
                }
            }
            Expr::Compare(cmp, a, b) => {
                let (a, b) = (self.eval(a, row, vars)?, self.eval(b, row, vars)?);
                Bson::Boolean(cmp.holds(total_cmp(&a, &b)))
            }
            Expr::And(items) => {
                for item in items {
                    if !truthy(&self.eval(item, row, vars)?) {
                        return Ok(Bson::Boolean(false));
                    }
                }
                Bson::Boolean(true)
            }
            Expr::Or(items) => {
                for item in items {
                    if truthy(&self.eval(item, row, vars)?) {
                        return Ok(Bson::Boolean(true));
                    }
                }
                Bson::Boolean(false)
            }
            Expr::Not(inner) => Bson::Boolean(!truthy(&self.eval(inner, row, vars)?)),
            Expr::Cond {
                when,
                then,
                otherwise,
            } => {
                if truthy(&self.eval(when, row, vars)?) {
                    self.eval(then, row, vars)?
                } else {
                    self.eval(otherwise, row, vars)?
                }
            }
            Expr::Year(inner) => match self.eval(inner, row, vars)? {
                Bson::Null => Bson::Null,
                Bson::DateTime(dt) => Bson::Int32(dt.to_chrono().year()),
                other => {
                    return Err(ExecutorError::Expression(format!(
                        "$year expects a date, got {}",
                        other
                    )))
                }
            },
            Expr::Substr { input, start, len } => match self.eval(input, row, vars)? {
                Bson::Null => Bson::String(String::new()),
                Bson::String(s) => Bson::String(
                    s.chars()
                        .skip(*start as usize)
                        .take(*len as usize)
                        .collect(),
                ),
                other => {
                    return Err(ExecutorError::Expression(format!(
                        "$substrCP expects a string, got {}",
                        other
                    )))
                }
            },
            Expr::Size(inner) => match self.eval(inner, row, vars)? {
                Bson::Array(items) => Num::Int(items.len() as i64).into_bson(),
                other => {
                    return Err(ExecutorError::Expression(format!(
                        "$size expects an array, got {}",
                        other
                    )))
                }
            },
            Expr::RegexMatch { input, pattern } => match self.eval(input, row, vars)? {
                Bson::Null => Bson::Boolean(false),
                Bson::String(s) => Bson::Boolean(self.regex(pattern)?.is_match(&s)),
                other => {
                    return Err(ExecutorError::Expression(format!(
                        "$regexMatch expects a string, got {}",
                        other
                    )))
                }
            },
        })
    }

    fn fold_numbers(
        &self,
        op: &str,
        items: &[Expr],
        row: &Document,
        vars: &Vars,
        combine: fn(Num, Num) -> Num,
    ) -> Result<Bson, ExecutorError> {
        let mut acc: Option<Num> = None;
        for item in items {
            let v = self.eval(item, row, vars)?;
            if matches!(v, Bson::Null) {
                return Ok(Bson::Null);
            }
            let n = Num::of(&v).ok_or_else(|| {
                ExecutorError::Expression(format!("{} only supports numeric types, got {}", op, v))
            })?;
            acc = Some(match acc {
                Some(a) => combine(a, n),
                None => n,
            });
        }
        Ok(acc.map(Num::into_bson).unwrap_or(Bson::Int32(0)))
    }
}

fn non_numeric(op: &str, a: &Bson, b: &Bson) -> ExecutorError {
    ExecutorError::Expression(format!("{} only supports numeric types, got {} and {}", op, a, b))
}

/// Query-language equality: `null` also matches an absent field.
fn field_equals(actual: Option<&Bson>, expected: &Bson) -> bool {
    match (actual, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        (Some(a), b) => bracket_cmp(a, b) == Some(std::cmp::Ordering::Equal),
    }
}

fn sort_rows(mut rows: Vec<Document>, keys: &[SortKey]) -> Vec<Document> {
    rows.sort_by(|a, b| {
        for key in keys {
            let l = get_path(a, &key.field).unwrap_or(&Bson::Null);
            let r = get_path(b, &key.field).unwrap_or(&Bson::Null);
            let ord = match key.direction {
                Direction::Asc => total_cmp(l, r),
                Direction::Desc => total_cmp(r, l),
            };
            if ord.is_ne() {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
    rows
}

enum AccState {
    Sum(Num),
    Avg { sum: f64, count: u64 },
    Extreme(Option<Bson>),
    Set(Vec<Bson>),
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Sum(_) | Accumulator::SumIf { .. } | Accumulator::Count => {
                AccState::Sum(Num::Int(0))
            }
            Accumulator::Avg(_) => AccState::Avg { sum: 0.0, count: 0 },
            Accumulator::Min(_) | Accumulator::Max(_) => AccState::Extreme(None),
            Accumulator::CollectSet(_) => AccState::Set(Vec::new()),
        }
    }

    fn finish(self) -> Bson {
        match self {
            AccState::Sum(n) => n.into_bson(),
            AccState::Avg { count: 0, .. } => Bson::Null,
            AccState::Avg { sum, count } => Bson::Double(sum / count as f64),
            AccState::Extreme(v) => v.unwrap_or(Bson::Null),
            AccState::Set(items) => Bson::Array(items),
        }
    }
}
