use std::ops;

use bson::Bson;
use chrono::NaiveDate;
use docbench_core::Collection;
use serde::Serialize;

use crate::catalog::CatalogError;

/// A compiled query: an entry collection plus an ordered list of stages.
///
/// The entry collection is the one the first stage reads from; the harness
/// submits the pipeline against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    pub entry: Collection,
    pub stages: Vec<Stage>,
}

/// One document-transformation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Filter(Predicate),
    Join(Join),
    Correlated(CorrelatedJoin),
    Group(Group),
    Reshape(Reshape),
    Sort(Vec<SortKey>),
    Limit(u64),
    Branch(Branch),
}

/// Stage families, used for explain output and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Filter,
    SingleHopJoin,
    CorrelatedSubquery,
    GroupAggregate,
    ConditionalAggregate,
    Reshape,
    Sort,
    Limit,
    Branch,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StageKind::Filter => "filter",
            StageKind::SingleHopJoin => "single-hop-join",
            StageKind::CorrelatedSubquery => "correlated-subquery",
            StageKind::GroupAggregate => "group-aggregate",
            StageKind::ConditionalAggregate => "conditional-aggregate",
            StageKind::Reshape => "reshape",
            StageKind::Sort => "sort",
            StageKind::Limit => "limit",
            StageKind::Branch => "branch",
        };
        write!(f, "{}", s)
    }
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Filter(_) => StageKind::Filter,
            Stage::Join(_) => StageKind::SingleHopJoin,
            Stage::Correlated(_) => StageKind::CorrelatedSubquery,
            Stage::Group(g) if g.is_conditional() => StageKind::ConditionalAggregate,
            Stage::Group(_) => StageKind::GroupAggregate,
            Stage::Reshape(_) => StageKind::Reshape,
            Stage::Sort(_) => StageKind::Sort,
            Stage::Limit(_) => StageKind::Limit,
            Stage::Branch(_) => StageKind::Branch,
        }
    }

    /// Field paths this stage reads from its input rows.
    fn input_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            Stage::Filter(p) => p.collect_fields(&mut out),
            Stage::Join(j) => out.push(j.local.as_str()),
            Stage::Correlated(c) => {
                if let Some(key) = &c.on {
                    out.push(key.local.as_str());
                }
                for (_, expr) in &c.bindings {
                    expr.collect_fields(&mut out);
                }
            }
            Stage::Group(g) => {
                match &g.key {
                    GroupKey::Constant => {}
                    GroupKey::Expr(e) => e.collect_fields(&mut out),
                    GroupKey::Fields(fields) => {
                        for (_, e) in fields {
                            e.collect_fields(&mut out);
                        }
                    }
                }
                for (_, acc) in &g.accumulators {
                    acc.collect_fields(&mut out);
                }
            }
            Stage::Reshape(r) => {
                for (_, e) in &r.fields {
                    e.collect_fields(&mut out);
                }
            }
            Stage::Sort(keys) => out.extend(keys.iter().map(|k| k.field.as_str())),
            Stage::Limit(_) | Stage::Branch(_) => {}
        }
        out
    }
}

impl Pipeline {
    /// Start a pipeline reading from `entry`.
    pub fn scan(entry: Collection) -> Self {
        Self {
            entry,
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn filter(self, predicate: Predicate) -> Self {
        self.stage(Stage::Filter(predicate))
    }

    /// Equality lookup of `from.foreign == row.local`, one output row per match.
    pub fn join(
        self,
        from: Collection,
        local: impl Into<String>,
        foreign: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        self.stage(Stage::Join(Join {
            from,
            local: local.into(),
            foreign: foreign.into(),
            alias: alias.into(),
        }))
    }

    pub fn correlated(self, join: CorrelatedJoin) -> Self {
        self.stage(Stage::Correlated(join))
    }

    pub fn group(self, group: Group) -> Self {
        self.stage(Stage::Group(group))
    }

    pub fn reshape(self, reshape: Reshape) -> Self {
        self.stage(Stage::Reshape(reshape))
    }

    pub fn sort(self, keys: impl IntoIterator<Item = SortKey>) -> Self {
        self.stage(Stage::Sort(keys.into_iter().collect()))
    }

    pub fn limit(self, n: u64) -> Self {
        self.stage(Stage::Limit(n))
    }

    pub fn branch(self, branch: Branch) -> Self {
        self.stage(Stage::Branch(branch))
    }

    /// Check that the plan reads its source rows from the collection it
    /// claims as entry, and that every lookup keys into its target's columns.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if let Some(first) = self.stages.first() {
            for field in first.input_fields() {
                if !self.entry.owns_field(field) {
                    return Err(CatalogError::EntryMismatch {
                        collection: self.entry,
                        field: field.to_string(),
                    });
                }
            }
        }
        validate_lookups(&self.stages)
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }
}

fn validate_lookups(stages: &[Stage]) -> Result<(), CatalogError> {
    for stage in stages {
        match stage {
            Stage::Join(j) if !j.from.owns_field(&j.foreign) => {
                return Err(CatalogError::EntryMismatch {
                    collection: j.from,
                    field: j.foreign.clone(),
                });
            }
            Stage::Correlated(c) => {
                if let Some(key) = &c.on {
                    if !c.sub.entry.owns_field(&key.foreign) {
                        return Err(CatalogError::EntryMismatch {
                            collection: c.sub.entry,
                            field: key.foreign.clone(),
                        });
                    }
                }
                c.sub.validate()?;
            }
            Stage::Branch(b) => {
                for facet in &b.facets {
                    validate_lookups(&facet.stages)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

// ── Joins ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    pub from: Collection,
    pub local: String,
    pub foreign: String,
    pub alias: String,
}

/// How the result of a correlated sub-pipeline is attached to its parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bind {
    /// One output row per sub-result, nested under the alias.
    Flatten,
    /// Parent survives iff the sub-result is non-empty.
    Exists,
    /// Parent survives iff the sub-result is empty.
    NotExists,
    /// Alias set to the number of sub-results.
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinKey {
    pub local: String,
    pub foreign: String,
}

/// Sub-pipeline evaluated once per parent row, with parent values bound as
/// variables (`$$name`) and optionally pre-filtered on an equality key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedJoin {
    pub sub: Pipeline,
    pub on: Option<JoinKey>,
    pub bindings: Vec<(String, Expr)>,
    pub alias: String,
    pub bind: Bind,
}

impl CorrelatedJoin {
    pub fn new(sub: Pipeline, alias: impl Into<String>, bind: Bind) -> Self {
        Self {
            sub,
            on: None,
            bindings: Vec::new(),
            alias: alias.into(),
            bind,
        }
    }

    pub fn on(mut self, local: impl Into<String>, foreign: impl Into<String>) -> Self {
        self.on = Some(JoinKey {
            local: local.into(),
            foreign: foreign.into(),
        });
        self
    }

    pub fn let_var(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.bindings.push((name.into(), value));
        self
    }
}

// ── Predicates ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Cmp {
    pub fn operator(self) -> &'static str {
        match self {
            Cmp::Eq => "$eq",
            Cmp::Ne => "$ne",
            Cmp::Lt => "$lt",
            Cmp::Lte => "$lte",
            Cmp::Gt => "$gt",
            Cmp::Gte => "$gte",
        }
    }

    pub fn holds(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Cmp::Eq => ord == Equal,
            Cmp::Ne => ord != Equal,
            Cmp::Lt => ord == Less,
            Cmp::Lte => ord != Greater,
            Cmp::Gt => ord == Greater,
            Cmp::Gte => ord != Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pattern {
    pub regex: String,
    pub case_insensitive: bool,
}

impl Pattern {
    pub fn new(regex: impl Into<String>) -> Self {
        Self {
            regex: regex.into(),
            case_insensitive: false,
        }
    }

    pub fn ignore_case(regex: impl Into<String>) -> Self {
        Self {
            regex: regex.into(),
            case_insensitive: true,
        }
    }

    pub fn options(&self) -> &'static str {
        if self.case_insensitive { "i" } else { "" }
    }
}

/// Row filter in query-language form; `Expr` escapes to a row expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Compare { field: String, cmp: Cmp, value: Bson },
    In { field: String, values: Vec<Bson> },
    Matches { field: String, pattern: Pattern },
    NotMatches { field: String, pattern: Pattern },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Expr(Expr),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, cmp: Cmp, value: impl Into<Bson>) -> Self {
        Predicate::Compare {
            field: field.into(),
            cmp,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::compare(field, Cmp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::compare(field, Cmp::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::compare(field, Cmp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::compare(field, Cmp::Lte, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::compare(field, Cmp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::compare(field, Cmp::Gte, value)
    }

    /// Half-open range `low <= field < high`.
    pub fn range(field: &str, low: impl Into<Bson>, high: impl Into<Bson>) -> Self {
        Predicate::All(vec![Self::gte(field, low), Self::lt(field, high)])
    }

    /// Closed range `low <= field <= high`.
    pub fn between(field: &str, low: impl Into<Bson>, high: impl Into<Bson>) -> Self {
        Predicate::All(vec![Self::gte(field, low), Self::lte(field, high)])
    }

    pub fn is_in<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(field: impl Into<String>, pattern: Pattern) -> Self {
        Predicate::Matches {
            field: field.into(),
            pattern,
        }
    }

    pub fn not_matches(field: impl Into<String>, pattern: Pattern) -> Self {
        Predicate::NotMatches {
            field: field.into(),
            pattern,
        }
    }

    pub fn all(preds: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::All(preds.into_iter().collect())
    }

    pub fn any(preds: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Any(preds.into_iter().collect())
    }

    pub fn expr(expr: Expr) -> Self {
        Predicate::Expr(expr)
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Compare { field, .. }
            | Predicate::In { field, .. }
            | Predicate::Matches { field, .. }
            | Predicate::NotMatches { field, .. } => out.push(field.as_str()),
            Predicate::All(ps) | Predicate::Any(ps) => {
                for p in ps {
                    p.collect_fields(out);
                }
            }
            Predicate::Expr(e) => e.collect_fields(out),
        }
    }
}

// ── Expressions ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Field(String),
    Var(String),
    Literal(Bson),
    Add(Vec<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Vec<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Compare(Cmp, Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Cond {
        when: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Year(Box<Expr>),
    /// Substring by code points.
    Substr {
        input: Box<Expr>,
        start: u32,
        len: u32,
    },
    Size(Box<Expr>),
    RegexMatch {
        input: Box<Expr>,
        pattern: Pattern,
    },
}

pub fn field(path: impl Into<String>) -> Expr {
    Expr::Field(path.into())
}

pub fn var(name: impl Into<String>) -> Expr {
    Expr::Var(name.into())
}

pub fn lit(value: impl Into<Bson>) -> Expr {
    Expr::Literal(value.into())
}

/// Midnight UTC on the given calendar day. Days that do not exist yield null.
pub fn date(year: i32, month: u32, day: u32) -> Bson {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Bson::DateTime(bson::DateTime::from_chrono(dt.and_utc())))
        .unwrap_or(Bson::Null)
}

impl Expr {
    fn compare(self, cmp: Cmp, other: Expr) -> Expr {
        Expr::Compare(cmp, Box::new(self), Box::new(other))
    }

    pub fn equals(self, other: Expr) -> Expr {
        self.compare(Cmp::Eq, other)
    }

    pub fn not_equals(self, other: Expr) -> Expr {
        self.compare(Cmp::Ne, other)
    }

    pub fn less_than(self, other: Expr) -> Expr {
        self.compare(Cmp::Lt, other)
    }

    pub fn at_least(self, other: Expr) -> Expr {
        self.compare(Cmp::Gte, other)
    }

    pub fn greater_than(self, other: Expr) -> Expr {
        self.compare(Cmp::Gt, other)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    pub fn cond(when: Expr, then: Expr, otherwise: Expr) -> Expr {
        Expr::Cond {
            when: Box::new(when),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn year(self) -> Expr {
        Expr::Year(Box::new(self))
    }

    pub fn substr(self, start: u32, len: u32) -> Expr {
        Expr::Substr {
            input: Box::new(self),
            start,
            len,
        }
    }

    pub fn size(self) -> Expr {
        Expr::Size(Box::new(self))
    }

    pub fn regex_match(self, pattern: Pattern) -> Expr {
        Expr::RegexMatch {
            input: Box::new(self),
            pattern,
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Field(path) => out.push(path.as_str()),
            Expr::Var(_) | Expr::Literal(_) => {}
            Expr::Add(es) | Expr::Multiply(es) | Expr::And(es) | Expr::Or(es) => {
                for e in es {
                    e.collect_fields(out);
                }
            }
            Expr::Subtract(a, b) | Expr::Divide(a, b) | Expr::Compare(_, a, b) => {
                a.collect_fields(out);
                b.collect_fields(out);
            }
            Expr::Not(e) | Expr::Year(e) | Expr::Size(e) => e.collect_fields(out),
            Expr::Substr { input, .. } | Expr::RegexMatch { input, .. } => {
                input.collect_fields(out)
            }
            Expr::Cond {
                when,
                then,
                otherwise,
            } => {
                when.collect_fields(out);
                then.collect_fields(out);
                otherwise.collect_fields(out);
            }
        }
    }
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        match self {
            Expr::Add(mut terms) => {
                terms.push(rhs);
                Expr::Add(terms)
            }
            lhs => Expr::Add(vec![lhs, rhs]),
        }
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::Subtract(Box::new(self), Box::new(rhs))
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        match self {
            Expr::Multiply(mut factors) => {
                factors.push(rhs);
                Expr::Multiply(factors)
            }
            lhs => Expr::Multiply(vec![lhs, rhs]),
        }
    }
}

impl ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::Divide(Box::new(self), Box::new(rhs))
    }
}

// ── Grouping ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// A single group over the whole input.
    Constant,
    Expr(Expr),
    /// Composite key; the output `_id` is a document of these names.
    Fields(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulator {
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    Count,
    /// Distinct values; the distinct count is the size of the set.
    CollectSet(Expr),
    /// Sum of `value` over rows where `when` holds.
    SumIf { when: Expr, value: Expr },
}

impl Accumulator {
    pub fn is_conditional(&self) -> bool {
        matches!(self, Accumulator::SumIf { .. })
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Accumulator::Sum(e)
            | Accumulator::Avg(e)
            | Accumulator::Min(e)
            | Accumulator::Max(e)
            | Accumulator::CollectSet(e) => e.collect_fields(out),
            Accumulator::Count => {}
            Accumulator::SumIf { when, value } => {
                when.collect_fields(out);
                value.collect_fields(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: GroupKey,
    pub accumulators: Vec<(String, Accumulator)>,
}

impl Group {
    /// One group over every input row.
    pub fn all() -> Self {
        Self {
            key: GroupKey::Constant,
            accumulators: Vec::new(),
        }
    }

    pub fn by(key: Expr) -> Self {
        Self {
            key: GroupKey::Expr(key),
            accumulators: Vec::new(),
        }
    }

    pub fn by_fields<'a>(fields: impl IntoIterator<Item = (&'a str, Expr)>) -> Self {
        Self {
            key: GroupKey::Fields(
                fields
                    .into_iter()
                    .map(|(name, e)| (name.to_string(), e))
                    .collect(),
            ),
            accumulators: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, acc: Accumulator) -> Self {
        self.accumulators.push((name.into(), acc));
        self
    }

    pub fn is_conditional(&self) -> bool {
        self.accumulators.iter().any(|(_, a)| a.is_conditional())
    }
}

// ── Reshape / sort / branch ───────────────────────────────────

/// Builds a fresh row from named expressions. `_id` is dropped unless named.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Reshape {
    pub fields: Vec<(String, Expr)>,
}

impl Reshape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Carry an input field through under the same name.
    pub fn keep(self, name: &str) -> Self {
        self.field(name, field(name))
    }

    /// Lift a component of a composite group key back to the top level.
    pub fn key(self, name: &str) -> Self {
        self.field(name, field(format!("_id.{}", name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

pub fn asc(field: impl Into<String>) -> SortKey {
    SortKey {
        field: field.into(),
        direction: Direction::Asc,
    }
}

pub fn desc(field: impl Into<String>) -> SortKey {
    SortKey {
        field: field.into(),
        direction: Direction::Desc,
    }
}

/// Named sub-pipeline of a branch stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    pub name: String,
    pub stages: Vec<Stage>,
}

/// Fans the input out to every facet and emits the cross product of their
/// outputs, each facet's row nested under its name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Branch {
    pub facets: Vec<Facet>,
}

impl Branch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn facet(mut self, name: impl Into<String>, stages: Vec<Stage>) -> Self {
        self.facets.push(Facet {
            name: name.into(),
            stages,
        });
        self
    }
}
