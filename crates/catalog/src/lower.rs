//! Lowering of the stage IR to the document store's aggregation pipeline.

use bson::{doc, Bson, Document};

use crate::plan::*;

/// Translate a plan into aggregation stages, in order.
pub fn lower(pipeline: &Pipeline) -> Vec<Document> {
    lower_stages(&pipeline.stages)
}

/// Render the lowered pipeline as relaxed extended JSON.
pub fn explain(pipeline: &Pipeline) -> serde_json::Value {
    serde_json::Value::Array(
        lower(pipeline)
            .into_iter()
            .map(|d| Bson::Document(d).into_relaxed_extjson())
            .collect(),
    )
}

fn lower_stages(stages: &[Stage]) -> Vec<Document> {
    let mut out = Vec::with_capacity(stages.len());
    for stage in stages {
        lower_stage(stage, &mut out);
    }
    out
}

fn reference(path: &str) -> String {
    format!("${}", path)
}

fn single(key: &str, value: impl Into<Bson>) -> Document {
    let mut d = Document::new();
    d.insert(key, value.into());
    d
}

fn lower_stage(stage: &Stage, out: &mut Vec<Document>) {
    match stage {
        Stage::Filter(p) => out.push(doc! { "$match": predicate(p) }),
        Stage::Join(j) => {
            out.push(doc! {
                "$lookup": {
                    "from": j.from.name(),
                    "localField": j.local.as_str(),
                    "foreignField": j.foreign.as_str(),
                    "as": j.alias.as_str(),
                }
            });
            out.push(doc! { "$unwind": reference(&j.alias) });
        }
        Stage::Correlated(c) => lower_correlated(c, out),
        Stage::Group(g) => out.push(doc! { "$group": group(g) }),
        Stage::Reshape(r) => out.push(doc! { "$project": project(r) }),
        Stage::Sort(keys) => {
            let mut body = Document::new();
            for key in keys {
                let dir = match key.direction {
                    Direction::Asc => 1,
                    Direction::Desc => -1,
                };
                body.insert(key.field.as_str(), dir);
            }
            out.push(doc! { "$sort": body });
        }
        Stage::Limit(n) => out.push(doc! { "$limit": *n as i64 }),
        Stage::Branch(b) => {
            let mut facets = Document::new();
            for facet in &b.facets {
                let mut stages = lower_stages(&facet.stages);
                if stages.is_empty() {
                    // $facet rejects empty sub-pipelines
                    stages.push(doc! { "$match": {} });
                }
                facets.insert(
                    facet.name.as_str(),
                    stages.into_iter().map(Bson::Document).collect::<Vec<_>>(),
                );
            }
            out.push(doc! { "$facet": facets });
            for facet in &b.facets {
                out.push(doc! { "$unwind": reference(&facet.name) });
            }
        }
    }
}

fn lower_correlated(c: &CorrelatedJoin, out: &mut Vec<Document>) {
    let mut lookup = doc! { "from": c.sub.entry.name() };
    if let Some(key) = &c.on {
        lookup.insert("localField", key.local.as_str());
        lookup.insert("foreignField", key.foreign.as_str());
    }
    if !c.bindings.is_empty() {
        let mut vars = Document::new();
        for (name, value) in &c.bindings {
            vars.insert(name.as_str(), expr(value));
        }
        lookup.insert("let", vars);
    }
    // an uncorrelated lookup without key still needs an explicit pipeline
    if !c.sub.stages.is_empty() || c.on.is_none() {
        let stages: Vec<Bson> = lower(&c.sub).into_iter().map(Bson::Document).collect();
        lookup.insert("pipeline", stages);
    }
    lookup.insert("as", c.alias.as_str());
    out.push(doc! { "$lookup": lookup });

    let alias = c.alias.as_str();
    match c.bind {
        Bind::Flatten => out.push(doc! { "$unwind": reference(alias) }),
        Bind::Exists => {
            out.push(doc! { "$match": single(alias, doc! { "$ne": Bson::Array(Vec::new()) }) });
            out.push(doc! { "$unset": alias });
        }
        Bind::NotExists => {
            out.push(doc! { "$match": single(alias, doc! { "$eq": Bson::Array(Vec::new()) }) });
            out.push(doc! { "$unset": alias });
        }
        Bind::Count => {
            out.push(doc! { "$addFields": single(alias, doc! { "$size": reference(alias) }) });
        }
    }
}

fn group(g: &Group) -> Document {
    let id = match &g.key {
        GroupKey::Constant => Bson::Null,
        GroupKey::Expr(e) => expr(e),
        GroupKey::Fields(fields) => {
            let mut key = Document::new();
            for (name, e) in fields {
                key.insert(name.as_str(), expr(e));
            }
            Bson::Document(key)
        }
    };
    let mut body = doc! { "_id": id };
    for (name, acc) in &g.accumulators {
        body.insert(name.as_str(), accumulator(acc));
    }
    body
}

fn accumulator(acc: &Accumulator) -> Document {
    match acc {
        Accumulator::Sum(e) => doc! { "$sum": expr(e) },
        Accumulator::Avg(e) => doc! { "$avg": expr(e) },
        Accumulator::Min(e) => doc! { "$min": expr(e) },
        Accumulator::Max(e) => doc! { "$max": expr(e) },
        Accumulator::Count => doc! { "$sum": 1 },
        Accumulator::CollectSet(e) => doc! { "$addToSet": expr(e) },
        Accumulator::SumIf { when, value } => doc! {
            "$sum": { "$cond": [expr(when), expr(value), 0] }
        },
    }
}

fn project(r: &Reshape) -> Document {
    let mut body = Document::new();
    if !r.fields.iter().any(|(name, _)| name == "_id") {
        body.insert("_id", 0);
    }
    for (name, value) in &r.fields {
        match value {
            Expr::Field(path) if path == name => body.insert(name.as_str(), 1),
            other => body.insert(name.as_str(), expr(other)),
        };
    }
    body
}

// ── Predicates ────────────────────────────────────────────────

fn regex_operator(pattern: &Pattern) -> Document {
    let mut body = doc! { "$regex": pattern.regex.as_str() };
    if pattern.case_insensitive {
        body.insert("$options", pattern.options());
    }
    body
}

fn predicate(p: &Predicate) -> Document {
    match p {
        Predicate::Compare {
            field,
            cmp: Cmp::Eq,
            value,
        } => single(field, value.clone()),
        Predicate::Compare { field, cmp, value } => {
            single(field, single(cmp.operator(), value.clone()))
        }
        Predicate::In { field, values } => single(field, doc! { "$in": values.clone() }),
        Predicate::Matches { field, pattern } => single(field, regex_operator(pattern)),
        Predicate::NotMatches { field, pattern } => {
            single(field, doc! { "$not": regex_operator(pattern) })
        }
        Predicate::All(preds) => conjunction(preds),
        Predicate::Any(preds) => doc! {
            "$or": preds.iter().map(|p| Bson::Document(predicate(p))).collect::<Vec<_>>()
        },
        Predicate::Expr(e) => doc! { "$expr": expr(e) },
    }
}

fn flatten_all<'a>(preds: &'a [Predicate], out: &mut Vec<&'a Predicate>) {
    for p in preds {
        match p {
            Predicate::All(inner) => flatten_all(inner, out),
            other => out.push(other),
        }
    }
}

fn is_operator_doc(v: &Bson) -> Option<&Document> {
    match v {
        Bson::Document(d) if d.keys().all(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

/// Merge conjuncts into one filter document where field keys do not collide
/// (`{f: {$gte: a}}` + `{f: {$lt: b}}` becomes `{f: {$gte: a, $lt: b}}`),
/// falling back to `$and`. Repeated top-level operators always fall back.
fn conjunction(preds: &[Predicate]) -> Document {
    let mut flat = Vec::new();
    flatten_all(preds, &mut flat);
    let parts: Vec<Document> = flat.into_iter().map(predicate).collect();

    let mut merged = Document::new();
    for part in &parts {
        for (key, value) in part {
            let combined = match merged.get(key) {
                None => Some(value.clone()),
                // `$expr` and `$or` bodies are single expressions, never operator sets
                Some(_) if key.starts_with('$') => None,
                Some(existing) => match (is_operator_doc(existing), is_operator_doc(value)) {
                    (Some(a), Some(b)) if b.keys().all(|k| !a.contains_key(k)) => {
                        let mut both = a.clone();
                        for (k, v) in b {
                            both.insert(k.as_str(), v.clone());
                        }
                        Some(Bson::Document(both))
                    }
                    _ => None,
                },
            };
            match combined {
                Some(v) => {
                    merged.insert(key.as_str(), v);
                }
                None => {
                    return doc! {
                        "$and": parts.iter().cloned().map(Bson::Document).collect::<Vec<_>>()
                    };
                }
            }
        }
    }
    merged
}

// ── Expressions ───────────────────────────────────────────────

fn exprs(items: &[Expr]) -> Vec<Bson> {
    items.iter().map(expr).collect()
}

fn expr(e: &Expr) -> Bson {
    match e {
        Expr::Field(path) => Bson::String(reference(path)),
        Expr::Var(name) => Bson::String(format!("$${}", name)),
        Expr::Literal(v) => Bson::Document(doc! { "$literal": v.clone() }),
        Expr::Add(items) => Bson::Document(doc! { "$add": exprs(items) }),
        Expr::Subtract(a, b) => Bson::Document(doc! { "$subtract": [expr(a), expr(b)] }),
        Expr::Multiply(items) => Bson::Document(doc! { "$multiply": exprs(items) }),
        Expr::Divide(a, b) => Bson::Document(doc! { "$divide": [expr(a), expr(b)] }),
        Expr::Compare(cmp, a, b) => {
            Bson::Document(single(cmp.operator(), vec![expr(a), expr(b)]))
        }
        Expr::And(items) => Bson::Document(doc! { "$and": exprs(items) }),
        Expr::Or(items) => Bson::Document(doc! { "$or": exprs(items) }),
        Expr::Not(inner) => Bson::Document(doc! { "$not": [expr(inner)] }),
        Expr::Cond {
            when,
            then,
            otherwise,
        } => Bson::Document(doc! { "$cond": [expr(when), expr(then), expr(otherwise)] }),
        Expr::Year(inner) => Bson::Document(doc! { "$year": expr(inner) }),
        Expr::Substr { input, start, len } => Bson::Document(doc! {
            "$substrCP": [expr(input), i64::from(*start), i64::from(*len)]
        }),
        Expr::Size(inner) => Bson::Document(doc! { "$size": expr(inner) }),
        Expr::RegexMatch { input, pattern } => {
            let mut body = doc! { "input": expr(input), "regex": pattern.regex.as_str() };
            if pattern.case_insensitive {
                body.insert("options", pattern.options());
            }
            Bson::Document(doc! { "$regexMatch": body })
        }
    }
}
