//! BSON value helpers shared by the reference executor: path lookup,
//! comparison orders, truthiness and numeric arithmetic.

use std::cmp::Ordering;

use bson::{Bson, Document};

/// Resolve a dotted path through nested documents.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        match current {
            Bson::Document(inner) => current = inner.get(part)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Numeric view of a BSON value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn of(value: &Bson) -> Option<Num> {
        match value {
            Bson::Int32(v) => Some(Num::Int(i64::from(*v))),
            Bson::Int64(v) => Some(Num::Int(*v)),
            Bson::Double(v) => Some(Num::Float(*v)),
            // widened to binary floating point; exact decimal digits are not kept
            Bson::Decimal128(v) => v.to_string().parse().ok().map(Num::Float),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
        }
    }

    pub fn plus(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a
                .checked_add(b)
                .map(Num::Int)
                .unwrap_or(Num::Float(a as f64 + b as f64)),
            (a, b) => Num::Float(a.as_f64() + b.as_f64()),
        }
    }

    pub fn minus(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a
                .checked_sub(b)
                .map(Num::Int)
                .unwrap_or(Num::Float(a as f64 - b as f64)),
            (a, b) => Num::Float(a.as_f64() - b.as_f64()),
        }
    }

    pub fn times(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a
                .checked_mul(b)
                .map(Num::Int)
                .unwrap_or(Num::Float(a as f64 * b as f64)),
            (a, b) => Num::Float(a.as_f64() * b.as_f64()),
        }
    }

    /// Integers narrow to 32 bits when they fit.
    pub fn into_bson(self) -> Bson {
        match self {
            Num::Int(v) => i32::try_from(v).map(Bson::Int32).unwrap_or(Bson::Int64(v)),
            Num::Float(v) => Bson::Double(v),
        }
    }
}

/// Comparison used by query-language filters: only values of the same type
/// bracket compare; anything else does not match.
pub fn bracket_cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (Num::of(a), Num::of(b)) {
        return x.as_f64().partial_cmp(&y.as_f64());
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::Symbol(_) | Bson::String(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        _ => 12,
    }
}

/// Total order across BSON types, as used by sorts and expression
/// comparisons. Null sorts lowest; numbers compare by value across types.
pub fn total_cmp(a: &Bson, b: &Bson) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Bson::Array(x), Bson::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = total_cmp(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::Document(x), Bson::Document(y)) => {
            for ((kl, vl), (kr, vr)) in x.iter().zip(y.iter()) {
                let ord = total_cmp(vl, vr).then_with(|| kl.cmp(kr));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::Symbol(x), Bson::String(y)) | (Bson::String(x), Bson::Symbol(y)) => x.cmp(y),
        _ => bracket_cmp(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Equality used for join keys and group keys (`1 == 1.0`).
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    total_cmp(a, b) == Ordering::Equal
}

/// Expression truthiness: false, null, zero and absent are false.
pub fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        other => match Num::of(other) {
            Some(n) => n.as_f64() != 0.0,
            None => true,
        },
    }
}
