//! Typed aggregation pipeline model.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. It is data only: the
//! document store (or the in-memory evaluator) executes it. Rendering to BSON
//! follows the store's aggregation syntax, so `Stage::Unwind { path: "items" }`
//! becomes `{ "$unwind": "$items" }`.

use bson::{Bson, Document, doc};
use serde_json::Value as JsonValue;

use crate::value::{field_matches, lookup_path};

/// Expression evaluated against one input document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field path without the leading `$` (e.g. `"producto.nombre"`).
    Field(String),
    /// Constant value.
    Literal(Bson),
    /// Product of the operands (`$multiply`).
    Multiply(Vec<Expr>),
    /// Embedded document built from named sub-expressions.
    Object(Vec<(String, Expr)>),
}

impl Expr {
    pub fn field(path: impl Into<String>) -> Self {
        Expr::Field(path.into())
    }

    pub fn literal(value: impl Into<Bson>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn multiply(operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Multiply(operands.into_iter().collect())
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Expr::Object(fields.into_iter().map(|(k, e)| (k.into(), e)).collect())
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Expr::Field(path) => Bson::String(format!("${path}")),
            // Strings starting with `$` would be read back as field paths.
            Expr::Literal(Bson::String(s)) if s.starts_with('$') => {
                Bson::Document(doc! { "$literal": s.as_str() })
            }
            Expr::Literal(value) => value.clone(),
            Expr::Multiply(operands) => Bson::Document(doc! {
                "$multiply": operands.iter().map(Expr::to_bson).collect::<Vec<_>>(),
            }),
            Expr::Object(fields) => {
                let mut out = Document::new();
                for (name, expr) in fields {
                    out.insert(name.as_str(), expr.to_bson());
                }
                Bson::Document(out)
            }
        }
    }
}

/// `$group` accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    First(Expr),
    Push(Expr),
    Sum(Expr),
}

impl Accumulator {
    pub fn operator(&self) -> &'static str {
        match self {
            Accumulator::First(_) => "$first",
            Accumulator::Push(_) => "$push",
            Accumulator::Sum(_) => "$sum",
        }
    }

    pub fn expr(&self) -> &Expr {
        match self {
            Accumulator::First(e) | Accumulator::Push(e) | Accumulator::Sum(e) => e,
        }
    }

    pub fn to_bson(&self) -> Bson {
        let mut out = Document::new();
        out.insert(self.operator(), self.expr().to_bson());
        Bson::Document(out)
    }
}

/// One `$project` field specification.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Include,
    Exclude,
    Computed(Expr),
}

impl Projection {
    pub fn to_bson(&self) -> Bson {
        match self {
            Projection::Include => Bson::Int32(1),
            Projection::Exclude => Bson::Int32(0),
            Projection::Computed(expr) => expr.to_bson(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Conjunction of field equality clauses (`{ field: value, ... }`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Bson)>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Bson)] {
        &self.clauses
    }

    fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(path, target)| field_matches(lookup_path(doc, path).as_ref(), target))
    }

    pub fn to_document(&self) -> Document {
        let mut out = Document::new();
        for (path, value) in &self.clauses {
            out.insert(path.as_str(), value.clone());
        }
        out
    }
}

/// `$lookup` (equality join against another collection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

/// `$group`: key expression plus named accumulators (in output order).
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: Expr,
    pub fields: Vec<(String, Accumulator)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Unwind { path: String },
    Lookup(Lookup),
    Group(Group),
    Project(Vec<(String, Projection)>),
    Sort(Vec<(String, SortOrder)>),
}

impl Stage {
    pub fn operator(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Unwind { .. } => "$unwind",
            Stage::Lookup(_) => "$lookup",
            Stage::Group(_) => "$group",
            Stage::Project(_) => "$project",
            Stage::Sort(_) => "$sort",
        }
    }

    pub fn to_document(&self) -> Document {
        let body: Bson = match self {
            Stage::Match(filter) => Bson::Document(filter.to_document()),
            Stage::Unwind { path } => Bson::String(format!("${path}")),
            Stage::Lookup(l) => Bson::Document(doc! {
                "from": l.from.as_str(),
                "localField": l.local_field.as_str(),
                "foreignField": l.foreign_field.as_str(),
                "as": l.as_field.as_str(),
            }),
            Stage::Group(g) => {
                let mut out = Document::new();
                out.insert("_id", g.id.to_bson());
                for (name, acc) in &g.fields {
                    out.insert(name.as_str(), acc.to_bson());
                }
                Bson::Document(out)
            }
            Stage::Project(fields) => {
                let mut out = Document::new();
                for (name, p) in fields {
                    out.insert(name.as_str(), p.to_bson());
                }
                Bson::Document(out)
            }
            Stage::Sort(keys) => {
                let mut out = Document::new();
                for (name, order) in keys {
                    let dir = match order {
                        SortOrder::Ascending => 1,
                        SortOrder::Descending => -1,
                    };
                    out.insert(name.as_str(), Bson::Int32(dir));
                }
                Bson::Document(out)
            }
        };
        let mut stage = Document::new();
        stage.insert(self.operator(), body);
        stage
    }

    /// One-line human description of what the stage does.
    pub fn describe(&self) -> String {
        match self {
            Stage::Match(filter) if filter.is_empty() => "keep every document".to_string(),
            Stage::Match(filter) => {
                let parts: Vec<String> = filter
                    .clauses()
                    .iter()
                    .map(|(path, value)| format!("{path} = {value}"))
                    .collect();
                format!("keep documents where {}", parts.join(" and "))
            }
            Stage::Unwind { path } => {
                format!("emit one row per element of `{path}` (rows without it are dropped)")
            }
            Stage::Lookup(l) => format!(
                "join `{}` where {} = {}.{} into `{}`",
                l.from, l.local_field, l.from, l.foreign_field, l.as_field
            ),
            Stage::Group(g) => {
                let names: Vec<&str> = g.fields.iter().map(|(n, _)| n.as_str()).collect();
                format!("group rows by {} accumulating {}", g.id.to_bson(), names.join(", "))
            }
            Stage::Project(fields) => {
                let kept: Vec<&str> = fields
                    .iter()
                    .filter(|(_, p)| !matches!(p, Projection::Exclude))
                    .map(|(n, _)| n.as_str())
                    .collect();
                format!("shape output to {}", kept.join(", "))
            }
            Stage::Sort(keys) => {
                let parts: Vec<String> = keys
                    .iter()
                    .map(|(n, o)| match o {
                        SortOrder::Ascending => format!("{n} asc"),
                        SortOrder::Descending => format!("{n} desc"),
                    })
                    .collect();
                format!("sort by {}", parts.join(", "))
            }
        }
    }
}

/// Ordered aggregation pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn matching(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn unwind(self, path: impl Into<String>) -> Self {
        self.stage(Stage::Unwind { path: path.into() })
    }

    pub fn lookup(
        self,
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        self.stage(Stage::Lookup(Lookup {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
        }))
    }

    pub fn group<K: Into<String>>(
        self,
        id: Expr,
        fields: impl IntoIterator<Item = (K, Accumulator)>,
    ) -> Self {
        self.stage(Stage::Group(Group {
            id,
            fields: fields.into_iter().map(|(k, a)| (k.into(), a)).collect(),
        }))
    }

    pub fn project<K: Into<String>>(
        self,
        fields: impl IntoIterator<Item = (K, Projection)>,
    ) -> Self {
        self.stage(Stage::Project(
            fields.into_iter().map(|(k, p)| (k.into(), p)).collect(),
        ))
    }

    pub fn sort<K: Into<String>>(self, keys: impl IntoIterator<Item = (K, SortOrder)>) -> Self {
        self.stage(Stage::Sort(keys.into_iter().map(|(k, o)| (k.into(), o)).collect()))
    }

    /// Insert a stage at the front (e.g. a scoping `$match`).
    pub fn prepend(mut self, stage: Stage) -> Self {
        self.stages.insert(0, stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Collections referenced by `$lookup` stages, in order.
    pub fn joined_collections(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter_map(|s| match s {
                Stage::Lookup(l) => Some(l.from.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }

    /// Relaxed extended JSON rendering (what a shell user would type).
    pub fn to_json(&self) -> JsonValue {
        let stages = self
            .to_documents()
            .into_iter()
            .map(Bson::Document)
            .collect::<Vec<_>>();
        Bson::Array(stages).into_relaxed_extjson()
    }
}
