//! Stage evaluator backing [`InMemoryDocumentStore`](super::InMemoryDocumentStore).
//!
//! Evaluates pipelines the way the document store does for the stage kinds
//! the reports use: `$unwind` drops rows whose array is missing or empty,
//! `$lookup` is an equality join producing an array, `$group` keeps groups in
//! first-seen order.

use std::collections::HashMap;

use bson::{Bson, Document};
use tracing::trace;

use supermarket_reports::value::{
    Number, compare_values, field_matches, group_key, lookup_path, number_to_bson, remove_path,
    set_path, to_number,
};
use supermarket_reports::{Accumulator, Expr, Group, Lookup, Pipeline, Projection, SortOrder, Stage};

/// Resolves collection names for `$lookup`.
pub trait CollectionSource {
    fn collection(&self, name: &str) -> &[Document];
}

impl CollectionSource for HashMap<String, Vec<Document>> {
    fn collection(&self, name: &str) -> &[Document] {
        self.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Run every stage of `pipeline` over `input`.
pub fn execute<C>(pipeline: &Pipeline, input: Vec<Document>, source: &C) -> Vec<Document>
where
    C: CollectionSource + ?Sized,
{
    pipeline.stages().iter().fold(input, |rows, stage| {
        let out = apply_stage(stage, rows, source);
        trace!(stage = stage.operator(), rows = out.len(), "stage evaluated");
        out
    })
}

fn apply_stage<C>(stage: &Stage, rows: Vec<Document>, source: &C) -> Vec<Document>
where
    C: CollectionSource + ?Sized,
{
    match stage {
        Stage::Match(filter) => rows.into_iter().filter(|d| filter.matches(d)).collect(),
        Stage::Unwind { path } => unwind(rows, path),
        Stage::Lookup(l) => lookup(rows, l, source.collection(&l.from)),
        Stage::Group(g) => group(rows, g),
        Stage::Project(fields) => rows.into_iter().map(|d| project(&d, fields)).collect(),
        Stage::Sort(keys) => sort(rows, keys),
    }
}

/// Evaluate an expression; `None` means the value is missing.
pub fn eval(expr: &Expr, doc: &Document) -> Option<Bson> {
    match expr {
        Expr::Field(path) => lookup_path(doc, path),
        Expr::Literal(value) => Some(value.clone()),
        Expr::Multiply(operands) => {
            let mut product = Number::Int(1);
            for operand in operands {
                match eval(operand, doc).as_ref().and_then(to_number) {
                    Some(n) => product = product.mul(n),
                    None => return Some(Bson::Null),
                }
            }
            Some(number_to_bson(product))
        }
        Expr::Object(fields) => {
            let mut out = Document::new();
            for (name, field) in fields {
                if let Some(value) = eval(field, doc) {
                    out.insert(name.as_str(), value);
                }
            }
            Some(Bson::Document(out))
        }
    }
}

fn unwind(rows: Vec<Document>, path: &str) -> Vec<Document> {
    let mut out = Vec::with_capacity(rows.len());
    for doc in rows {
        match lookup_path(&doc, path) {
            Some(Bson::Array(items)) => {
                for item in items {
                    let mut row = doc.clone();
                    set_path(&mut row, path, item);
                    out.push(row);
                }
            }
            None | Some(Bson::Null) | Some(Bson::Undefined) => {}
            // A scalar behaves as a single-element array.
            Some(_) => out.push(doc),
        }
    }
    out
}

fn lookup(rows: Vec<Document>, l: &Lookup, foreign: &[Document]) -> Vec<Document> {
    rows.into_iter()
        .map(|mut doc| {
            let targets = match lookup_path(&doc, &l.local_field) {
                Some(Bson::Array(items)) => items,
                Some(value) => vec![value],
                None => vec![Bson::Null],
            };
            let matches: Vec<Bson> = foreign
                .iter()
                .filter(|f| {
                    let candidate = lookup_path(f, &l.foreign_field);
                    targets.iter().any(|t| field_matches(candidate.as_ref(), t))
                })
                .cloned()
                .map(Bson::Document)
                .collect();
            set_path(&mut doc, &l.as_field, Bson::Array(matches));
            doc
        })
        .collect()
}

enum AccState {
    First(Option<Bson>),
    Push(Vec<Bson>),
    Sum(Number),
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::First(_) => AccState::First(None),
            Accumulator::Push(_) => AccState::Push(Vec::new()),
            Accumulator::Sum(_) => AccState::Sum(Number::Int(0)),
        }
    }

    fn update(&mut self, acc: &Accumulator, doc: &Document) {
        let value = eval(acc.expr(), doc);
        match self {
            AccState::First(slot) => {
                if slot.is_none() {
                    *slot = Some(value.unwrap_or(Bson::Null));
                }
            }
            AccState::Push(items) => {
                if let Some(v) = value {
                    items.push(v);
                }
            }
            AccState::Sum(total) => {
                if let Some(n) = value.as_ref().and_then(to_number) {
                    *total = total.add(n);
                }
            }
        }
    }

    fn finish(self) -> Bson {
        match self {
            AccState::First(v) => v.unwrap_or(Bson::Null),
            AccState::Push(items) => Bson::Array(items),
            AccState::Sum(total) => number_to_bson(total),
        }
    }
}

fn group(rows: Vec<Document>, g: &Group) -> Vec<Document> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Bson, Vec<AccState>)> = Vec::new();

    for doc in &rows {
        let key = eval(&g.id, doc).unwrap_or(Bson::Null);
        let slot = *index.entry(group_key(&key)).or_insert_with(|| {
            let states = g.fields.iter().map(|(_, acc)| AccState::new(acc)).collect();
            groups.push((key, states));
            groups.len() - 1
        });
        let (_, states) = &mut groups[slot];
        for ((_, acc), state) in g.fields.iter().zip(states.iter_mut()) {
            state.update(acc, doc);
        }
    }

    groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = Document::new();
            out.insert("_id", key);
            for ((name, _), state) in g.fields.iter().zip(states) {
                out.insert(name.as_str(), state.finish());
            }
            out
        })
        .collect()
}

fn project(doc: &Document, fields: &[(String, Projection)]) -> Document {
    let exclusion_only = fields.iter().all(|(_, p)| matches!(p, Projection::Exclude));
    if exclusion_only {
        let mut out = doc.clone();
        for (name, _) in fields {
            remove_path(&mut out, name);
        }
        return out;
    }

    let mut out = Document::new();
    let id_spec = fields.iter().find(|(name, _)| name == "_id").map(|(_, p)| p);
    if id_spec.is_none() {
        if let Some(id) = doc.get("_id") {
            out.insert("_id", id.clone());
        }
    }
    for (name, spec) in fields {
        let value = match spec {
            Projection::Include => lookup_path(doc, name),
            Projection::Exclude => None,
            Projection::Computed(expr) => eval(expr, doc),
        };
        if let Some(value) = value {
            set_path(&mut out, name, value);
        }
    }
    out
}

fn sort(mut rows: Vec<Document>, keys: &[(String, SortOrder)]) -> Vec<Document> {
    rows.sort_by(|a, b| {
        keys.iter()
            .map(|(path, order)| {
                let left = lookup_path(a, path).unwrap_or(Bson::Null);
                let right = lookup_path(b, path).unwrap_or(Bson::Null);
                let ord = compare_values(&left, &right);
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use supermarket_reports::{
        CategorySalesRow, DetailedSaleRow, SaleWithProducts, detailed_sales, sales_by_category,
        sales_with_products, sales_with_products_for_customer,
    };
    use supermarket_core::CustomerId;

    fn collections(products: Vec<Document>) -> HashMap<String, Vec<Document>> {
        let mut map = HashMap::new();
        map.insert("productos".to_string(), products);
        map
    }

    fn decode_sales(docs: Vec<Document>) -> Vec<SaleWithProducts> {
        docs.into_iter().map(|d| bson::from_document(d).unwrap()).collect()
    }

    #[test]
    fn sale_with_resolvable_item_is_denormalized() {
        let source = collections(vec![doc! { "_id": 100, "nombre": "Bread", "precio": 15 }]);
        let sales = vec![doc! {
            "_id": 1, "cliente_id": 9, "fecha": "2024-01-01", "total": 30,
            "items": [ { "producto_id": 100, "cantidad": 2 } ],
        }];

        let out = execute(&sales_with_products(), sales, &source);
        assert_eq!(
            out,
            vec![doc! {
                "_id": 1, "cliente_id": 9, "fecha": "2024-01-01", "total": 30,
                "productos": [ { "nombre": "Bread", "precio": 15, "cantidad": 2 } ],
            }]
        );
    }

    #[test]
    fn sale_with_only_missing_product_is_omitted() {
        let source = collections(vec![doc! { "_id": 100, "nombre": "Bread", "precio": 15 }]);
        let sales = vec![doc! {
            "_id": 2, "cliente_id": 9, "fecha": "2024-01-02", "total": 5,
            "items": [ { "producto_id": 999, "cantidad": 1 } ],
        }];
        assert!(execute(&sales_with_products(), sales, &source).is_empty());
    }

    #[test]
    fn sale_without_items_is_omitted() {
        let source = collections(vec![]);
        let sales = vec![
            doc! { "_id": 3, "cliente_id": 1, "fecha": "2024-01-03", "total": 0, "items": [] },
            doc! { "_id": 4, "cliente_id": 1, "fecha": "2024-01-03", "total": 0 },
        ];
        assert!(execute(&sales_with_products(), sales, &source).is_empty());
    }

    #[test]
    fn unresolved_items_are_dropped_but_sale_survives() {
        let source = collections(vec![
            doc! { "_id": 1, "nombre": "Milk", "precio": 2.5 },
            doc! { "_id": 2, "nombre": "Eggs", "precio": 4 },
        ]);
        let sales = vec![doc! {
            "_id": 10, "cliente_id": 3, "fecha": "2024-03-01", "total": 13,
            "items": [
                { "producto_id": 1, "cantidad": 2 },
                { "producto_id": 77, "cantidad": 1 },
                { "producto_id": 2, "cantidad": 2 },
            ],
        }];

        let rows = decode_sales(execute(&sales_with_products(), sales, &source));
        assert_eq!(rows.len(), 1);
        let names: Vec<&str> = rows[0].products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Milk", "Eggs"]);
        assert_eq!(rows[0].total, Number::Int(13));
        assert_eq!(rows[0].products[0].price, Number::Double(2.5));
        assert_eq!(rows[0].products[1].price, Number::Int(4));
    }

    #[test]
    fn numeric_ids_join_across_int_widths() {
        let source = collections(vec![doc! { "_id": 5i64, "nombre": "Rice", "precio": 1.25 }]);
        let sales = vec![doc! {
            "_id": 1, "cliente_id": 1, "fecha": "2024-01-01", "total": 2.5,
            "items": [ { "producto_id": 5, "cantidad": 2 } ],
        }];
        let rows = decode_sales(execute(&sales_with_products(), sales, &source));
        assert_eq!(rows[0].products[0].name, "Rice");
    }

    #[test]
    fn customer_scope_keeps_only_that_customers_sales() {
        let source = collections(vec![doc! { "_id": 1, "nombre": "Milk", "precio": 2 }]);
        let sales = vec![
            doc! { "_id": 1, "cliente_id": 7, "fecha": "d", "total": 2, "items": [ { "producto_id": 1, "cantidad": 1 } ] },
            doc! { "_id": 2, "cliente_id": 8, "fecha": "d", "total": 2, "items": [ { "producto_id": 1, "cantidad": 1 } ] },
        ];
        let rows = decode_sales(execute(
            &sales_with_products_for_customer(CustomerId::new(8)),
            sales,
            &source,
        ));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].customer_id, CustomerId::new(8));
    }

    fn store_fixture() -> (HashMap<String, Vec<Document>>, Vec<Document>) {
        let mut map = HashMap::new();
        map.insert(
            "clientes".to_string(),
            vec![
                doc! { "_id": 1, "nombre": "Ana", "email": "ana@example.com" },
                doc! { "_id": 2, "nombre": "Bruno" },
            ],
        );
        map.insert(
            "categorias".to_string(),
            vec![
                doc! { "_id": 1, "nombre": "Bakery" },
                doc! { "_id": 2, "nombre": "Dairy" },
            ],
        );
        map.insert(
            "productos".to_string(),
            vec![
                doc! { "_id": 10, "nombre": "Bread", "precio": 15, "categoria_id": 1 },
                doc! { "_id": 20, "nombre": "Milk", "precio": 2.5, "categoria_id": 2 },
                doc! { "_id": 30, "nombre": "Cheese", "precio": 8, "categoria_id": 2 },
            ],
        );
        let sales = vec![
            doc! { "_id": 1, "cliente_id": 1, "fecha": "2024-01-01", "total": 35,
                   "items": [ { "producto_id": 10, "cantidad": 2 }, { "producto_id": 20, "cantidad": 2 } ] },
            doc! { "_id": 2, "cliente_id": 2, "fecha": "2024-01-05", "total": 16,
                   "items": [ { "producto_id": 30, "cantidad": 2 } ] },
            doc! { "_id": 3, "cliente_id": 1, "fecha": "2024-01-05", "total": 15,
                   "items": [ { "producto_id": 10, "cantidad": 1 } ] },
        ];
        (map, sales)
    }

    #[test]
    fn detailed_sales_sorts_newest_first_then_customer_name() {
        let (source, sales) = store_fixture();
        let rows: Vec<DetailedSaleRow> = execute(&detailed_sales(), sales, &source)
            .into_iter()
            .map(|d| bson::from_document(d).unwrap())
            .collect();

        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows.iter().map(|r| (r.fecha.as_str(), r.cliente_nombre.as_str())).collect::<Vec<_>>(),
            vec![
                ("2024-01-05", "Ana"),
                ("2024-01-05", "Bruno"),
                ("2024-01-01", "Ana"),
                ("2024-01-01", "Ana"),
            ]
        );
        let cheese = rows.iter().find(|r| r.producto_nombre == "Cheese").unwrap();
        assert_eq!(cheese.subtotal, Number::Int(16));
        assert_eq!(cheese.categoria_nombre, "Dairy");
        assert_eq!(cheese.cliente_email, None);
        assert_eq!(rows[0].cliente_email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn sales_by_category_aggregates_and_orders_by_revenue() {
        let (source, sales) = store_fixture();
        let rows: Vec<CategorySalesRow> = execute(&sales_by_category(), sales, &source)
            .into_iter()
            .map(|d| bson::from_document(d).unwrap())
            .collect();

        assert_eq!(
            rows,
            vec![
                CategorySalesRow {
                    categoria: "Bakery".to_string(),
                    total_ventas: 2,
                    total_cantidad: 3,
                    total_ingresos: Number::Int(45),
                },
                CategorySalesRow {
                    categoria: "Dairy".to_string(),
                    total_ventas: 2,
                    total_cantidad: 4,
                    total_ingresos: Number::Double(21.0),
                },
            ]
        );
    }

    #[test]
    fn exclusion_projection_removes_fields() {
        let out = project(
            &doc! { "_id": 1, "a": 2, "b": { "c": 3, "d": 4 } },
            &[("_id".to_string(), Projection::Exclude), ("b.c".to_string(), Projection::Exclude)],
        );
        assert_eq!(out, doc! { "a": 2, "b": { "d": 4 } });
    }

    #[test]
    fn multiply_with_missing_operand_is_null() {
        let expr = Expr::multiply([Expr::field("a"), Expr::field("missing")]);
        assert_eq!(eval(&expr, &doc! { "a": 3 }), Some(Bson::Null));
    }

    #[test]
    fn scalar_unwind_keeps_the_row() {
        let out = unwind(vec![doc! { "items": 5 }], "items");
        assert_eq!(out, vec![doc! { "items": 5 }]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::{BTreeSet, HashSet};

        #[derive(Debug, Clone)]
        struct GenSale {
            customer: i32,
            total: i32,
            items: Vec<(i32, i32)>,
        }

        fn sale_strategy() -> impl Strategy<Value = GenSale> {
            (
                1i32..5,
                0i32..1000,
                prop::collection::vec((0i32..15, 1i32..10), 0..6),
            )
                .prop_map(|(customer, total, items)| GenSale { customer, total, items })
        }

        proptest! {
            /// Properties of the denormalized sales view over random catalogs:
            /// one record per sale with a resolvable item, none otherwise, one
            /// product entry per resolvable item, scalar fields copied verbatim.
            #[test]
            fn denormalized_view_properties(
                product_ids in prop::collection::btree_set(0i32..10, 0..10),
                sales in prop::collection::vec(sale_strategy(), 0..20),
            ) {
                let products: Vec<Document> = product_ids
                    .iter()
                    .map(|id| doc! { "_id": *id, "nombre": format!("p{id}"), "precio": *id * 2 })
                    .collect();
                let source = collections(products);

                let input: Vec<Document> = sales
                    .iter()
                    .enumerate()
                    .map(|(n, s)| {
                        let items: Vec<Bson> = s
                            .items
                            .iter()
                            .map(|(p, q)| Bson::Document(doc! { "producto_id": *p, "cantidad": *q }))
                            .collect();
                        doc! {
                            "_id": n as i32,
                            "cliente_id": s.customer,
                            "fecha": format!("2024-01-{:02}", n % 28 + 1),
                            "total": s.total,
                            "items": items,
                        }
                    })
                    .collect();

                let rows = decode_sales(execute(&sales_with_products(), input, &source));

                let resolvable = |s: &GenSale| {
                    s.items.iter().filter(|(p, _)| product_ids.contains(p)).count()
                };
                let expected: BTreeSet<i64> = sales
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| resolvable(s) > 0)
                    .map(|(n, _)| n as i64)
                    .collect();
                let seen: Vec<i64> = rows.iter().map(|r| r.sale_id.get()).collect();
                let unique: HashSet<i64> = seen.iter().copied().collect();

                prop_assert_eq!(unique.len(), seen.len());
                prop_assert_eq!(seen.iter().copied().collect::<BTreeSet<_>>(), expected);

                for row in &rows {
                    let n = row.sale_id.get() as usize;
                    let source_sale = &sales[n];
                    prop_assert_eq!(row.products.len(), resolvable(source_sale));
                    prop_assert_eq!(row.customer_id.get(), i64::from(source_sale.customer));
                    prop_assert_eq!(row.total, Number::Int(i64::from(source_sale.total)));
                    prop_assert_eq!(row.date.clone(), format!("2024-01-{:02}", n % 28 + 1));
                }
            }
        }
    }
}
