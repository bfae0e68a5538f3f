//! List query building shared by the bootcamp and course list endpoints.
//!
//! A query string such as `averageCost[lte]=10000&careers[in]=Business,UI/UX&select=name&page=2`
//! is parsed into structural [`FieldFilter`]s bound to the columns a [`ResourceSchema`] exposes,
//! plus a projection, a sort order and a page window. Operators are taken from the `[op]` key
//! suffix only, never by rewriting text, so field names are matched exactly.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};

use crate::errors::AppError;

/// Parameter names that control the listing instead of filtering it.
pub const RESERVED_PARAMS: [&str; 4] = ["select", "sort", "limit", "page"];

pub const DEFAULT_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 100;
pub const DEFAULT_PAGE: u32 = 1;

/// How a filter value is parsed and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    /// RFC 3339 text, compared lexicographically
    Timestamp,
    /// JSON array of text; equality means "contains"
    TextList,
}

/// A queryable field: its public (camelCase) name and the column backing it.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

/// The filterable and sortable surface of one table.
#[derive(Debug)]
pub struct ResourceSchema {
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
    /// Field sorted on, descending, when the request names no sort
    pub default_sort: &'static str,
}

impl ResourceSchema {
    pub fn field(&'static self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Comparison bound to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(Operator::Eq),
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => " = ",
            Operator::Gt => " > ",
            Operator::Gte => " >= ",
            Operator::Lt => " < ",
            Operator::Lte => " <= ",
            Operator::In => " IN ",
        }
    }
}

/// A typed filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl FilterValue {
    fn parse(field: &FieldSpec, raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        match field.kind {
            FieldKind::Text | FieldKind::Timestamp | FieldKind::TextList => {
                Ok(FilterValue::Text(raw.to_string()))
            }
            FieldKind::Number => raw.parse().map(FilterValue::Number).map_err(|_| {
                AppError::validation(format!("{} expects a number, got {:?}", field.name, raw))
            }),
            FieldKind::Bool => match raw {
                "true" | "1" => Ok(FilterValue::Bool(true)),
                "false" | "0" => Ok(FilterValue::Bool(false)),
                _ => Err(AppError::validation(format!(
                    "{} expects true or false, got {:?}",
                    field.name, raw
                ))),
            },
        }
    }

    fn push_bind(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            FilterValue::Text(v) => builder.push_bind(v.clone()),
            FilterValue::Number(v) => builder.push_bind(*v),
            FilterValue::Bool(v) => builder.push_bind(i64::from(*v)),
        };
    }
}

/// `{field, operator, value}`: one condition of the WHERE clause.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: &'static FieldSpec,
    pub operator: Operator,
    pub values: Vec<FilterValue>,
}

impl FieldFilter {
    fn new(field: &'static FieldSpec, operator: Operator, raw: &str) -> Result<Self, AppError> {
        let values = match operator {
            Operator::In => raw
                .split(',')
                .filter(|v| !v.trim().is_empty())
                .map(|v| FilterValue::parse(field, v))
                .collect::<Result<Vec<_>, _>>()?,
            _ => vec![FilterValue::parse(field, raw)?],
        };

        if values.is_empty() {
            return Err(AppError::validation(format!(
                "{}[in] needs at least one value",
                field.name
            )));
        }

        let ordered = matches!(
            operator,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        );
        if ordered && matches!(field.kind, FieldKind::Bool | FieldKind::TextList) {
            return Err(AppError::validation(format!(
                "{} does not support range comparisons",
                field.name
            )));
        }

        Ok(Self {
            field,
            operator,
            values,
        })
    }

    fn push_sql(&self, table: &str, builder: &mut QueryBuilder<'_, Sqlite>) {
        if self.field.kind == FieldKind::TextList {
            builder.push(format!(
                "EXISTS (SELECT 1 FROM json_each({}.{}) WHERE json_each.value IN (",
                table, self.field.column
            ));
            self.push_value_list(builder);
            builder.push("))");
            return;
        }

        builder.push(format!("{}.{}", table, self.field.column));
        builder.push(self.operator.sql());
        if self.operator == Operator::In {
            builder.push("(");
            self.push_value_list(builder);
            builder.push(")");
        } else if let Some(value) = self.values.first() {
            value.push_bind(builder);
        }
    }

    fn push_value_list(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            value.push_bind(builder);
        }
    }
}

/// One sort key.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: &'static FieldSpec,
    pub descending: bool,
}

/// A page reference in the pagination descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u32,
    pub limit: u32,
}

/// Reports whether neighbouring pages exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// A projected page of results.
#[derive(Debug, Clone)]
pub struct Listing {
    pub data: Vec<Value>,
    pub total: i64,
    pub pagination: Pagination,
}

impl Listing {
    /// Number of records on this page.
    pub fn count(&self) -> usize {
        self.data.len()
    }
}

/// A fully parsed list request.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub schema: &'static ResourceSchema,
    pub filters: Vec<FieldFilter>,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub limit: u32,
    pub page: u32,
}

impl ListQuery {
    /// Parse ordered query-string pairs against a resource schema.
    pub fn parse(
        schema: &'static ResourceSchema,
        params: &[(String, String)],
    ) -> Result<Self, AppError> {
        let mut filters = Vec::new();
        let mut select = None;
        let mut sort = None;
        let mut limit = DEFAULT_LIMIT;
        let mut page = DEFAULT_PAGE;

        for (key, raw) in params {
            match key.as_str() {
                "select" => select = Some(split_list(raw)),
                "sort" => sort = Some(parse_sort(schema, raw)?),
                "limit" => limit = positive_or(raw, DEFAULT_LIMIT).min(MAX_LIMIT),
                "page" => page = positive_or(raw, DEFAULT_PAGE),
                _ => {
                    let (name, operator) = split_operator(key)?;
                    let field = schema.field(name).ok_or_else(|| {
                        AppError::validation(format!("Cannot filter on unknown field {:?}", name))
                    })?;
                    filters.push(FieldFilter::new(field, operator, raw)?);
                }
            }
        }

        let sort = match sort {
            Some(keys) if !keys.is_empty() => keys,
            _ => default_sort(schema)?,
        };

        Ok(Self {
            schema,
            filters,
            select: select.filter(|fields| !fields.is_empty()),
            sort,
            limit,
            page,
        })
    }

    /// Number of rows skipped before this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// Pagination descriptor for a result set of `total` matching rows.
    pub fn pagination(&self, total: i64) -> Pagination {
        let end = i64::from(self.page) * i64::from(self.limit);
        Pagination {
            next: self
                .page
                .checked_add(1)
                .filter(|_| end < total)
                .map(|page| PageRef {
                    page,
                    limit: self.limit,
                }),
            prev: (self.page > 1).then_some(PageRef {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }

    /// Append the WHERE clause, if any filters were given.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        for (i, filter) in self.filters.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            filter.push_sql(self.schema.table, builder);
        }
    }

    /// Append ORDER BY and the LIMIT/OFFSET window.
    ///
    /// Ties are broken on rowid in the direction of the first key so pages never overlap.
    pub fn push_order_and_window(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" ORDER BY ");
        for key in &self.sort {
            builder.push(format!(
                "{}.{} {}, ",
                self.schema.table,
                key.field.column,
                if key.descending { "DESC" } else { "ASC" }
            ));
        }
        let tie_break = match self.sort.first() {
            Some(key) if key.descending => "DESC",
            _ => "ASC",
        };
        builder.push(format!("{}.rowid {}", self.schema.table, tie_break));

        builder.push(" LIMIT ");
        builder.push_bind(i64::from(self.limit));
        builder.push(" OFFSET ");
        builder.push_bind(self.offset());
    }

    /// Reduce a serialized record to the selected fields. `id` is always kept.
    pub fn project(&self, value: Value) -> Value {
        let Some(fields) = &self.select else {
            return value;
        };
        match value {
            Value::Object(map) => {
                let keep: HashSet<&str> = fields.iter().map(String::as_str).collect();
                Value::Object(
                    map.into_iter()
                        .filter(|(k, _)| k == "id" || keep.contains(k.as_str()))
                        .collect(),
                )
            }
            other => other,
        }
    }

    /// Serialize and project a page of records into a [`Listing`].
    pub fn listing<T: Serialize>(&self, items: &[T], total: i64) -> Result<Listing, AppError> {
        let data = items
            .iter()
            .map(|item| serde_json::to_value(item).map(|v| self.project(v)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Listing {
            data,
            total,
            pagination: self.pagination(total),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn positive_or(raw: &str, default: u32) -> u32 {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

/// Split `field[op]` into its parts; a bare key is an equality filter.
fn split_operator(key: &str) -> Result<(&str, Operator), AppError> {
    match key.strip_suffix(']').and_then(|k| k.split_once('[')) {
        Some((name, token)) => Operator::parse(token)
            .map(|op| (name, op))
            .ok_or_else(|| AppError::validation(format!("Unknown filter operator {:?}", token))),
        None => Ok((key, Operator::Eq)),
    }
}

fn parse_sort(schema: &'static ResourceSchema, raw: &str) -> Result<Vec<SortKey>, AppError> {
    split_list(raw)
        .iter()
        .map(|entry| {
            let (name, descending) = match entry.strip_prefix('-') {
                Some(name) => (name, true),
                None => (entry.as_str(), false),
            };
            schema
                .field(name)
                .map(|field| SortKey { field, descending })
                .ok_or_else(|| AppError::validation(format!("Cannot sort on unknown field {:?}", name)))
        })
        .collect()
}

fn default_sort(schema: &'static ResourceSchema) -> Result<Vec<SortKey>, AppError> {
    let field = schema.field(schema.default_sort).ok_or_else(|| {
        AppError::Internal(format!(
            "Default sort field {} missing from {} schema",
            schema.default_sort, schema.table
        ))
    })?;
    Ok(vec![SortKey {
        field,
        descending: true,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    static WIDGETS: ResourceSchema = ResourceSchema {
        table: "widgets",
        fields: &[
            FieldSpec { name: "name", column: "name", kind: FieldKind::Text },
            FieldSpec { name: "averageCost", column: "average_cost", kind: FieldKind::Number },
            FieldSpec { name: "housing", column: "housing", kind: FieldKind::Bool },
            FieldSpec { name: "careers", column: "careers", kind: FieldKind::TextList },
            FieldSpec { name: "createdAt", column: "created_at", kind: FieldKind::Timestamp },
            FieldSpec { name: "location.state", column: "state", kind: FieldKind::Text },
        ],
        default_sort: "createdAt",
    };

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn where_sql(query: &ListQuery) -> String {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM widgets");
        query.push_where(&mut builder);
        builder.sql().to_string()
    }

    #[test]
    fn test_reserved_params_never_filter() {
        let query = ListQuery::parse(
            &WIDGETS,
            &params(&[
                ("select", "name"),
                ("sort", "name"),
                ("limit", "5"),
                ("page", "2"),
            ]),
        )
        .unwrap();

        assert!(query.filters.is_empty());
        assert_eq!(where_sql(&query), "SELECT * FROM widgets");
        assert_eq!(query.limit, 5);
        assert_eq!(query.page, 2);
        assert_eq!(query.select, Some(vec!["name".to_string()]));
    }

    #[test]
    fn test_operators_bind_structurally() {
        let query = ListQuery::parse(
            &WIDGETS,
            &params(&[("averageCost[lte]", "10000"), ("housing", "true")]),
        )
        .unwrap();

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].operator, Operator::Lte);
        assert_eq!(query.filters[0].values, vec![FilterValue::Number(10000.0)]);
        // "housing" contains "in" but is an equality filter on the housing field
        assert_eq!(query.filters[1].field.name, "housing");
        assert_eq!(query.filters[1].operator, Operator::Eq);
        assert_eq!(
            where_sql(&query),
            "SELECT * FROM widgets WHERE widgets.average_cost <= ? AND widgets.housing = ?"
        );
    }

    #[test]
    fn test_in_operator_and_list_fields() {
        let query = ListQuery::parse(
            &WIDGETS,
            &params(&[("careers[in]", "Business,UI/UX"), ("name[in]", "a,b,c")]),
        )
        .unwrap();

        assert_eq!(query.filters[0].values.len(), 2);
        assert_eq!(
            where_sql(&query),
            "SELECT * FROM widgets WHERE EXISTS (SELECT 1 FROM json_each(widgets.careers) \
             WHERE json_each.value IN (?, ?)) AND widgets.name IN (?, ?, ?)"
        );
    }

    #[test]
    fn test_nested_field_names() {
        let query = ListQuery::parse(&WIDGETS, &params(&[("location.state", "MA")])).unwrap();
        assert_eq!(
            where_sql(&query),
            "SELECT * FROM widgets WHERE widgets.state = ?"
        );
    }

    #[test]
    fn test_rejects_unknown_fields_and_operators() {
        assert!(matches!(
            ListQuery::parse(&WIDGETS, &params(&[("password", "x")])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ListQuery::parse(&WIDGETS, &params(&[("averageCost[regex]", "1")])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ListQuery::parse(&WIDGETS, &params(&[("averageCost", "cheap")])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ListQuery::parse(&WIDGETS, &params(&[("housing[gt]", "true")])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ListQuery::parse(&WIDGETS, &params(&[("sort", "-secret")])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_defaults_and_bad_numbers() {
        let query =
            ListQuery::parse(&WIDGETS, &params(&[("limit", "abc"), ("page", "0")])).unwrap();
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.sort.len(), 1);
        assert_eq!(query.sort[0].field.name, "createdAt");
        assert!(query.sort[0].descending);

        let capped = ListQuery::parse(&WIDGETS, &params(&[("limit", "5000")])).unwrap();
        assert_eq!(capped.limit, MAX_LIMIT);
    }

    #[test]
    fn test_order_and_window() {
        let query = ListQuery::parse(
            &WIDGETS,
            &params(&[("sort", "-averageCost,name"), ("limit", "10"), ("page", "3")]),
        )
        .unwrap();
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM widgets");
        query.push_order_and_window(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM widgets ORDER BY widgets.average_cost DESC, widgets.name ASC, \
             widgets.rowid DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_pagination_descriptor() {
        let first = ListQuery::parse(&WIDGETS, &params(&[("limit", "2"), ("page", "1")])).unwrap();
        assert_eq!(
            first.pagination(5),
            Pagination {
                next: Some(PageRef { page: 2, limit: 2 }),
                prev: None
            }
        );

        let last = ListQuery::parse(&WIDGETS, &params(&[("limit", "2"), ("page", "3")])).unwrap();
        assert_eq!(
            last.pagination(5),
            Pagination {
                next: None,
                prev: Some(PageRef { page: 2, limit: 2 })
            }
        );

        // Exactly filled pages do not advertise an empty next page
        let exact = ListQuery::parse(&WIDGETS, &params(&[("limit", "2"), ("page", "2")])).unwrap();
        assert_eq!(exact.pagination(4).next, None);

        let empty = ListQuery::parse(&WIDGETS, &[]).unwrap();
        assert_eq!(empty.pagination(0), Pagination::default());

        // The last representable page has no successor
        let max = u32::MAX.to_string();
        let far = ListQuery::parse(&WIDGETS, &params(&[("page", max.as_str())])).unwrap();
        assert_eq!(
            far.pagination(3),
            Pagination {
                next: None,
                prev: Some(PageRef { page: u32::MAX - 1, limit: 1 })
            }
        );
        assert_eq!(far.offset(), i64::from(u32::MAX - 1));
    }

    #[test]
    fn test_projection_keeps_id() {
        let query = ListQuery::parse(&WIDGETS, &params(&[("select", "name, housing")])).unwrap();
        let projected = query.project(serde_json::json!({
            "id": "w1",
            "name": "Widget",
            "housing": true,
            "averageCost": 10
        }));
        assert_eq!(
            projected,
            serde_json::json!({ "id": "w1", "name": "Widget", "housing": true })
        );
    }
}
