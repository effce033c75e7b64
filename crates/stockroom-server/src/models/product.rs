use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stockroom_api::{ApiResult, PageParams, Validator};
use stockroom_storage::{Filter, SortSpec};

pub const PRODUCTS: &str = "products";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<i64>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if let Some(name) = present(&self.name, &mut v, "name") {
            v.length("name", name, 2, 100);
        }
        if let Some(description) = present(&self.description, &mut v, "description") {
            v.length("description", description, 10, 1000);
        }
        match self.price {
            Some(price) => v.greater_than("price", price, 0.0),
            None => v.push("price", "This field is required"),
        }
        present(&self.category, &mut v, "category");
        match self.stock {
            Some(stock) => v.at_least("stock", stock, 0),
            None => v.push("stock", "This field is required"),
        }
        v.finish()
    }

    /// Builds the stored product. Call after [`validate`](Self::validate).
    pub fn into_product(self, id: String) -> Product {
        Product {
            id,
            name: self.name.unwrap_or_default().trim().to_string(),
            description: self.description.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            category: self.category.unwrap_or_default().trim().to_string(),
            stock: self.stock.unwrap_or_default(),
        }
    }
}

fn present<'a>(value: &'a Option<String>, v: &mut Validator, field: &str) -> Option<&'a str> {
    if v.required(field, value.as_deref()) {
        value.as_deref()
    } else {
        None
    }
}

/// Partial update; omitted and blank text fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<i64>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if let Some(name) = non_blank(&self.name) {
            v.length("name", name, 2, 100);
        }
        if let Some(description) = non_blank(&self.description) {
            v.length("description", description, 10, 1000);
        }
        if let Some(price) = self.price {
            v.greater_than("price", price, 0.0);
        }
        if let Some(stock) = self.stock {
            v.at_least("stock", stock, 0);
        }
        v.finish()
    }

    /// Fields to write; empty when the request changes nothing.
    pub fn changes(&self) -> Map<String, Value> {
        let mut changes = Map::new();
        if let Some(name) = non_blank(&self.name) {
            changes.insert("name".into(), name.trim().into());
        }
        if let Some(description) = non_blank(&self.description) {
            changes.insert("description".into(), description.into());
        }
        if let Some(price) = self.price {
            changes.insert("price".into(), price.into());
        }
        if let Some(category) = non_blank(&self.category) {
            changes.insert("category".into(), category.trim().into());
        }
        if let Some(stock) = self.stock {
            changes.insert("stock".into(), stock.into());
        }
        changes
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    #[default]
    NameAsc,
    NameDesc,
}

impl ProductSort {
    /// Unknown or missing names fall back to name ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            Some("name_desc") => Self::NameDesc,
            _ => Self::NameAsc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
        }
    }

    pub fn spec(self) -> SortSpec {
        match self {
            Self::PriceAsc => SortSpec::ascending("price"),
            Self::PriceDesc => SortSpec::descending("price"),
            Self::NameAsc => SortSpec::ascending("name"),
            Self::NameDesc => SortSpec::descending("name"),
        }
    }
}

/// Raw query string of `GET /products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: PageParams,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

impl From<ProductListParams> for ProductQuery {
    fn from(params: ProductListParams) -> Self {
        Self {
            page: PageParams::from_query(params.page.as_deref(), params.limit.as_deref()),
            category: non_blank(&params.category).map(|s| s.trim().to_string()),
            search: non_blank(&params.search).map(|s| s.trim().to_string()),
            sort: ProductSort::parse(params.sort.as_deref()),
        }
    }
}

impl ProductQuery {
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::All;
        if let Some(category) = &self.category {
            filter = filter.and(Filter::eq("category", category.as_str()));
        }
        if let Some(search) = &self.search {
            filter = filter.and(Filter::search(&["name", "description"], search));
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_api::ApiError;

    fn pen() -> CreateProductRequest {
        CreateProductRequest {
            name: Some("Pen".into()),
            description: Some("Blue ink pen, medium tip".into()),
            price: Some(1.5),
            category: Some("stationery".into()),
            stock: Some(100),
        }
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn valid_create_passes() {
        assert!(pen().validate().is_ok());
        let zero_stock = CreateProductRequest {
            stock: Some(0),
            ..pen()
        };
        assert!(zero_stock.validate().is_ok());
    }

    #[test]
    fn create_reports_every_field() {
        let err = CreateProductRequest::default().validate().unwrap_err();
        assert_eq!(
            fields(err),
            vec!["name", "description", "price", "category", "stock"]
        );

        let bad = CreateProductRequest {
            name: Some("P".into()),
            price: Some(0.0),
            stock: Some(-1),
            ..pen()
        };
        assert_eq!(fields(bad.validate().unwrap_err()), vec!["name", "price", "stock"]);
    }

    #[test]
    fn blank_update_is_empty() {
        let req = UpdateProductRequest {
            name: Some("  ".into()),
            category: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
        assert!(req.changes().is_empty());
    }

    #[test]
    fn update_validates_supplied_fields_only() {
        let req = UpdateProductRequest {
            price: Some(-2.0),
            ..Default::default()
        };
        assert_eq!(fields(req.validate().unwrap_err()), vec!["price"]);

        let req = UpdateProductRequest {
            stock: Some(0),
            ..Default::default()
        };
        assert_eq!(req.changes().get("stock"), Some(&Value::from(0)));
    }

    #[test]
    fn sort_names() {
        assert_eq!(ProductSort::parse(Some("price_desc")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::parse(Some("bogus")), ProductSort::NameAsc);
        assert_eq!(ProductSort::parse(None), ProductSort::NameAsc);
    }

    #[test]
    fn query_drops_blank_filters() {
        let query = ProductQuery::from(ProductListParams {
            category: Some(" ".into()),
            search: Some("pen".into()),
            limit: Some("5".into()),
            ..Default::default()
        });
        assert_eq!(query.category, None);
        assert_eq!(query.search.as_deref(), Some("pen"));
        assert_eq!(query.page.limit, 5);
    }
}
